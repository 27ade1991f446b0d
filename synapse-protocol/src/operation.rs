//! Protocol operations.

use std::fmt;

/// The three-letter tag that opens every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `THT`
    Thought,
    /// `ACT`
    Action,
    /// `ANS`
    Answer,
    /// `OBS`
    Observation,
    /// `ERR`
    Error,
}

impl OpCode {
    /// All codes, in wire order.
    pub const ALL: [OpCode; 5] = [
        OpCode::Thought,
        OpCode::Action,
        OpCode::Answer,
        OpCode::Observation,
        OpCode::Error,
    ];

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            OpCode::Thought => "THT",
            OpCode::Action => "ACT",
            OpCode::Answer => "ANS",
            OpCode::Observation => "OBS",
            OpCode::Error => "ERR",
        }
    }

    /// Parse a wire tag. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == tag)
    }

    /// Whether the model is allowed to emit this code.
    pub fn is_model_code(self) -> bool {
        matches!(self, OpCode::Thought | OpCode::Action | OpCode::Answer)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of the protocol.
///
/// `tool` on observations and errors records which tool produced them. It
/// never travels on the wire, so a decoded observation always has `tool: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Free-form reasoning.
    Thought(String),
    /// A request to invoke `tool` with raw `args`.
    Action {
        /// Tool name.
        tool: String,
        /// Arguments exactly as written, usually JSON.
        args: String,
    },
    /// The final answer payload.
    Answer(String),
    /// A tool result.
    Observation {
        /// Result text.
        content: String,
        /// The tool that produced it.
        tool: Option<String>,
    },
    /// A failure report: tool error, protocol violation or rejected answer.
    Error {
        /// Error text.
        content: String,
        /// The tool that failed, if any.
        tool: Option<String>,
    },
}

impl Operation {
    /// An error not tied to any tool.
    pub fn error(content: impl Into<String>) -> Self {
        Operation::Error {
            content: content.into(),
            tool: None,
        }
    }

    /// An error raised while handling `tool`.
    pub fn tool_error(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Operation::Error {
            content: content.into(),
            tool: Some(tool.into()),
        }
    }

    /// An observation produced by `tool`.
    pub fn observation(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Operation::Observation {
            content: content.into(),
            tool: Some(tool.into()),
        }
    }

    /// The operation's code.
    pub fn code(&self) -> OpCode {
        match self {
            Operation::Thought(_) => OpCode::Thought,
            Operation::Action { .. } => OpCode::Action,
            Operation::Answer(_) => OpCode::Answer,
            Operation::Observation { .. } => OpCode::Observation,
            Operation::Error { .. } => OpCode::Error,
        }
    }

    /// The text that follows the code on the wire.
    pub fn content(&self) -> String {
        match self {
            Operation::Thought(c) | Operation::Answer(c) => c.clone(),
            Operation::Action { tool, args } => format!("{tool}({args})"),
            Operation::Observation { content, .. } | Operation::Error { content, .. } => {
                content.clone()
            }
        }
    }

    /// The tool this operation concerns, if any.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Operation::Action { tool, .. } => Some(tool),
            Operation::Observation { tool, .. } | Operation::Error { tool, .. } => {
                tool.as_deref()
            }
            _ => None,
        }
    }
}

/// Split `tool_name(args)` into name and raw arguments.
///
/// The name is everything before the first `(`, trimmed; the arguments run to
/// the last `)`. Returns `None` when there is no name or no parenthesised
/// argument list.
pub fn parse_action(content: &str) -> Option<(String, String)> {
    let trimmed = content.trim_end();
    let open = trimmed.find('(')?;
    let close = trimmed.rfind(')')?;
    if close < open || !trimmed[close + 1..].is_empty() {
        return None;
    }
    let tool = trimmed[..open].trim();
    if tool.is_empty() {
        return None;
    }
    Some((tool.to_string(), trimmed[open + 1..close].to_string()))
}
