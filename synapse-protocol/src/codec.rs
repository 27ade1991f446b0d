//! Wire encoding and decoding of operations.

use regex::Regex;

use crate::operation::{OpCode, Operation, parse_action};

/// Terminates every operation on the wire.
pub const END_MARKER: &str = "<END>";

/// Sent when the model uses a code it is not allowed to emit.
pub const INVALID_CODE: &str = "invalid response: must begin with `THT`, `ACT`, or `ANS`.";

/// Sent when an `ACT` operation is not of the form `tool_name(args)`.
pub const INVALID_ACTION: &str =
    "invalid action: must be of the form `ACT: tool_name(args)` where args is JSON.";

/// Sent when a reply contains no operation at all and the policy is
/// [`UnparsedReplyPolicy::FormatError`].
pub const NO_MATCH: &str = "invalid response format: every message must be a sequence of \
operations of the form `CODE: content<END>` where CODE is `THT`, `ACT`, or `ANS`.";

/// What to do with a reply in which no operation can be found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnparsedReplyPolicy {
    /// Treat the whole reply as a thought. The model is not told.
    #[default]
    ImplicitThought,
    /// Answer with a format error so the model corrects itself.
    FormatError,
}

/// Encodes operations to text and decodes model replies.
pub trait ProtocolCodec: Send + Sync {
    /// Encode a single operation.
    fn encode(&self, op: &Operation) -> String;

    /// Decode text into operations, in order.
    ///
    /// Decoding is total: anything that cannot be understood becomes an
    /// [`Operation::Error`] describing the problem.
    fn decode(&self, text: &str) -> Vec<Operation>;

    /// Decode a model reply. Codes the model may not emit (`OBS`, `ERR`,
    /// unknown tags) become [`INVALID_CODE`] errors.
    fn decode_reply(&self, text: &str) -> Vec<Operation>;
}

/// The `CODE: content<END>` wire format.
///
/// Decoding first looks for complete `CODE: content<END>` segments, left to
/// right. If none are found it falls back to a looser reading where every line
/// starting with `CODE: ` opens an operation that runs until the next such line
/// or the end of the text. If that finds nothing either, the
/// [`UnparsedReplyPolicy`] decides.
#[derive(Debug, Clone)]
pub struct TextCodec {
    strict: Regex,
    loose: Regex,
    policy: UnparsedReplyPolicy,
}

impl TextCodec {
    /// A codec with the default [`UnparsedReplyPolicy`].
    pub fn new() -> Self {
        Self::with_policy(UnparsedReplyPolicy::default())
    }

    /// A codec with an explicit policy for unparseable replies.
    pub fn with_policy(policy: UnparsedReplyPolicy) -> Self {
        Self {
            strict: Regex::new(r"(?s)\b([A-Z]{3}): (.*?)<END>").expect("valid regex"),
            loose: Regex::new(r"(?m)^([A-Z]{3}): ").expect("valid regex"),
            policy,
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> UnparsedReplyPolicy {
        self.policy
    }

    /// Terminated segments first; whatever follows the last `<END>` (or the
    /// whole text, when nothing is terminated) is split at code lines.
    fn segments<'t>(&self, text: &'t str) -> Vec<(&'t str, &'t str)> {
        let mut segments = Vec::new();
        let mut rest = 0;
        for caps in self.strict.captures_iter(text) {
            if let (Some(whole), Some(code), Some(content)) =
                (caps.get(0), caps.get(1), caps.get(2))
            {
                segments.push((code.as_str(), content.as_str()));
                rest = whole.end();
            }
        }
        segments.extend(self.loose_segments(&text[rest..]));
        segments
    }

    fn loose_segments<'t>(&self, text: &'t str) -> Vec<(&'t str, &'t str)> {
        let heads: Vec<_> = self.loose.captures_iter(text).collect();
        heads
            .iter()
            .enumerate()
            .filter_map(|(i, head)| {
                let whole = head.get(0)?;
                let code = head.get(1)?.as_str();
                let end = heads
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map_or(text.len(), |m| m.start());
                Some((code, text[whole.end()..end].trim_end()))
            })
            .collect()
    }

    fn operation(code: &str, content: &str, from_model: bool) -> Operation {
        match OpCode::parse(code) {
            Some(code) if from_model && !code.is_model_code() => Operation::error(INVALID_CODE),
            Some(OpCode::Thought) => Operation::Thought(content.to_string()),
            Some(OpCode::Answer) => Operation::Answer(content.to_string()),
            Some(OpCode::Action) => match parse_action(content) {
                Some((tool, args)) => Operation::Action { tool, args },
                None => Operation::error(INVALID_ACTION),
            },
            Some(OpCode::Observation) => Operation::Observation {
                content: content.to_string(),
                tool: None,
            },
            Some(OpCode::Error) => Operation::Error {
                content: content.to_string(),
                tool: None,
            },
            None => Operation::error(INVALID_CODE),
        }
    }

    fn decode_with(&self, text: &str, from_model: bool) -> Vec<Operation> {
        let ops: Vec<_> = self
            .segments(text)
            .into_iter()
            .map(|(code, content)| Self::operation(code, content, from_model))
            .collect();
        if !ops.is_empty() {
            tracing::trace!(count = ops.len(), "synapse.protocol.decoded");
            return ops;
        }
        tracing::debug!(policy = ?self.policy, "synapse.protocol.unparsed_reply");
        match self.policy {
            UnparsedReplyPolicy::ImplicitThought => vec![Operation::Thought(text.to_string())],
            UnparsedReplyPolicy::FormatError => vec![Operation::error(NO_MATCH)],
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for TextCodec {
    fn encode(&self, op: &Operation) -> String {
        format!("{}: {}{END_MARKER}", op.code(), op.content())
    }

    fn decode(&self, text: &str) -> Vec<Operation> {
        self.decode_with(text, false)
    }

    fn decode_reply(&self, text: &str) -> Vec<Operation> {
        self.decode_with(text, true)
    }
}
