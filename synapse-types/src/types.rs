//! Conversation and function-call types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and protocol feedback from the engine.
    System,
    /// The caller's input.
    User,
    /// The model.
    Assistant,
    /// The result of a native function call.
    Function,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        };
        f.write_str(s)
    }
}

/// A native function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function (tool) to call.
    pub name: String,
    /// Raw JSON-encoded arguments, exactly as the backend produced them.
    pub arguments: String,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message.
    pub role: Role,
    /// Text content. May be empty when `function_call` is set.
    pub content: String,
    /// Native function call, only on assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Function name, only on [`Role::Function`] messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            function_call: None,
            name: None,
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An assistant message carrying a native function call.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
            ..Self::new(Role::Assistant, "")
        }
    }

    /// The result of a native function call, addressed to `name`.
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(Role::Function, content)
        }
    }
}

/// An ordered conversation sent to a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Messages, oldest first.
    pub history: Vec<ChatMessage>,
}

impl Prompt {
    /// Create a prompt from messages.
    pub fn new(history: Vec<ChatMessage>) -> Self {
        Self { history }
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the prompt holds no messages.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl From<Vec<ChatMessage>> for Prompt {
    fn from(history: Vec<ChatMessage>) -> Self {
        Self { history }
    }
}

/// JSON type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// A string.
    String,
    /// Any number.
    Number,
    /// `true` or `false`.
    Boolean,
}

/// Typed description of a function parameter, in the shape accepted by
/// function-calling backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// JSON type.
    #[serde(rename = "type")]
    pub kind: ParamType,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Object members, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ParameterSpec>,
    /// Required member names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Element description for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSpec>>,
    /// Allowed values.
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl ParameterSpec {
    /// A parameter of the given type with a description and nothing else.
    pub fn new(kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            items: None,
            enum_values: Vec::new(),
        }
    }
}

/// A function the backend may call natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name; equal to the tool name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// Parameter object.
    pub parameters: ParameterSpec,
}
