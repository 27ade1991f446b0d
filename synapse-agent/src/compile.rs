//! Task compilation: task + input -> opening prompt.

use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use synapse_protocol::{END_MARKER, Operation, ProtocolCodec};
use synapse_tool::Tool;
use synapse_types::{ChatMessage, Prompt};
use thiserror::Error;

use crate::task::Task;

/// Errors from [`compile`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompileError {
    /// A value or schema could not be serialized.
    #[error("failed to encode {what}: {source}")]
    Encode {
        /// What was being encoded.
        what: &'static str,
        /// The serializer error.
        #[source]
        source: serde_json::Error,
    },
}

fn encode<T: Serialize + ?Sized>(what: &'static str, value: &T) -> Result<String, CompileError> {
    serde_json::to_string(value).map_err(|source| CompileError::Encode { what, source })
}

fn encode_pretty<T: Serialize + ?Sized>(
    what: &'static str,
    value: &T,
) -> Result<String, CompileError> {
    serde_json::to_string_pretty(value).map_err(|source| CompileError::Encode { what, source })
}

/// One catalog line: `name(arg_schema) # description`.
fn catalog_line(tool: &dyn Tool) -> String {
    format!(
        "{}({}) # {}",
        tool.name(),
        tool.args_schema(),
        tool.description()
    )
}

/// Build the opening prompt for `input`.
///
/// The prompt contains, in order: the protocol instructions with the input
/// and answer schemas and the task description; the catalog of `tools` (when
/// non-empty); the worked examples; a reminder of the protocol; and the
/// encoded input as the final user message.
///
/// Compilation is deterministic: the same arguments always yield the same
/// prompt.
pub fn compile<I, O>(
    task: &Task<I, O>,
    input: &I,
    tools: &[Arc<dyn Tool>],
    codec: &dyn ProtocolCodec,
) -> Result<Prompt, CompileError>
where
    I: Serialize + JsonSchema,
    O: Serialize + JsonSchema,
{
    let input_schema = encode_pretty("input schema", &schemars::schema_for!(I))?;
    let answer_schema = encode_pretty("answer schema", &schemars::schema_for!(O))?;

    let mut history = vec![ChatMessage::system(format!(
        "You are an AI assistant that solves tasks by exchanging messages with a program. \
You will be given an input that follows this JSON schema:\n\n{input_schema}\n\n\
Your final answer must follow this JSON schema:\n\n{answer_schema}\n\n\
Every message you send must be a sequence of operations. An operation is a three-letter \
code, a colon, a space, its content and the end marker `{END_MARKER}`. \
Think step by step with `THT: your reasoning{END_MARKER}` and give the final answer as JSON \
with `ANS: answer{END_MARKER}`. Only your first answer is taken into account.\n\n\
The task is:\n\n{}",
        task.description
    ))];

    if !tools.is_empty() {
        let catalog: Vec<String> = tools.iter().map(|t| catalog_line(t.as_ref())).collect();
        history.push(ChatMessage::system(format!(
            "Here are some tools you can use. To use a tool, send `ACT: tool_name(args){END_MARKER}` \
where args is JSON following the tool's argument schema. You will receive the tool's output in \
a message beginning with `OBS: `, or an error in a message beginning with `ERR: `.\n\n\
Tools:\n{}",
            catalog.join("\n")
        )));
    }

    if !task.examples.is_empty() {
        history.push(ChatMessage::system(
            "Here are some examples of how the task is solved:",
        ));
        for example in &task.examples {
            history.push(ChatMessage::user(encode("example input", &example.input)?));
            for step in &example.steps {
                history.push(example_step(step, codec));
            }
            let answer = Operation::Answer(encode("example answer", &example.answer)?);
            history.push(ChatMessage::assistant(codec.encode(&answer)));
        }
    }

    history.push(ChatMessage::system(format!(
        "Now you will be given the input. Remember: every message you send must only contain \
operations starting with `THT`, `ACT` or `ANS` and ending with `{END_MARKER}`."
    )));
    history.push(ChatMessage::user(encode("input", input)?));

    Ok(Prompt::new(history))
}

/// Steps the model would produce are assistant messages; engine feedback is
/// a system message.
fn example_step(step: &Operation, codec: &dyn ProtocolCodec) -> ChatMessage {
    let text = codec.encode(step);
    if step.code().is_model_code() {
        ChatMessage::assistant(text)
    } else {
        ChatMessage::system(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synapse_protocol::TextCodec;
    use synapse_tool::FnTool;
    use synapse_types::Role;

    fn echo() -> Arc<dyn Tool> {
        Arc::new(FnTool::sync(
            "echo",
            "Echo the text",
            json!({"text": "text to echo"}),
            |a| Ok(a["text"].clone()),
        ))
    }

    #[test]
    fn catalog_line_format() {
        assert_eq!(
            catalog_line(echo().as_ref()),
            r#"echo({"text":"text to echo"}) # Echo the text"#
        );
    }

    #[test]
    fn example_steps_are_attributed() {
        let codec = TextCodec::new();
        let thought = example_step(&Operation::Thought("x".into()), &codec);
        let obs = example_step(&Operation::observation("echo", "x"), &codec);
        assert_eq!(thought.role, Role::Assistant);
        assert_eq!(obs.role, Role::System);
        assert_eq!(obs.content, "OBS: x<END>");
    }
}
