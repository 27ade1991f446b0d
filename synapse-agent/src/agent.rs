//! The agent engine.
//!
//! One attempt runs the following state machine:
//!
//! ```text
//! Compiling -> AwaitingModel -> Decoding -> (Dispatching | Validating)* -> AwaitingModel ...
//!                                                      \-> Answered
//! ```
//!
//! Compiling builds the opening prompt and records it in memory. Every model
//! reply is recorded too, then decoded into operations which are handled in
//! order: thoughts are skipped, actions are dispatched, and the first answer
//! that parses and validates ends the attempt. Observations and errors
//! collected along the way become the context of the next model call.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use synapse_memory::Memory;
use synapse_protocol::{Operation, ProtocolCodec, TextCodec};
use synapse_tool::{ArgPipeline, Dispatcher, RepairError, Tool, ToolRegistry, function_spec};
use synapse_types::{ChatMessage, FunctionCall, FunctionSpec, Llm, Prompt};
use tracing::Instrument;

use crate::compile::compile;
use crate::config::{AgentConfig, MemoryFactory, Validator};
use crate::error::AgentError;
use crate::task::Task;

enum Step<O> {
    Answered(O),
    Continue(Vec<ChatMessage>),
}

/// Solves a [`Task`] for one input at a time by driving a language model.
///
/// An agent is immutable once built. [`Agent::run`] gives every attempt its
/// own memory from the configured factory, so concurrent runs on one agent
/// never share conversation state.
pub struct Agent<I, O> {
    llm: Arc<dyn Llm>,
    task: Task<I, O>,
    tools: ToolRegistry,
    catalog: Vec<Arc<dyn Tool>>,
    functions: Vec<FunctionSpec>,
    pipeline: ArgPipeline,
    dispatcher: Dispatcher,
    codec: Arc<dyn ProtocolCodec>,
    input_validators: Vec<Validator<I>>,
    output_validators: Vec<Validator<O>>,
    max_solution_attempts: usize,
    max_restarts: usize,
    memory: MemoryFactory,
}

impl<I, O> Agent<I, O>
where
    I: Serialize + JsonSchema,
    O: Serialize + JsonSchema,
{
    /// Build an agent.
    ///
    /// When `llm` supports native function calls, every tool whose fuzzy
    /// schema can be turned into a function spec is offered natively; the
    /// rest stay in the textual tool catalog.
    pub fn new(llm: Arc<dyn Llm>, task: Task<I, O>, config: AgentConfig<I, O>) -> Self {
        let tools: ToolRegistry = config.tools.iter().cloned().collect();

        let mut catalog = Vec::new();
        let mut functions = Vec::new();
        for tool in tools.iter() {
            if !llm.supports_functions() {
                catalog.push(Arc::clone(tool));
                continue;
            }
            match function_spec(tool.as_ref()) {
                Ok(spec) => functions.push(spec),
                Err(e) => {
                    tracing::warn!(tool = %tool.name(), error = %e, "synapse.agent.textual_fallback");
                    catalog.push(Arc::clone(tool));
                }
            }
        }

        let pipeline = ArgPipeline::assemble(&config.preprocessors, &tools);
        let dispatcher = match config.confirm {
            Some(confirm) => Dispatcher::with_confirm(confirm),
            None => Dispatcher::new(),
        };

        Self {
            llm,
            task,
            tools,
            catalog,
            functions,
            pipeline,
            dispatcher,
            codec: Arc::new(TextCodec::with_policy(config.unparsed_reply)),
            input_validators: config.input_validators,
            output_validators: config.output_validators,
            max_solution_attempts: config.max_solution_attempts,
            max_restarts: config.max_restarts,
            memory: config.memory,
        }
    }

    /// The task this agent solves.
    pub fn task(&self) -> &Task<I, O> {
        &self.task
    }

    /// Function specs offered to the backend for native calls.
    pub fn native_functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    /// Solve the task for `input`.
    ///
    /// The input is validated once. Up to `max_restarts + 1` attempts are
    /// made, each with fresh memory; the last attempt's error is returned if
    /// none answers.
    pub async fn run(&self, input: &I) -> Result<O, AgentError> {
        self.validate_input(input)?;

        let mut attempt = 0;
        loop {
            let mut memory = (self.memory)();
            let span = tracing::info_span!("synapse.agent.attempt", attempt);
            match self.attempt(input, memory.as_mut()).instrument(span).await {
                Ok(answer) => return Ok(answer),
                Err(error) if attempt < self.max_restarts => {
                    tracing::warn!(attempt, error = %error, "synapse.agent.restart");
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Solve the task for `input` in a single attempt using a caller-owned
    /// memory. No restarts are made, since the memory cannot be reset.
    pub async fn run_with_memory(
        &self,
        input: &I,
        memory: &mut dyn Memory,
    ) -> Result<O, AgentError> {
        self.validate_input(input)?;
        self.attempt(input, memory).await
    }

    fn validate_input(&self, input: &I) -> Result<(), AgentError> {
        let failures: Vec<String> = self
            .input_validators
            .iter()
            .filter_map(|v| v(input).err().map(|e| e.to_string()))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidInput(failures.join("; ")))
        }
    }

    async fn attempt(&self, input: &I, memory: &mut dyn Memory) -> Result<O, AgentError> {
        let prompt = compile(&self.task, input, &self.catalog, self.codec.as_ref())?;
        memory.add_prompt(prompt.clone()).await?;
        let mut reply = self.call_model(&prompt).await?;
        memory.add(self.remembered(&reply)).await?;

        let mut steps = 0;
        loop {
            let next = match self.step(&reply).await? {
                Step::Answered(answer) => {
                    tracing::info!(steps, "synapse.agent.answered");
                    return Ok(answer);
                }
                Step::Continue(next) => next,
            };
            tracing::debug!(steps, feedback = next.len(), "synapse.agent.step");

            let prompt = memory.prompt_with_context(next).await?;
            if self.max_solution_attempts > 0 && steps > self.max_solution_attempts {
                return Err(AgentError::MaxAttemptsExceeded(self.max_solution_attempts));
            }
            reply = self.call_model(&prompt).await?;
            memory.add(self.remembered(&reply)).await?;
            steps += 1;
        }
    }

    async fn call_model(&self, prompt: &Prompt) -> Result<ChatMessage, AgentError> {
        let reply = if self.functions.is_empty() {
            self.llm.chat(prompt).await?
        } else {
            self.llm.chat_with_functions(prompt, &self.functions).await?
        };
        Ok(reply)
    }

    async fn step(&self, reply: &ChatMessage) -> Result<Step<O>, AgentError> {
        if let Some(call) = &reply.function_call {
            let op = self.invoke(&call.name, &call.arguments).await?;
            let result = ChatMessage::function_result(call.name.clone(), self.codec.encode(&op));
            return Ok(Step::Continue(vec![result]));
        }

        let mut next = Vec::new();
        for op in self.codec.decode_reply(&reply.content) {
            match op {
                Operation::Thought(thought) => {
                    tracing::debug!(len = thought.len(), "synapse.agent.thought");
                }
                Operation::Action { tool, args } => {
                    let op = self.invoke(&tool, &args).await?;
                    next.push(self.feedback(&op));
                }
                Operation::Answer(payload) => match self.accept(&payload) {
                    Ok(answer) => return Ok(Step::Answered(answer)),
                    Err(op) => next.push(self.feedback(&op)),
                },
                op @ (Operation::Observation { .. } | Operation::Error { .. }) => {
                    next.push(self.feedback(&op));
                }
            }
        }
        Ok(Step::Continue(next))
    }

    fn feedback(&self, op: &Operation) -> ChatMessage {
        ChatMessage::system(self.codec.encode(op))
    }

    /// Run one tool call. Only a repair backend failure is fatal; everything
    /// else becomes an operation for the model.
    async fn invoke(&self, name: &str, raw_args: &str) -> Result<Operation, AgentError> {
        let Some(tool) = self.tools.get(name) else {
            tracing::debug!(tool = %name, "synapse.agent.unknown_tool");
            return Ok(Operation::error(self.tools.not_found_message(name)));
        };

        let args = if raw_args.trim().is_empty() {
            Value::Null
        } else {
            let repaired = match self.pipeline.process(raw_args.to_string()).await {
                Ok(repaired) => repaired,
                Err(RepairError::Backend(e)) => return Err(AgentError::Backend(e)),
                Err(e) => return Ok(Operation::tool_error(name, format!("{name}: {e}"))),
            };
            match serde_json::from_str(&repaired) {
                Ok(args) => args,
                Err(e) => {
                    return Ok(Operation::tool_error(
                        name,
                        format!("{name}: arguments are not valid JSON: {e}"),
                    ));
                }
            }
        };

        Ok(self.dispatcher.execute(tool.as_ref(), args).await.into_operation())
    }

    /// Parse and validate an answer payload; a rejection is returned as the
    /// error to send back.
    fn accept(&self, payload: &str) -> Result<O, Operation> {
        let answer = self
            .task
            .parse_answer(payload)
            .map_err(|e| Operation::error(format!("invalid answer: {e}")))?;

        let failures: Vec<String> = self
            .output_validators
            .iter()
            .filter_map(|v| v(&answer).err().map(|e| e.to_string()))
            .collect();
        if failures.is_empty() {
            Ok(answer)
        } else {
            tracing::debug!(failures = failures.len(), "synapse.agent.answer_rejected");
            Err(Operation::error(format!(
                "answer failed validation: {}",
                failures.join("; ")
            )))
        }
    }

    /// The reply as stored in memory, with action arguments compacted by
    /// their tools.
    fn remembered(&self, reply: &ChatMessage) -> ChatMessage {
        if let Some(call) = &reply.function_call {
            return match self.compact(&call.name, &call.arguments) {
                Some(arguments) => ChatMessage {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        arguments,
                    }),
                    ..reply.clone()
                },
                None => reply.clone(),
            };
        }

        let ops = self.codec.decode_reply(&reply.content);
        if ops.iter().any(|op| matches!(op, Operation::Error { .. })) {
            return reply.clone();
        }
        let mut changed = false;
        let ops: Vec<Operation> = ops
            .into_iter()
            .map(|op| match op {
                Operation::Action { tool, args } => match self.compact(&tool, &args) {
                    Some(args) => {
                        changed = true;
                        Operation::Action { tool, args }
                    }
                    None => Operation::Action { tool, args },
                },
                other => other,
            })
            .collect();
        if !changed {
            return reply.clone();
        }
        let content: Vec<String> = ops.iter().map(|op| self.codec.encode(op)).collect();
        ChatMessage::assistant(content.join("\n"))
    }

    fn compact(&self, tool: &str, args: &str) -> Option<String> {
        let tool = self.tools.get(tool)?;
        let value: Value = serde_json::from_str(args).ok()?;
        let compacted = tool.compact_args(value.clone());
        (compacted != value).then(|| compacted.to_string())
    }
}
