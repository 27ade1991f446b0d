use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use synapse_agent::*;
use synapse_memory::{BufferMemory, Memory};
use synapse_protocol::{INVALID_CODE, NO_MATCH, UnparsedReplyPolicy};
use synapse_tool::*;
use synapse_types::test_utils::{FailingLlm, ScriptedLlm};
use synapse_types::*;

// ---- Helpers ----

fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::sync(
        "echo",
        "Echo the text back",
        json!({"text": "the text to echo"}),
        |args| Ok(args["text"].clone()),
    ))
}

fn counting_tool(counter: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(FnTool::sync("count", "Count calls", json!({}), move |_| {
        Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
    }))
}

fn text_task() -> Task<String, String> {
    Task::json("Repeat the input")
}

fn agent_with(
    llm: Arc<ScriptedLlm>,
    config: AgentConfig<String, String>,
) -> Agent<String, String> {
    Agent::new(llm, text_task(), config)
}

fn tools(tools: Vec<Arc<dyn Tool>>) -> AgentConfig<String, String> {
    AgentConfig {
        tools,
        ..AgentConfig::default()
    }
}

/// Content of the last message of the `n`th prompt.
fn last_message(llm: &ScriptedLlm, n: usize) -> ChatMessage {
    llm.prompts()[n].history.last().cloned().unwrap()
}

// ---- Answers ----

#[tokio::test]
async fn answers_immediately_without_tools() {
    let llm = Arc::new(ScriptedLlm::texts(["ANS: \"hello\"<END>"]));
    let agent = agent_with(llm.clone(), AgentConfig::default());

    let answer = agent.run(&"hello".to_string()).await.unwrap();
    assert_eq!(answer, "hello");
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn tool_output_is_fed_back_as_observation() {
    let llm = Arc::new(ScriptedLlm::texts([
        "THT: I will echo it<END>\nACT: echo({\"text\": \"hi\"})<END>",
        "ANS: \"hi\"<END>",
    ]));
    let agent = agent_with(llm.clone(), tools(vec![echo_tool()]));

    assert_eq!(agent.run(&"hi".to_string()).await.unwrap(), "hi");
    let feedback = last_message(&llm, 1);
    assert_eq!(feedback.role, Role::System);
    assert_eq!(feedback.content, "OBS: hi<END>");
}

#[tokio::test]
async fn answer_ends_the_reply() {
    let counter = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(ScriptedLlm::texts(["ANS: \"x\"<END>ACT: count({})<END>"]));
    let agent = agent_with(llm.clone(), tools(vec![counting_tool(counter.clone())]));

    assert_eq!(agent.run(&"x".to_string()).await.unwrap(), "x");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn actions_before_the_answer_still_run() {
    let counter = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(ScriptedLlm::texts(["ACT: count()<END>ANS: \"x\"<END>"]));
    let agent = agent_with(llm.clone(), tools(vec![counting_tool(counter.clone())]));

    assert_eq!(agent.run(&"x".to_string()).await.unwrap(), "x");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// ---- Protocol feedback ----

#[tokio::test]
async fn unknown_tool_lists_available_tools() {
    let search: Arc<dyn Tool> = Arc::new(FnTool::sync("search", "Search", json!({"q": "query"}), Ok));
    let llm = Arc::new(ScriptedLlm::texts([
        "ACT: browse({\"url\": \"x\"})<END>",
        "ANS: \"done\"<END>",
    ]));
    let agent = agent_with(llm.clone(), tools(vec![search, echo_tool()]));

    agent.run(&"x".to_string()).await.unwrap();
    assert_eq!(
        last_message(&llm, 1).content,
        "ERR: tool not found: browse. Available tools: echo, search<END>"
    );
}

#[tokio::test]
async fn engine_codes_from_the_model_are_rejected() {
    let llm = Arc::new(ScriptedLlm::texts(["OBS: 42<END>", "ANS: \"42\"<END>"]));
    let agent = agent_with(llm.clone(), AgentConfig::default());

    agent.run(&"x".to_string()).await.unwrap();
    assert_eq!(last_message(&llm, 1).content, format!("ERR: {INVALID_CODE}<END>"));
}

#[tokio::test]
async fn unparsed_reply_is_silently_a_thought_by_default() {
    let llm = Arc::new(ScriptedLlm::texts(["let me think about it", "ANS: \"ok\"<END>"]));
    let agent = agent_with(llm.clone(), AgentConfig::default());

    agent.run(&"x".to_string()).await.unwrap();
    let first = llm.prompts()[0].len();
    let second = &llm.prompts()[1];
    assert_eq!(second.len(), first + 1);
    assert_eq!(second.history.last().unwrap().content, "let me think about it");
}

#[tokio::test]
async fn unparsed_reply_can_be_reported() {
    let llm = Arc::new(ScriptedLlm::texts(["let me think about it", "ANS: \"ok\"<END>"]));
    let config = AgentConfig {
        unparsed_reply: UnparsedReplyPolicy::FormatError,
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    agent.run(&"x".to_string()).await.unwrap();
    assert_eq!(last_message(&llm, 1).content, format!("ERR: {NO_MATCH}<END>"));
}

#[tokio::test]
async fn unparseable_answer_is_reported() {
    let llm = Arc::new(ScriptedLlm::texts(["ANS: not json<END>", "ANS: \"fine\"<END>"]));
    let agent = agent_with(llm.clone(), AgentConfig::default());

    assert_eq!(agent.run(&"x".to_string()).await.unwrap(), "fine");
    assert!(last_message(&llm, 1).content.starts_with("ERR: invalid answer: "));
}

#[tokio::test]
async fn output_validation_failures_are_fed_back() {
    let llm = Arc::new(ScriptedLlm::texts(["ANS: 5<END>", "ANS: 12<END>"]));
    let config: AgentConfig<String, u32> = AgentConfig {
        output_validators: vec![
            validator(|n: &u32| {
                if *n > 10 {
                    Ok(())
                } else {
                    Err("must be greater than 10".into())
                }
            }),
            validator(|n: &u32| {
                if n % 2 == 0 {
                    Ok(())
                } else {
                    Err("must be even".into())
                }
            }),
        ],
        ..AgentConfig::default()
    };
    let agent = Agent::new(llm.clone(), Task::json("Pick a number"), config);

    assert_eq!(agent.run(&"x".to_string()).await.unwrap(), 12);
    assert_eq!(
        last_message(&llm, 1).content,
        "ERR: answer failed validation: must be greater than 10; must be even<END>"
    );
}

// ---- Budgets and restarts ----

#[tokio::test]
async fn solution_attempts_bound_model_calls() {
    let llm = Arc::new(ScriptedLlm::repeating(ChatMessage::assistant(
        "THT: still thinking<END>",
    )));
    let config = AgentConfig {
        max_solution_attempts: 3,
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    let err = agent.run(&"x".to_string()).await.unwrap_err();
    assert!(err.is_budget_exceeded());
    assert!(matches!(err, AgentError::MaxAttemptsExceeded(3)));
    assert_eq!(llm.calls(), 5);
}

#[tokio::test]
async fn restarts_bound_attempts_and_return_last_error() {
    let llm = Arc::new(FailingLlm::new());
    let config = AgentConfig {
        max_restarts: 2,
        ..AgentConfig::default()
    };
    let agent = Agent::new(llm.clone(), text_task(), config);

    let err = agent.run(&"x".to_string()).await.unwrap_err();
    assert_eq!(llm.calls(), 3);
    assert!(err.to_string().contains("call 3"), "{err}");
}

#[tokio::test]
async fn restart_starts_from_a_fresh_memory() {
    let llm = Arc::new(ScriptedLlm::texts([
        "THT: a<END>",
        "THT: b<END>",
        "THT: c<END>",
        "ANS: \"second time\"<END>",
    ]));
    let config = AgentConfig {
        max_solution_attempts: 1,
        max_restarts: 1,
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    assert_eq!(agent.run(&"x".to_string()).await.unwrap(), "second time");
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 4);
    assert_eq!(prompts[3], prompts[0]);
}

#[tokio::test]
async fn invalid_input_is_fatal_and_never_retried() {
    let llm = Arc::new(ScriptedLlm::repeating(ChatMessage::assistant("ANS: \"x\"<END>")));
    let config = AgentConfig {
        input_validators: vec![validator(|s: &String| {
            if s.is_empty() {
                Err("input must not be empty".into())
            } else {
                Ok(())
            }
        })],
        max_restarts: 3,
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    let err = agent.run(&String::new()).await.unwrap_err();
    assert!(err.is_caller_error());
    assert_eq!(err.to_string(), "invalid input: input must not be empty");
    assert_eq!(llm.calls(), 0);
}

// ---- Dispatch ----

#[tokio::test]
async fn vetoed_action_is_reported_as_cancelled() {
    let counter = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(ScriptedLlm::texts(["ACT: count({})<END>", "ANS: \"no\"<END>"]));
    let config = AgentConfig {
        tools: vec![counting_tool(counter.clone())],
        confirm: Some(Arc::new(confirm_fn(|_, _| false))),
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    agent.run(&"x".to_string()).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(
        last_message(&llm, 1).content,
        format!("ERR: {CANCELLED_BY_USER}<END>")
    );
}

#[tokio::test]
async fn tool_errors_name_the_tool() {
    let broken: Arc<dyn Tool> = Arc::new(FnTool::sync("broken", "Fails", json!({}), |_| {
        Err(ToolError::ExecutionFailed("disk on fire".into()))
    }));
    let llm = Arc::new(ScriptedLlm::texts(["ACT: broken({})<END>", "ANS: \"ok\"<END>"]));
    let agent = agent_with(llm.clone(), tools(vec![broken]));

    agent.run(&"x".to_string()).await.unwrap();
    assert_eq!(
        last_message(&llm, 1).content,
        "ERR: broken: execution failed: disk on fire<END>"
    );
}

#[tokio::test]
async fn malformed_arguments_are_repaired() {
    let fixer_llm = Arc::new(ScriptedLlm::texts(["```json\n{\"text\": \"hi\"}\n```"]));
    let llm = Arc::new(ScriptedLlm::texts([
        "ACT: echo({\"text\": \"hi\")<END>",
        "ANS: \"hi\"<END>",
    ]));
    let config = AgentConfig {
        tools: vec![echo_tool()],
        preprocessors: vec![Arc::new(JsonAutoFixer::new(fixer_llm.clone(), 2))],
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    agent.run(&"hi".to_string()).await.unwrap();
    assert_eq!(fixer_llm.calls(), 1);
    assert_eq!(last_message(&llm, 1).content, "OBS: hi<END>");
}

#[tokio::test]
async fn exhausted_repair_is_reported_not_fatal() {
    let fixer_llm = Arc::new(ScriptedLlm::repeating(ChatMessage::assistant("{still")));
    let llm = Arc::new(ScriptedLlm::texts([
        "ACT: echo({\"text\": \"hi\")<END>",
        "ANS: \"gave up\"<END>",
    ]));
    let config = AgentConfig {
        tools: vec![echo_tool()],
        preprocessors: vec![Arc::new(JsonAutoFixer::new(fixer_llm, 1))],
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    assert_eq!(agent.run(&"hi".to_string()).await.unwrap(), "gave up");
    let feedback = last_message(&llm, 1).content;
    assert!(feedback.starts_with("ERR: echo: max retries exceeded"), "{feedback}");
}

#[tokio::test]
async fn repair_backend_failure_ends_the_attempt() {
    let llm = Arc::new(ScriptedLlm::texts(["ACT: echo({\"text\": )<END>"]));
    let config = AgentConfig {
        tools: vec![echo_tool()],
        preprocessors: vec![Arc::new(JsonAutoFixer::new(Arc::new(FailingLlm::new()), 3))],
        ..AgentConfig::default()
    };
    let agent = agent_with(llm.clone(), config);

    let err = agent.run(&"x".to_string()).await.unwrap_err();
    assert!(matches!(err, AgentError::Backend(_)));
}

#[tokio::test]
async fn invalid_json_without_repair_is_reported() {
    let llm = Arc::new(ScriptedLlm::texts([
        "ACT: echo({text: hi})<END>",
        "ANS: \"ok\"<END>",
    ]));
    let agent = agent_with(llm.clone(), tools(vec![echo_tool()]));

    agent.run(&"x".to_string()).await.unwrap();
    let feedback = last_message(&llm, 1).content;
    assert!(
        feedback.starts_with("ERR: echo: arguments are not valid JSON"),
        "{feedback}"
    );
}

// ---- Native function calls ----

#[tokio::test]
async fn native_calls_bypass_the_text_protocol() {
    let llm = Arc::new(
        ScriptedLlm::new([
            ChatMessage::function_call("echo", r#"{"text": "hi"}"#),
            ChatMessage::assistant("ANS: \"hi\"<END>"),
        ])
        .with_native_functions(),
    );
    let agent = agent_with(llm.clone(), tools(vec![echo_tool()]));
    assert_eq!(agent.native_functions().len(), 1);

    assert_eq!(agent.run(&"hi".to_string()).await.unwrap(), "hi");

    let offered = llm.offered_functions();
    assert_eq!(offered.len(), 2);
    assert_eq!(offered[0][0].name, "echo");
    assert_eq!(
        offered[0][0].parameters.properties["text"].description,
        "the text to echo"
    );

    let opening = &llm.prompts()[0];
    assert!(!opening.history.iter().any(|m| m.content.contains("Tools:")));

    let result = last_message(&llm, 1);
    assert_eq!(result.role, Role::Function);
    assert_eq!(result.name.as_deref(), Some("echo"));
    assert_eq!(result.content, "OBS: hi<END>");
}

#[tokio::test]
async fn tools_without_object_schema_stay_textual() {
    let shout: Arc<dyn Tool> = Arc::new(FnTool::sync("shout", "Uppercase", json!("the text"), |a| {
        Ok(json!(a.as_str().unwrap_or_default().to_uppercase()))
    }));
    let llm = Arc::new(
        ScriptedLlm::texts(["ACT: shout(\"hey\")<END>", "ANS: \"HEY\"<END>"]).with_native_functions(),
    );
    let agent = agent_with(llm.clone(), tools(vec![echo_tool(), shout]));

    let natives: Vec<_> = agent.native_functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(natives, vec!["echo"]);

    assert_eq!(agent.run(&"hey".to_string()).await.unwrap(), "HEY");
    let opening = &llm.prompts()[0];
    let catalog = opening
        .history
        .iter()
        .find(|m| m.content.contains("Tools:"))
        .unwrap();
    assert!(catalog.content.contains("shout(\"the text\") # Uppercase"));
    assert!(!catalog.content.contains("echo("));
    assert_eq!(last_message(&llm, 1).content, "OBS: HEY<END>");
}

// ---- Memory ----

struct Redacting;

#[async_trait]
impl Tool for Redacting {
    fn name(&self) -> &str {
        "store"
    }
    fn description(&self) -> &str {
        "Store a document"
    }
    fn args_schema(&self) -> serde_json::Value {
        json!({"document": "the document"})
    }
    async fn execute(&self, _args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Ok(json!("stored"))
    }
    fn compact_args(&self, _args: serde_json::Value) -> serde_json::Value {
        json!({"document": "..."})
    }
}

#[tokio::test]
async fn memory_keeps_compacted_arguments() {
    let llm = Arc::new(ScriptedLlm::texts([
        "ACT: store({\"document\": \"a very long document\"})<END>",
        "ANS: \"stored\"<END>",
    ]));
    let agent = agent_with(llm.clone(), tools(vec![Arc::new(Redacting)]));

    let mut memory = BufferMemory::unbounded();
    agent
        .run_with_memory(&"x".to_string(), &mut memory)
        .await
        .unwrap();

    let history = memory.history();
    let stored: Vec<_> = history
        .iter()
        .filter(|m| m.role == Role::Assistant && m.content.starts_with("ACT"))
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "ACT: store({\"document\":\"...\"})<END>");
    assert_eq!(history.last().unwrap().content, "ANS: \"stored\"<END>");
}

/// Answers with whatever the last user message says.
struct Parrot;

#[async_trait]
impl Llm for Parrot {
    async fn chat(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        tokio::task::yield_now().await;
        let input = prompt
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatMessage::assistant(format!("ANS: {input}<END>")))
    }
}

#[tokio::test]
async fn concurrent_runs_do_not_share_memory() {
    let agent = Arc::new(Agent::new(Arc::new(Parrot), text_task(), AgentConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.run(&format!("input {i}")).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), format!("input {i}"));
    }
}

#[tokio::test]
async fn caller_owned_memory_sees_the_whole_run() {
    let llm = Arc::new(ScriptedLlm::texts(["THT: hmm<END>", "ANS: \"ok\"<END>"]));
    let agent = agent_with(llm.clone(), AgentConfig::default());

    let mut memory = BufferMemory::unbounded();
    agent
        .run_with_memory(&"x".to_string(), &mut memory)
        .await
        .unwrap();
    let opening = llm.prompts()[0].len();
    assert_eq!(memory.history().len(), opening + 2);

    // The memory can be inspected through the trait as well.
    let prompt = memory.prompt_with_context(vec![]).await.unwrap();
    assert_eq!(prompt.len(), opening + 2);
}
