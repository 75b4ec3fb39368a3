//! The tool-calling conversation loop.
//!
//! State machine: seed history, call the provider, dispatch any requested
//! tool calls in order, fold results back into history, repeat until a
//! tool-call-free turn (`Done`) or the iteration ceiling
//! (`MaxIterationsReached`). Tool failures become tool-result text, never
//! loop failures; the loop stays live so the caller can always issue a
//! corrective next instruction.

use {
    anyhow::Result,
    tracing::{debug, info, warn},
};

use skiff_memory::SessionMemory;

use crate::{
    model::{ChatMessage, LlmProvider, Usage},
    tool_registry::ToolRegistry,
};

/// Fallback loop limit when config is missing or invalid.
const DEFAULT_MAX_ITERATIONS: usize = 50;

/// How one loop invocation terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a tool-call-free turn.
    Done,
    /// The iteration ceiling was reached; a terminal, non-exceptional
    /// outcome.
    MaxIterationsReached,
}

/// Result of one agent loop invocation.
#[derive(Debug)]
pub struct AgentRunResult {
    pub text: String,
    pub outcome: LoopOutcome,
    pub iterations: usize,
    pub tool_calls_made: usize,
    pub usage: Usage,
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Iteration ceiling for one invocation.
    pub max_iterations: usize,
    /// Recent exchanges to pull from memory into the system prompt.
    pub memory_context_messages: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            memory_context_messages: 5,
        }
    }
}

fn resolve_max_iterations(configured: usize) -> usize {
    if configured == 0 {
        warn!(
            default = DEFAULT_MAX_ITERATIONS,
            "max_iterations was 0; falling back to default"
        );
        return DEFAULT_MAX_ITERATIONS;
    }
    configured
}

/// Run the agent loop: send history to the LLM, execute tool calls
/// strictly in order, repeat.
///
/// Session memory, when attached, is consulted once up front (context
/// appended to the system prompt) and appended to once when the loop
/// terminates, whichever way it terminates.
pub async fn run_agent_loop(
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    system_prompt: &str,
    task: &str,
    mut memory: Option<&mut SessionMemory>,
    config: &RunnerConfig,
) -> Result<AgentRunResult> {
    let max_iterations = resolve_max_iterations(config.max_iterations);
    let tool_schemas = tools.list_schemas();

    let mut system = system_prompt.to_string();
    if let Some(mem) = memory.as_deref() {
        let context = mem.context(config.memory_context_messages);
        if !context.is_empty() {
            system.push_str("\n\n## SESSION MEMORY\n");
            system.push_str(&context);
        }
    }

    info!(
        provider = provider.name(),
        model = provider.id(),
        tools_count = tool_schemas.len(),
        max_iterations,
        "starting agent loop"
    );

    let mut messages: Vec<ChatMessage> =
        vec![ChatMessage::system(system), ChatMessage::user(task)];

    let mut iterations = 0;
    let mut total_tool_calls = 0;
    let mut usage = Usage::default();

    while iterations < max_iterations {
        iterations += 1;

        info!(
            iteration = iterations,
            messages_count = messages.len(),
            "calling LLM"
        );

        let response = provider.complete(&messages, &tool_schemas).await?;

        usage.input_tokens = usage.input_tokens.saturating_add(response.usage.input_tokens);
        usage.output_tokens = usage
            .output_tokens
            .saturating_add(response.usage.output_tokens);

        info!(
            iteration = iterations,
            has_text = response.text.is_some(),
            tool_calls_count = response.tool_calls.len(),
            "LLM response received"
        );

        messages.push(ChatMessage::assistant_with_tools(
            response.text.clone(),
            response.tool_calls.clone(),
        ));

        if response.tool_calls.is_empty() {
            let text = response.text.unwrap_or_default();
            info!(
                iterations,
                tool_calls = total_tool_calls,
                "agent loop complete"
            );
            if let Some(mem) = memory.as_deref_mut() {
                mem.append_exchange(task, &text, true);
            }
            return Ok(AgentRunResult {
                text,
                outcome: LoopOutcome::Done,
                iterations,
                tool_calls_made: total_tool_calls,
                usage,
            });
        }

        // Dispatch the turn's tool calls strictly in order: no call starts
        // before the previous one's result is observed.
        for tc in &response.tool_calls {
            total_tool_calls += 1;
            info!(tool = %tc.name, id = %tc.id, args = %tc.arguments, "executing tool");

            let content = match tools.get(&tc.name) {
                Some(tool) => match tool.execute(tc.arguments.clone()).await {
                    Ok(value) => {
                        let text = result_to_string(&value);
                        debug!(tool = %tc.name, result_len = text.len(), "tool succeeded");
                        text
                    },
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "tool execution failed");
                        format!("Error executing {}: {e}", tc.name)
                    },
                },
                None => {
                    warn!(tool = %tc.name, "unknown tool requested");
                    format!("Tool {} not found", tc.name)
                },
            };

            messages.push(ChatMessage::tool(&tc.id, content));
        }
    }

    warn!(max_iterations, "agent loop reached iteration ceiling");
    let text = format!("Max iterations ({max_iterations}) reached without completion");
    if let Some(mem) = memory.as_deref_mut() {
        mem.append_exchange(task, &text, false);
    }
    Ok(AgentRunResult {
        text,
        outcome: LoopOutcome::MaxIterationsReached,
        iterations,
        tool_calls_made: total_tool_calls,
        usage,
    })
}

/// Stringify a tool result for the tool message: plain strings pass
/// through, anything else is JSON-encoded.
fn result_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
