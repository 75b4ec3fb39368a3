//! Agent core: chat message model, LLM providers, tool registry, and the
//! bounded tool-calling conversation loop.

pub mod model;
pub mod providers;
pub mod runner;
pub mod tool_registry;

pub use {
    model::{ChatMessage, CompletionResponse, LlmProvider, ToolCall, Usage},
    providers::build_provider,
    runner::{AgentRunResult, LoopOutcome, RunnerConfig, run_agent_loop},
    tool_registry::{AgentTool, ToolRegistry},
};
