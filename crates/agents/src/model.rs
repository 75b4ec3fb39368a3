//! Typed chat messages and the LLM provider interface.

use async_trait::async_trait;

/// Typed chat message for the provider interface.
///
/// History is append-only: messages are created per turn and never mutated
/// after creation.
#[derive(Debug, Clone)]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message with text only (no tool calls).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: vec![],
        }
    }

    /// Create an assistant message with tool calls (and optional text).
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content,
            tool_calls,
        }
    }

    /// Create a tool result message.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Convert to OpenAI-compatible JSON format.
    ///
    /// Used by providers that speak the OpenAI Chat Completions API
    /// (OpenAI, Groq).
    #[must_use]
    pub fn to_openai_value(&self) -> serde_json::Value {
        match self {
            ChatMessage::System { content } => {
                serde_json::json!({ "role": "system", "content": content })
            },
            ChatMessage::User { content } => {
                serde_json::json!({ "role": "user", "content": content })
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    serde_json::json!({
                        "role": "assistant",
                        "content": content.as_deref().unwrap_or(""),
                    })
                } else {
                    let tc_json: Vec<serde_json::Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            serde_json::json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    let mut msg = serde_json::json!({
                        "role": "assistant",
                        "tool_calls": tc_json,
                    });
                    if let Some(text) = content {
                        msg["content"] = serde_json::Value::String(text.clone());
                    }
                    msg
                }
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => {
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                })
            },
        }
    }
}

/// A structured tool invocation request from the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Response from an LLM completion call: one assistant message with text
/// and zero or more tool calls.
#[derive(Debug)]
pub struct CompletionResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// LLM provider trait (OpenAI, Groq, Anthropic).
///
/// Accepts the ordered message history plus tool schemas in the generic
/// `{name, description, parameters}` shape; each implementation maps both
/// onto its own wire format.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gpt-4o", "claude-sonnet-4-20250514").
    fn id(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<CompletionResponse>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn system_message() {
        let msg = ChatMessage::system("You are helpful.");
        assert!(matches!(msg, ChatMessage::System { content } if content == "You are helpful."));
    }

    #[test]
    fn tool_message() {
        let msg = ChatMessage::tool("call_1", "result");
        assert!(
            matches!(msg, ChatMessage::Tool { tool_call_id, content } if tool_call_id == "call_1" && content == "result")
        );
    }

    #[test]
    fn to_openai_system_and_user() {
        let val = ChatMessage::system("sys").to_openai_value();
        assert_eq!(val["role"], "system");
        assert_eq!(val["content"], "sys");

        let val = ChatMessage::user("hi").to_openai_value();
        assert_eq!(val["role"], "user");
        assert_eq!(val["content"], "hi");
    }

    #[test]
    fn to_openai_assistant_text() {
        let val = ChatMessage::assistant("hello").to_openai_value();
        assert_eq!(val["role"], "assistant");
        assert_eq!(val["content"], "hello");
        assert!(val.get("tool_calls").is_none());
    }

    #[test]
    fn to_openai_assistant_with_tools() {
        let msg = ChatMessage::assistant_with_tools(Some("thinking".into()), vec![ToolCall {
            id: "call_1".into(),
            name: "click".into(),
            arguments: serde_json::json!({"target": "5"}),
        }]);
        let val = msg.to_openai_value();
        assert_eq!(val["role"], "assistant");
        assert_eq!(val["content"], "thinking");
        let tcs = val["tool_calls"].as_array().unwrap();
        assert_eq!(tcs.len(), 1);
        assert_eq!(tcs[0]["id"], "call_1");
        assert_eq!(tcs[0]["function"]["name"], "click");
        // Arguments travel as a JSON-encoded string.
        assert_eq!(tcs[0]["function"]["arguments"], "{\"target\":\"5\"}");
    }

    #[test]
    fn to_openai_tool_result() {
        let val = ChatMessage::tool("call_1", "output").to_openai_value();
        assert_eq!(val["role"], "tool");
        assert_eq!(val["tool_call_id"], "call_1");
        assert_eq!(val["content"], "output");
    }
}
