//! Anthropic messages provider.

use {anyhow::bail, async_trait::async_trait, secrecy::ExposeSecret, tracing::debug};

use crate::model::{ChatMessage, CompletionResponse, LlmProvider, ToolCall, Usage};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: secrecy::Secret<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        api_key: secrecy::Secret<String>,
        model: String,
        base_url: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }
}

/// Convert tool schemas from the generic format to Anthropic's tool format.
pub(crate) fn to_anthropic_tools(tools: &[serde_json::Value]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t["name"],
                "description": t["description"],
                "input_schema": t["parameters"],
            })
        })
        .collect()
}

/// Parse tool_use blocks from an Anthropic response.
pub(crate) fn parse_tool_calls(content: &[serde_json::Value]) -> Vec<ToolCall> {
    content
        .iter()
        .filter_map(|block| {
            if block["type"].as_str() == Some("tool_use") {
                Some(ToolCall {
                    id: block["id"].as_str().unwrap_or("").to_string(),
                    name: block["name"].as_str().unwrap_or("").to_string(),
                    arguments: block["input"].clone(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Convert a `ChatMessage` list to Anthropic format.
///
/// Returns `(system_text, anthropic_messages)`. System messages are
/// extracted (Anthropic takes them as a top-level `system` field). Tool
/// messages become user messages with `tool_result` content blocks;
/// assistant messages with tool calls become content arrays with
/// `tool_use` blocks.
pub(crate) fn to_anthropic_messages(
    messages: &[ChatMessage],
) -> (Option<String>, Vec<serde_json::Value>) {
    let mut system_text: Option<String> = None;
    let mut out = Vec::new();

    for msg in messages {
        match msg {
            ChatMessage::System { content } => {
                system_text = Some(match system_text {
                    Some(existing) => format!("{existing}\n\n{content}"),
                    None => content.clone(),
                });
            },
            ChatMessage::User { content } => {
                out.push(serde_json::json!({ "role": "user", "content": content }));
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                if tool_calls.is_empty() {
                    out.push(serde_json::json!({
                        "role": "assistant",
                        "content": content.as_deref().unwrap_or(""),
                    }));
                } else {
                    let mut blocks: Vec<serde_json::Value> = Vec::new();
                    if let Some(text) = content {
                        if !text.is_empty() {
                            blocks.push(serde_json::json!({ "type": "text", "text": text }));
                        }
                    }
                    for tc in tool_calls {
                        blocks.push(serde_json::json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.name,
                            "input": tc.arguments,
                        }));
                    }
                    out.push(serde_json::json!({ "role": "assistant", "content": blocks }));
                }
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => {
                out.push(serde_json::json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": tool_call_id,
                        "content": content,
                    }]
                }));
            },
        }
    }

    (system_text, out)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<CompletionResponse> {
        let (system, formatted) = to_anthropic_messages(messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": formatted,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens.max(1),
        });
        if let Some(system) = system {
            body["system"] = serde_json::json!(system);
        }
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(to_anthropic_tools(tools));
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error");
            bail!("anthropic API error ({status}): {message}");
        }

        let empty = Vec::new();
        let content = payload["content"].as_array().unwrap_or(&empty);

        let mut text = String::new();
        for block in content {
            if block["type"].as_str() == Some("text") {
                text.push_str(block["text"].as_str().unwrap_or(""));
            }
        }
        let tool_calls = parse_tool_calls(content);

        debug!(
            has_text = !text.is_empty(),
            tool_calls = tool_calls.len(),
            "completion received"
        );

        Ok(CompletionResponse {
            text: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            usage: Usage {
                input_tokens: payload["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: payload["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_are_extracted() {
        let messages = [
            ChatMessage::system("be careful"),
            ChatMessage::user("go"),
        ];
        let (system, formatted) = to_anthropic_messages(&messages);
        assert_eq!(system.as_deref(), Some("be careful"));
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0]["role"], "user");
    }

    #[test]
    fn tool_messages_become_tool_result_blocks() {
        let messages = [ChatMessage::tool("call_1", "Clicked on element")];
        let (_, formatted) = to_anthropic_messages(&messages);
        assert_eq!(formatted[0]["role"], "user");
        assert_eq!(formatted[0]["content"][0]["type"], "tool_result");
        assert_eq!(formatted[0]["content"][0]["tool_use_id"], "call_1");
        assert_eq!(formatted[0]["content"][0]["content"], "Clicked on element");
    }

    #[test]
    fn assistant_tool_calls_become_tool_use_blocks() {
        let messages = [ChatMessage::assistant_with_tools(
            Some("clicking now".into()),
            vec![ToolCall {
                id: "call_1".into(),
                name: "click".into(),
                arguments: serde_json::json!({"target": "3"}),
            }],
        )];
        let (_, formatted) = to_anthropic_messages(&messages);
        let blocks = formatted[0]["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["name"], "click");
        assert_eq!(blocks[1]["input"]["target"], "3");
    }

    #[test]
    fn tool_schema_uses_input_schema_key() {
        let generic = vec![serde_json::json!({
            "name": "scroll",
            "description": "Scrolls the page.",
            "parameters": { "type": "object", "properties": {} }
        })];
        let tools = to_anthropic_tools(&generic);
        assert_eq!(tools[0]["name"], "scroll");
        assert!(tools[0]["input_schema"].is_object());
        assert!(tools[0].get("parameters").is_none());
    }

    #[test]
    fn parses_tool_use_blocks() {
        let content = vec![
            serde_json::json!({ "type": "text", "text": "on it" }),
            serde_json::json!({
                "type": "tool_use",
                "id": "toolu_1",
                "name": "analyze_page",
                "input": {}
            }),
        ];
        let calls = parse_tool_calls(&content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].name, "analyze_page");
    }
}
