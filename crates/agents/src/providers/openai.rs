//! OpenAI-compatible chat-completions provider.
//!
//! Serves both OpenAI itself and Groq, which speaks the same wire format
//! behind a different base URL.

use {anyhow::bail, async_trait::async_trait, secrecy::ExposeSecret, tracing::debug};

use crate::model::{ChatMessage, CompletionResponse, LlmProvider, ToolCall, Usage};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiCompatProvider {
    provider_name: String,
    api_key: secrecy::Secret<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        provider_name: impl Into<String>,
        api_key: secrecy::Secret<String>,
        model: String,
        base_url: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }
}

/// Convert tool schemas from the generic format to OpenAI's function format.
pub(crate) fn to_openai_tools(tools: &[serde_json::Value]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t["name"],
                    "description": t["description"],
                    "parameters": t["parameters"],
                }
            })
        })
        .collect()
}

/// Parse tool calls from an OpenAI-style assistant message.
pub(crate) fn parse_tool_calls(message: &serde_json::Value) -> Vec<ToolCall> {
    let Some(raw) = message["tool_calls"].as_array() else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|tc| {
            let id = tc["id"].as_str()?.to_string();
            let name = tc["function"]["name"].as_str()?.to_string();
            let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
            let arguments =
                serde_json::from_str(args_str).unwrap_or_else(|_| serde_json::json!({}));
            Some(ToolCall {
                id,
                name,
                arguments,
            })
        })
        .collect()
}

fn parse_usage(payload: &serde_json::Value) -> Usage {
    Usage {
        input_tokens: payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: payload["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<CompletionResponse> {
        let formatted: Vec<serde_json::Value> =
            messages.iter().map(|m| m.to_openai_value()).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": formatted,
            "temperature": self.temperature,
        });
        if self.max_tokens > 0 {
            body["max_tokens"] = serde_json::json!(self.max_tokens);
        }
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(to_openai_tools(tools));
            body["tool_choice"] = serde_json::json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error");
            bail!("{} API error ({status}): {message}", self.provider_name);
        }

        let message = &payload["choices"][0]["message"];
        let text = message["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(String::from);
        let tool_calls = parse_tool_calls(message);

        debug!(
            provider = %self.provider_name,
            has_text = text.is_some(),
            tool_calls = tool_calls.len(),
            "completion received"
        );

        Ok(CompletionResponse {
            text,
            tool_calls,
            usage: parse_usage(&payload),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tool_schema_wraps_function_format() {
        let generic = vec![serde_json::json!({
            "name": "click",
            "description": "Clicks an element.",
            "parameters": { "type": "object", "properties": {} }
        })];
        let wrapped = to_openai_tools(&generic);
        assert_eq!(wrapped[0]["type"], "function");
        assert_eq!(wrapped[0]["function"]["name"], "click");
        assert_eq!(wrapped[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn parses_tool_calls_with_string_arguments() {
        let message = serde_json::json!({
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {
                    "name": "navigate",
                    "arguments": "{\"url\":\"https://example.com\"}"
                }
            }]
        });
        let calls = parse_tool_calls(&message);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "navigate");
        assert_eq!(calls[0].arguments["url"], "https://example.com");
    }

    #[test]
    fn malformed_arguments_fall_back_to_empty_object() {
        let message = serde_json::json!({
            "tool_calls": [{
                "id": "call_1",
                "function": { "name": "click", "arguments": "{not json" }
            }]
        });
        let calls = parse_tool_calls(&message);
        assert_eq!(calls[0].arguments, serde_json::json!({}));
    }

    #[test]
    fn no_tool_calls_is_empty() {
        assert!(parse_tool_calls(&serde_json::json!({"content": "hi"})).is_empty());
    }

    #[test]
    fn usage_parses_token_counts() {
        let payload = serde_json::json!({
            "usage": { "prompt_tokens": 42, "completion_tokens": 7 }
        });
        let usage = parse_usage(&payload);
        assert_eq!(usage.input_tokens, 42);
        assert_eq!(usage.output_tokens, 7);
    }
}
