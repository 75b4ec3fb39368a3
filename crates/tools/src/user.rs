//! Terminal interaction tool for requesting information from the user.

use std::io::Write;

use {anyhow::Result, async_trait::async_trait, tracing::debug};

use skiff_agents::tool_registry::AgentTool;

/// Request a single piece of information from the user at the terminal.
pub struct AskUserTool;

#[async_trait]
impl AgentTool for AskUserTool {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn description(&self) -> &str {
        "Requests a single piece of information from the user. Use only for \
         credentials that aren't provided, payment or purchase \
         confirmations, destructive actions, or data you genuinely don't \
         have and can't infer. Make separate calls for multiple fields."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Question to ask the user"
                },
                "type": {
                    "type": "string",
                    "enum": ["text", "password", "choice"],
                    "description": "Kind of input requested (default: text)"
                },
                "choices": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Options for choice-type prompts"
                },
                "default": {
                    "type": "string",
                    "description": "Default value when the user provides no input"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let prompt = params["prompt"]
            .as_str()
            .unwrap_or("Please provide one specific value")
            .to_string();
        let input_type = params["type"].as_str().unwrap_or("text").to_lowercase();
        let choices: Vec<String> = params["choices"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| c.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        let default = params["default"].as_str().unwrap_or("").to_string();

        debug!(prompt = %prompt, input_type = %input_type, "asking user");

        // Terminal I/O is blocking; keep it off the async executor.
        let answer = tokio::task::spawn_blocking(move || {
            prompt_user(&prompt, &input_type, &choices, &default)
        })
        .await?;

        Ok(serde_json::Value::String(match answer {
            Ok(value) => value,
            Err(e) => format!("Error getting input from user: {e}"),
        }))
    }
}

fn prompt_user(
    prompt: &str,
    input_type: &str,
    choices: &[String],
    default: &str,
) -> std::io::Result<String> {
    let mut rendered = format!("\n> {prompt}");

    if !choices.is_empty() {
        rendered.push_str("\n  Choose one option:");
        for (i, choice) in choices.iter().enumerate() {
            rendered.push_str(&format!("\n  {}. {choice}", i + 1));
        }
        if !default.is_empty() {
            rendered.push_str(&format!("\n  Default: {default}"));
        }
        rendered.push_str("\n  Enter selection (number or option name): ");
    } else if !default.is_empty() {
        rendered.push_str(&format!(" (default: {default}): "));
    } else {
        rendered.push_str(": ");
    }

    if input_type == "password" {
        rendered.push_str("(input will be visible) ");
    }

    let mut stdout = std::io::stdout();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let mut answer = line.trim().to_string();

    if answer.is_empty() && !default.is_empty() {
        answer = default.to_string();
    }

    // Numeric selection resolves to the option text.
    if !choices.is_empty() {
        if let Ok(index) = answer.parse::<usize>() {
            if index >= 1 && index <= choices.len() {
                answer = choices[index - 1].clone();
            }
        }
    }

    Ok(answer)
}
