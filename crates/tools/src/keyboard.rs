//! Keyboard action tool.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    skiff_agents::tool_registry::AgentTool,
    skiff_browser::{BrowserSession, keyboard},
};

/// Simulate keyboard shortcuts and special keys (not for typing text).
pub struct KeyboardActionTool {
    session: Arc<BrowserSession>,
}

impl KeyboardActionTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for KeyboardActionTool {
    fn name(&self) -> &str {
        "keyboard_action"
    }

    fn description(&self) -> &str {
        "Simulates keyboard shortcuts and special keys (not for typing \
         text). Accepts special keys (\"enter\", \"tab\", \"escape\", \
         \"up\", \"down\", \"f5\"), combinations (\"ctrl+a\", \
         \"shift+tab\", \"cmd+v\"), and comma-separated sequences \
         (\"tab, enter\")."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Key command: special key, combination, or sequence"
                }
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let key = params["key"].as_str().unwrap_or_default();
        Ok(serde_json::Value::String(
            keyboard::keyboard_action(&self.session, key).await,
        ))
    }
}
