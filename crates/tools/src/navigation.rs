//! Navigation and scrolling tools.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    skiff_agents::tool_registry::AgentTool,
    skiff_browser::{BrowserSession, scroll},
};

/// Navigate the browser to a URL.
pub struct NavigateTool {
    session: Arc<BrowserSession>,
}

impl NavigateTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for NavigateTool {
    fn name(&self) -> &str {
        "navigate"
    }

    fn description(&self) -> &str {
        "Navigates the browser to a specified URL. Accepts a full URL \
         (\"https://www.example.com\") or a bare domain (\"example.com\", \
         https:// is added automatically)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to navigate to"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let Some(url) = params["url"].as_str().filter(|u| !u.trim().is_empty()) else {
            return Ok(serde_json::Value::String(
                "Error: 'url' parameter is required.".to_string(),
            ));
        };

        let message = match self.session.navigate(url).await {
            Ok(current) => format!("Navigated to {url} - Current page: {current}"),
            Err(e) => format!("Error navigating to {url}: {e}"),
        };
        Ok(serde_json::Value::String(message))
    }
}

/// Navigate back in browser history.
pub struct GoBackTool {
    session: Arc<BrowserSession>,
}

impl GoBackTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for GoBackTool {
    fn name(&self) -> &str {
        "go_back"
    }

    fn description(&self) -> &str {
        "Navigates back to the previous page in browser history. Simulates \
         clicking the browser back button. Use when you need to return to a \
         previously visited page."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<serde_json::Value> {
        let message = match self.session.go_back().await {
            Ok(url) => format!("Navigated back to previous page: {url}"),
            Err(e) => format!("Error navigating back: {e}"),
        };
        Ok(serde_json::Value::String(message))
    }
}

/// Scroll the page.
pub struct ScrollTool {
    session: Arc<BrowserSession>,
}

impl ScrollTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for ScrollTool {
    fn name(&self) -> &str {
        "scroll"
    }

    fn description(&self) -> &str {
        "Scrolls the web page in the specified direction: \"down\" or \
         \"up\" scroll one viewport height, \"top\" and \"bottom\" jump to \
         the page boundaries. Reports the new position and whether a \
         boundary was reached."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "direction": {
                    "type": "string",
                    "enum": ["down", "up", "top", "bottom"],
                    "description": "Scroll direction (default: down)"
                }
            }
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let direction = params["direction"].as_str().unwrap_or("down");
        Ok(serde_json::Value::String(
            scroll::scroll(&self.session, direction).await,
        ))
    }
}
