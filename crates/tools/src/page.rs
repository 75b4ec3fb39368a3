//! Page analysis tool.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    skiff_agents::tool_registry::AgentTool,
    skiff_browser::{BrowserSession, snapshot},
};

/// Inspect the current viewport and refresh the element snapshot.
pub struct AnalyzePageTool {
    session: Arc<BrowserSession>,
}

impl AnalyzePageTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for AnalyzePageTool {
    fn name(&self) -> &str {
        "analyze_page"
    }

    fn description(&self) -> &str {
        "Analyzes the current page and returns all visible content and \
         interactive elements. Extracts buttons, links, inputs, and text \
         content with unique IDs for each element. Use this tool to see \
         what's on the page before interacting with it. Run after \
         navigation or page changes to refresh element information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::Value::String(
            snapshot::analyze(&self.session).await,
        ))
    }
}
