//! The tool surface exposed to the inference provider.
//!
//! Nine tools, each with a statically declared JSON schema: analyze_page,
//! navigate, go_back, scroll, click, type, select_option, keyboard_action,
//! and ask_user. Every tool returns a plain status string — success or
//! failure — never a structured error object, keeping the contract uniform
//! for the inference layer.

pub mod element;
pub mod keyboard;
pub mod navigation;
pub mod page;
pub mod user;

use std::sync::Arc;

use {skiff_agents::tool_registry::ToolRegistry, skiff_browser::BrowserSession};

pub use {
    element::{ClickTool, SelectOptionTool, TypeTool},
    keyboard::KeyboardActionTool,
    navigation::{GoBackTool, NavigateTool, ScrollTool},
    page::AnalyzePageTool,
    user::AskUserTool,
};

/// Register the full browser tool surface on a registry.
pub fn register_browser_tools(registry: &mut ToolRegistry, session: Arc<BrowserSession>) {
    registry.register(Box::new(AnalyzePageTool::new(session.clone())));
    registry.register(Box::new(NavigateTool::new(session.clone())));
    registry.register(Box::new(GoBackTool::new(session.clone())));
    registry.register(Box::new(ScrollTool::new(session.clone())));
    registry.register(Box::new(ClickTool::new(session.clone())));
    registry.register(Box::new(TypeTool::new(session.clone())));
    registry.register(Box::new(SelectOptionTool::new(session.clone())));
    registry.register(Box::new(KeyboardActionTool::new(session)));
    registry.register(Box::new(AskUserTool));
}

#[cfg(test)]
mod tests {
    use skiff_agents::tool_registry::AgentTool;

    use super::*;

    #[test]
    fn ask_user_schema_is_static_and_complete() {
        let tool = AskUserTool;
        assert_eq!(tool.name(), "ask_user");
        let schema = tool.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["prompt"].is_object());
        assert_eq!(schema["required"][0], "prompt");
    }
}
