//! Element interaction tools: click, type, select.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait};

use {
    skiff_agents::tool_registry::AgentTool,
    skiff_browser::{BrowserSession, Target, executor, resolver},
};

/// Extract the target specification from tool arguments.
///
/// Accepts a dedicated `target` field (object or string) or, for the
/// flat calling convention, the argument object itself.
fn target_from_params(params: &serde_json::Value) -> serde_json::Value {
    match params.get("target") {
        Some(target) if !target.is_null() => target.clone(),
        _ => params.clone(),
    }
}

/// Click a webpage element using precise targeting.
pub struct ClickTool {
    session: Arc<BrowserSession>,
}

impl ClickTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for ClickTool {
    fn name(&self) -> &str {
        "click"
    }

    fn description(&self) -> &str {
        "Clicks a webpage element using precise targeting. Provide the \
         target as JSON ({\"id\": \"5\", \"type\": \"button\", \"text\": \
         \"Submit\"}, most precise), a bare element ID from analyze_page \
         output, or a natural-language description (\"Sign in button\", \
         less precise). The tool scrolls elements into view and uses \
         multiple strategies (coordinates, CSS selectors, JavaScript) for \
         reliable clicks on all element types."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": ["object", "string"],
                    "description": "Element to click: {\"id\", \"type\", \"text\"} JSON, \
                                    a quoted element ID, or a text description",
                    "properties": {
                        "id": { "type": "string", "description": "Element ID from analyze_page" },
                        "type": { "type": "string", "description": "Element type (button, link, input, ...)" },
                        "text": { "type": "string", "description": "Visible text of the element" }
                    }
                }
            },
            "required": ["target"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let target_value = target_from_params(&params);
        let target = match Target::parse(&target_value) {
            Ok(t) => t,
            Err(e) => {
                return Ok(serde_json::Value::String(format!(
                    "Error clicking on element: {e}"
                )));
            },
        };

        let message = match resolver::resolve(&self.session, &target).await {
            Ok(element) => executor::click(&self.session, &element).await.message,
            Err(e) => e.to_string(),
        };
        Ok(serde_json::Value::String(message))
    }
}

/// Type text into the currently focused input element.
pub struct TypeTool {
    session: Arc<BrowserSession>,
}

impl TypeTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for TypeTool {
    fn name(&self) -> &str {
        "type"
    }

    fn description(&self) -> &str {
        "Types text into the currently focused input element. IMPORTANT: \
         click an input field first before using this tool. Existing \
         content is cleared automatically, then the new text is typed. \
         Works with input fields, textareas, editable divs, and search \
         boxes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "value": {
                    "type": "string",
                    "description": "Text to type (replaces any existing content)"
                }
            },
            "required": ["value"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let value = params["value"].as_str().unwrap_or_default();
        Ok(serde_json::Value::String(
            executor::type_text(&self.session, value).await.message,
        ))
    }
}

/// Select an option from a dropdown element.
pub struct SelectOptionTool {
    session: Arc<BrowserSession>,
}

impl SelectOptionTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AgentTool for SelectOptionTool {
    fn name(&self) -> &str {
        "select_option"
    }

    fn description(&self) -> &str {
        "Selects an option from a dropdown or select element. Identify the \
         dropdown by id, type, and/or text, and supply the option to select \
         in 'value'. Example: {\"type\": \"dropdown\", \"text\": \
         \"Country\", \"value\": \"USA\"}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Element ID from analyze_page" },
                "type": { "type": "string", "description": "Element type, usually \"dropdown\"" },
                "text": { "type": "string", "description": "Dropdown label or description" },
                "value": { "type": "string", "description": "Option text to select" }
            },
            "required": ["value"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let Some(value) = params["value"].as_str().filter(|v| !v.is_empty()) else {
            return Ok(serde_json::Value::String(
                "Error: 'value' field is required in the input JSON.".to_string(),
            ));
        };

        let mut target_value = target_from_params(&params);
        // Strip the option value so it is not mistaken for a target field.
        if let Some(obj) = target_value.as_object_mut() {
            obj.remove("value");
        }

        let target = match Target::parse(&target_value) {
            Ok(t) => t,
            Err(_) => {
                return Ok(serde_json::Value::String(
                    "Error: At least one of 'id', 'type', or 'text' must be provided \
                     to identify the element."
                        .to_string(),
                ));
            },
        };

        let message = match resolver::resolve(&self.session, &target).await {
            Ok(element) => {
                executor::select_option(&self.session, &element, value)
                    .await
                    .message
            },
            Err(e) => format!(
                "No dropdown matching {} found, even after scrolling.",
                e.criteria()
            ),
        };
        Ok(serde_json::Value::String(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_extraction_prefers_target_field() {
        let params = serde_json::json!({ "target": { "id": "3" } });
        assert_eq!(target_from_params(&params), serde_json::json!({ "id": "3" }));

        let params = serde_json::json!({ "target": "Sign in button" });
        assert_eq!(
            target_from_params(&params),
            serde_json::json!("Sign in button")
        );
    }

    #[test]
    fn target_extraction_falls_back_to_flat_params() {
        let params = serde_json::json!({ "type": "dropdown", "text": "Country", "value": "USA" });
        assert_eq!(target_from_params(&params), params);
    }
}
