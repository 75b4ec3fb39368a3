//! Element records, snapshots, and action outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic kind of an observable element.
///
/// Derived from tag/role/input-type lookups first, then heuristics for
/// clickable containers. Absent (`None` on the record) for non-interactive
/// text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Button,
    Link,
    Input,
    Textarea,
    Dropdown,
    Checkbox,
    Radio,
    Label,
    Image,
    Header,
    Interactive,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Input => "input",
            Self::Textarea => "textarea",
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Label => "label",
            Self::Image => "image",
            Self::Header => "header",
            Self::Interactive => "interactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "button" => Some(Self::Button),
            "link" => Some(Self::Link),
            "input" => Some(Self::Input),
            "textarea" => Some(Self::Textarea),
            "dropdown" => Some(Self::Dropdown),
            "checkbox" => Some(Self::Checkbox),
            "radio" => Some(Self::Radio),
            "label" => Some(Self::Label),
            "image" => Some(Self::Image),
            "header" => Some(Self::Header),
            "interactive" => Some(Self::Interactive),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observable element from a page snapshot.
///
/// Ids are assigned `0..n-1` in discovery order (base-document elements
/// before popup elements) and are only meaningful relative to the snapshot
/// that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct PageElement {
    pub id: usize,
    /// Lowercase tag name.
    pub tag: String,
    /// Semantic kind; `None` for non-interactive text content.
    pub kind: Option<ElementKind>,
    /// Cleaned display text, truncated to 100 characters.
    pub text: String,
    /// Best-effort unique CSS selector.
    pub selector: String,
    /// Bounding box in page coordinates (post page-scroll offset).
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub disabled: bool,
    /// True when discovered inside an overlay/modal region.
    pub is_popup: bool,
    /// True when the element was inside the viewport at capture time.
    pub in_viewport: bool,
    /// Attribute echoes used for text matching.
    pub value: String,
    pub placeholder: String,
    pub aria_label: String,
    pub title: String,
    pub class_name: String,
    pub role: String,
    pub href: String,
}

impl PageElement {
    /// Does the element's kind or tag name equal the given name?
    pub fn kind_is(&self, name: &str) -> bool {
        self.kind.map(|k| k.as_str() == name).unwrap_or(false) || self.tag == name
    }
}

/// The indexed element list produced by one Snapshotter pass.
///
/// Invalidated by the next pass: only one snapshot is ever live.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub elements: Vec<PageElement>,
}

impl PageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Result of one executed action. Executor methods never raise outward;
/// every backend failure ends up in `message`.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Browser session configuration.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Long, navigation-scale timeout.
    pub navigation_timeout_ms: u64,
    /// Short bound for click/selector operations.
    pub action_timeout_ms: u64,
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 50_000,
            action_timeout_ms: 2_000,
            chrome_args: Vec::new(),
        }
    }
}

impl From<&skiff_config::BrowserConfig> for BrowserConfig {
    fn from(cfg: &skiff_config::BrowserConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            navigation_timeout_ms: cfg.navigation_timeout_ms,
            action_timeout_ms: cfg.action_timeout_ms,
            chrome_args: cfg.chrome_args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        for kind in [
            ElementKind::Button,
            ElementKind::Link,
            ElementKind::Input,
            ElementKind::Textarea,
            ElementKind::Dropdown,
            ElementKind::Checkbox,
            ElementKind::Radio,
            ElementKind::Label,
            ElementKind::Image,
            ElementKind::Header,
            ElementKind::Interactive,
        ] {
            assert_eq!(ElementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ElementKind::parse("marquee"), None);
    }

    #[test]
    fn kind_is_matches_kind_and_tag() {
        let el = PageElement {
            id: 0,
            tag: "a".to_string(),
            kind: Some(ElementKind::Link),
            text: "Home".to_string(),
            selector: "#home".to_string(),
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            center_x: 5.0,
            center_y: 5.0,
            disabled: false,
            is_popup: false,
            in_viewport: true,
            value: String::new(),
            placeholder: String::new(),
            aria_label: String::new(),
            title: String::new(),
            class_name: String::new(),
            role: String::new(),
            href: "/".to_string(),
        };
        assert!(el.kind_is("link"));
        assert!(el.kind_is("a"));
        assert!(!el.kind_is("button"));
    }
}
