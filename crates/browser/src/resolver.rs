//! Target resolution against the latest snapshot.
//!
//! Ids are cheap and precise right after a snapshot, but go stale the
//! moment the page scrolls or mutates; attribute search is the recovery
//! path for staleness or caller imprecision, and the single
//! scroll-and-rescan tier compensates for targets outside the viewport.

use {thiserror::Error, tracing::debug};

use crate::{
    error::BrowserError,
    scroll, session::BrowserSession, snapshot,
    types::{PageElement, PageSnapshot},
};

/// Normalized target specification.
///
/// Callers supply loosely-structured input — a JSON record with optional
/// `id`/`type`/`text` fields, a bare quoted number, or free text — which is
/// parsed into this variant once, at the resolver boundary. A numeric id
/// keeps any accompanying attribute constraints for the fallthrough search
/// when the id turns out stale or out of range.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    ByIndex {
        index: usize,
        kind: Option<String>,
        text: Option<String>,
    },
    ByAttributes {
        kind: Option<String>,
        text: Option<String>,
    },
    FreeText(String),
}

impl Target {
    /// Normalize a loosely-typed tool argument into a `Target`.
    pub fn parse(input: &serde_json::Value) -> Result<Self, BrowserError> {
        match input {
            serde_json::Value::Object(map) => Self::from_fields(
                map.get("id"),
                map.get("type"),
                map.get("text"),
            ),
            serde_json::Value::String(s) => Self::parse_str(s),
            serde_json::Value::Number(n) => {
                let index = n.as_u64().ok_or_else(|| {
                    BrowserError::InvalidAction(format!("invalid element id: {n}"))
                })? as usize;
                Ok(Self::ByIndex {
                    index,
                    kind: None,
                    text: None,
                })
            },
            other => Err(BrowserError::InvalidAction(format!(
                "target must be an object or string, got: {other}"
            ))),
        }
    }

    /// Normalize a string-form target: embedded JSON, a quoted element id,
    /// or natural-language free text.
    pub fn parse_str(input: &str) -> Result<Self, BrowserError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BrowserError::InvalidAction(
                "empty target description".to_string(),
            ));
        }

        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return Self::parse(&value);
            }
            // Models sometimes emit single-quoted pseudo-JSON.
            let requoted = trimmed.replace('\'', "\"");
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&requoted) {
                return Self::parse(&value);
            }
        }

        let unquoted = trimmed.trim_matches(|c| c == '\'' || c == '"');
        if let Ok(index) = unquoted.parse::<usize>() {
            return Ok(Self::ByIndex {
                index,
                kind: None,
                text: None,
            });
        }

        Ok(Self::FreeText(trimmed.to_string()))
    }

    fn from_fields(
        id: Option<&serde_json::Value>,
        kind: Option<&serde_json::Value>,
        text: Option<&serde_json::Value>,
    ) -> Result<Self, BrowserError> {
        let kind = kind.and_then(value_as_string);
        let text = text.and_then(value_as_string);

        let index = id.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
            serde_json::Value::String(s) => s.trim().parse::<usize>().ok(),
            _ => None,
        });

        if let Some(index) = index {
            return Ok(Self::ByIndex { index, kind, text });
        }
        if kind.is_none() && text.is_none() {
            return Err(BrowserError::InvalidAction(
                "at least one of 'id', 'type', or 'text' must be provided".to_string(),
            ));
        }
        Ok(Self::ByAttributes { kind, text })
    }

    /// Attribute constraints carried by this target.
    fn attrs(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::ByIndex { kind, text, .. } | Self::ByAttributes { kind, text } => {
                (kind.as_deref(), text.as_deref())
            },
            Self::FreeText(s) => (None, Some(s.as_str())),
        }
    }

    /// Human-readable criteria for not-found diagnostics.
    pub fn criteria(&self) -> String {
        match self {
            Self::ByIndex { index, kind, text } => {
                let mut parts = vec![format!("id={index}")];
                if let Some(k) = kind {
                    parts.push(format!("type={k}"));
                }
                if let Some(t) = text {
                    parts.push(format!("text={t}"));
                }
                parts.join(", ")
            },
            Self::ByAttributes { kind, text } => {
                let mut parts = Vec::new();
                if let Some(k) = kind {
                    parts.push(format!("type={k}"));
                }
                if let Some(t) = text {
                    parts.push(format!("text={t}"));
                }
                parts.join(", ")
            },
            Self::FreeText(s) => format!("'{s}'"),
        }
    }
}

fn value_as_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolution failure, with the attempted criteria for diagnostics.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No elements matching {criteria} found, even after scrolling.")]
    NotFound { criteria: String },
}

impl ResolveError {
    pub fn criteria(&self) -> &str {
        match self {
            Self::NotFound { criteria } => criteria,
        }
    }
}

/// Synonym families applied during attribute search. The rescan tier uses
/// a superset of the base rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SynonymScope {
    Base,
    Extended,
}

/// Resolve a target against the session's latest snapshot.
///
/// Tier 1: an in-range numeric id is authoritative and skips all other
/// filters. Tier 2: attribute search over the current snapshot. Tier 3:
/// scroll one page down, force a fresh snapshot, and search once more with
/// extended synonym rules — exactly one rescan cycle.
pub async fn resolve(
    session: &BrowserSession,
    target: &Target,
) -> Result<PageElement, ResolveError> {
    let snapshot = session.cached_snapshot().await;

    if let Some(el) = lookup_by_index(&snapshot.elements, target) {
        return Ok(el.clone());
    }
    if let Target::ByIndex { index, .. } = target {
        debug!(
            index,
            elements = snapshot.elements.len(),
            "element id out of range, falling back to attribute search"
        );
    }

    let (kind, text) = target.attrs();

    if let Some(el) = find_match(&snapshot.elements, kind, text, SynonymScope::Base, true) {
        return Ok(el.clone());
    }

    debug!(criteria = %target.criteria(), "no match in current snapshot, scrolling and rescanning");
    let _ = scroll::scroll(session, "down").await;
    let rescanned = match snapshot::capture(session).await {
        Ok(s) => s,
        Err(_) => PageSnapshot::default(),
    };

    if let Some(el) = find_match(&rescanned.elements, kind, text, SynonymScope::Extended, false) {
        return Ok(el.clone());
    }

    Err(ResolveError::NotFound {
        criteria: target.criteria(),
    })
}

/// Tier 1: an in-range numeric id is authoritative and ignores any
/// type/text constraints carried in the same request.
pub(crate) fn lookup_by_index<'a>(
    elements: &'a [PageElement],
    target: &Target,
) -> Option<&'a PageElement> {
    match target {
        Target::ByIndex { index, .. } => elements.get(*index),
        _ => None,
    }
}

/// Attribute search: filter by type (through the synonym table) and text,
/// optionally preferring matches flagged in-viewport.
pub(crate) fn find_match<'a>(
    elements: &'a [PageElement],
    kind: Option<&str>,
    text: Option<&str>,
    scope: SynonymScope,
    prefer_in_viewport: bool,
) -> Option<&'a PageElement> {
    let matches: Vec<&PageElement> = elements
        .iter()
        .filter(|el| {
            kind.map(|k| kind_matches(k, el, scope)).unwrap_or(true)
                && text.map(|t| text_matches(t, el, scope)).unwrap_or(true)
        })
        .collect();

    if prefer_in_viewport {
        if let Some(visible) = matches.iter().find(|el| el.in_viewport).copied() {
            return Some(visible);
        }
    }
    matches.first().copied()
}

fn kind_matches(target: &str, el: &PageElement, scope: SynonymScope) -> bool {
    let target = target.to_lowercase();
    let elem_kind = el.kind.map(|k| k.as_str()).unwrap_or("");

    if target == elem_kind || target == el.tag {
        return true;
    }

    match target.as_str() {
        "button" => {
            el.tag == "button"
                || elem_kind == "button"
                || el.role == "button"
                || el.class_name.to_lowercase().contains("btn")
        },
        "dropdown" => el.tag == "select" || elem_kind == "dropdown" || el.role == "listbox",
        "input" if scope == SynonymScope::Extended => {
            el.tag == "input" || elem_kind == "input" || el.role == "textbox"
        },
        "link" if scope == SynonymScope::Extended => {
            el.tag == "a" || elem_kind == "link" || el.role == "link"
        },
        _ => false,
    }
}

fn text_matches(target: &str, el: &PageElement, scope: SynonymScope) -> bool {
    let target = target.to_lowercase();

    if el.text.to_lowercase().contains(&target) {
        return true;
    }

    let attr_fields = [&el.value, &el.placeholder, &el.aria_label, &el.title];
    if attr_fields
        .iter()
        .any(|f| !f.is_empty() && f.to_lowercase() == target)
    {
        return true;
    }

    // Extended search accepts partial matches inside attribute fields.
    scope == SynonymScope::Extended
        && attr_fields
            .iter()
            .any(|f| !f.is_empty() && f.to_lowercase().contains(&target))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn element(
        id: usize,
        tag: &str,
        kind: Option<ElementKind>,
        text: &str,
    ) -> PageElement {
        PageElement {
            id,
            tag: tag.to_string(),
            kind,
            text: text.to_string(),
            selector: format!("#el-{id}"),
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 20.0,
            center_x: 25.0,
            center_y: 10.0,
            disabled: false,
            is_popup: false,
            in_viewport: true,
            value: String::new(),
            placeholder: String::new(),
            aria_label: String::new(),
            title: String::new(),
            class_name: String::new(),
            role: String::new(),
            href: String::new(),
        }
    }

    fn sample() -> Vec<PageElement> {
        vec![
            element(0, "button", Some(ElementKind::Button), "Submit"),
            element(1, "a", Some(ElementKind::Link), "Submit order"),
        ]
    }

    // ── Target::parse ────────────────────────────────────────────────

    #[test]
    fn parse_structured_with_id() {
        let target = Target::parse(&serde_json::json!({
            "id": "5", "type": "button", "text": "Submit"
        }))
        .unwrap();
        assert_eq!(target, Target::ByIndex {
            index: 5,
            kind: Some("button".to_string()),
            text: Some("Submit".to_string()),
        });
    }

    #[test]
    fn parse_structured_without_id() {
        let target = Target::parse(&serde_json::json!({ "type": "link", "text": "Home" })).unwrap();
        assert_eq!(target, Target::ByAttributes {
            kind: Some("link".to_string()),
            text: Some("Home".to_string()),
        });
    }

    #[test]
    fn parse_non_numeric_id_falls_to_attributes() {
        let target =
            Target::parse(&serde_json::json!({ "id": "first", "text": "Home" })).unwrap();
        assert_eq!(target, Target::ByAttributes {
            kind: None,
            text: Some("Home".to_string()),
        });
    }

    #[test]
    fn parse_bare_number_string() {
        assert_eq!(Target::parse_str("5").unwrap(), Target::ByIndex {
            index: 5,
            kind: None,
            text: None,
        });
        assert_eq!(Target::parse_str("\"7\"").unwrap(), Target::ByIndex {
            index: 7,
            kind: None,
            text: None,
        });
    }

    #[test]
    fn parse_embedded_json_string() {
        let target = Target::parse_str(r#"{"id": "2", "type": "button"}"#).unwrap();
        assert_eq!(target, Target::ByIndex {
            index: 2,
            kind: Some("button".to_string()),
            text: None,
        });
    }

    #[test]
    fn parse_single_quoted_pseudo_json() {
        let target = Target::parse_str("{'type': 'button', 'text': 'Save'}").unwrap();
        assert_eq!(target, Target::ByAttributes {
            kind: Some("button".to_string()),
            text: Some("Save".to_string()),
        });
    }

    #[test]
    fn parse_free_text() {
        let target = Target::parse_str("Sign in button").unwrap();
        assert_eq!(target, Target::FreeText("Sign in button".to_string()));
    }

    #[test]
    fn parse_empty_object_errors() {
        assert!(Target::parse(&serde_json::json!({})).is_err());
        assert!(Target::parse_str("   ").is_err());
    }

    // ── Matching ─────────────────────────────────────────────────────

    #[test]
    fn valid_id_short_circuits_other_filters() {
        let elements = sample();
        // Type/text point at the link, but the id wins unconditionally.
        let target = Target::ByIndex {
            index: 0,
            kind: Some("link".to_string()),
            text: Some("Submit order".to_string()),
        };
        let found = lookup_by_index(&elements, &target).unwrap();
        assert_eq!(found.id, 0);
    }

    #[test]
    fn out_of_range_id_falls_through_to_attribute_search() {
        let elements = sample();
        let target = Target::ByIndex {
            index: 99,
            kind: Some("button".to_string()),
            text: Some("Submit".to_string()),
        };
        assert!(lookup_by_index(&elements, &target).is_none());
        // The carried attributes still resolve the element.
        let (kind, text) = (Some("button"), Some("Submit"));
        let found = find_match(&elements, kind, text, SynonymScope::Base, true).unwrap();
        assert_eq!(found.id, 0);
    }

    #[test]
    fn exact_type_and_substring_text_prefers_button() {
        let elements = sample();
        let found = find_match(
            &elements,
            Some("button"),
            Some("Submit"),
            SynonymScope::Base,
            true,
        )
        .unwrap();
        assert_eq!(found.id, 0);
    }

    #[test]
    fn case_insensitive_substring_matches_link() {
        let elements = sample();
        let found = find_match(
            &elements,
            None,
            Some("submit order"),
            SynonymScope::Base,
            true,
        )
        .unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn btn_class_counts_as_button() {
        let mut el = element(0, "div", Some(ElementKind::Interactive), "Save");
        el.class_name = "primary-btn wide".to_string();
        let elements = vec![el];
        assert!(
            find_match(&elements, Some("button"), None, SynonymScope::Base, true).is_some()
        );
    }

    #[test]
    fn input_family_only_in_extended_scope() {
        let mut el = element(0, "input", Some(ElementKind::Input), "Email");
        el.placeholder = "Email address".to_string();
        let elements = vec![el];
        // "textbox"-role synonym is part of the extended input family.
        let mut role_el = element(0, "div", Some(ElementKind::Interactive), "Email");
        role_el.role = "textbox".to_string();
        let role_elements = vec![role_el];
        assert!(
            find_match(&role_elements, Some("input"), None, SynonymScope::Base, true).is_none()
        );
        assert!(
            find_match(
                &role_elements,
                Some("input"),
                None,
                SynonymScope::Extended,
                true
            )
            .is_some()
        );
        // A literal input tag matches in both scopes.
        assert!(find_match(&elements, Some("input"), None, SynonymScope::Base, true).is_some());
    }

    #[test]
    fn exact_attribute_match_in_base_scope() {
        let mut el = element(0, "input", Some(ElementKind::Input), "");
        el.placeholder = "Search".to_string();
        let elements = vec![el];
        assert!(find_match(&elements, None, Some("search"), SynonymScope::Base, true).is_some());
        // Partial attribute matches need the extended scope.
        assert!(find_match(&elements, None, Some("sear"), SynonymScope::Base, true).is_none());
        assert!(
            find_match(&elements, None, Some("sear"), SynonymScope::Extended, true).is_some()
        );
    }

    #[test]
    fn prefers_in_viewport_match() {
        let mut offscreen = element(0, "button", Some(ElementKind::Button), "Save");
        offscreen.in_viewport = false;
        let onscreen = element(1, "button", Some(ElementKind::Button), "Save");
        let elements = vec![offscreen, onscreen];
        let found =
            find_match(&elements, Some("button"), Some("Save"), SynonymScope::Base, true).unwrap();
        assert_eq!(found.id, 1);
        // Without the preference, snapshot order wins.
        let found =
            find_match(&elements, Some("button"), Some("Save"), SynonymScope::Base, false)
                .unwrap();
        assert_eq!(found.id, 0);
    }

    #[test]
    fn unconstrained_search_takes_first_element() {
        let elements = sample();
        let found = find_match(&elements, None, None, SynonymScope::Base, true).unwrap();
        assert_eq!(found.id, 0);
    }

    #[test]
    fn criteria_rendering() {
        let target = Target::ByIndex {
            index: 5,
            kind: Some("button".to_string()),
            text: None,
        };
        assert_eq!(target.criteria(), "id=5, type=button");
        assert_eq!(
            Target::FreeText("Sign in".to_string()).criteria(),
            "'Sign in'"
        );
    }
}
