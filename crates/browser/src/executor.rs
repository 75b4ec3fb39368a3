//! Action execution against resolved elements.
//!
//! Every action runs a strategy cascade: an ordered list of alternative
//! techniques tried in sequence until one succeeds. Executor functions
//! never raise outward; all backend failures are caught per strategy and
//! aggregated into the final failure message.

use std::time::Duration;

use tracing::debug;

use crate::{
    error::BrowserError,
    session::{BrowserSession, SelectBy, json_str},
    types::{ActionOutcome, PageElement},
};

/// An action request against a resolved element.
#[derive(Debug, Clone)]
pub enum Action {
    Click,
    Type { value: String },
    Select { value: String },
}

/// Execute an action on a resolved element.
pub async fn execute(
    session: &BrowserSession,
    element: &PageElement,
    action: &Action,
) -> ActionOutcome {
    match action {
        Action::Click => click(session, element).await,
        Action::Type { value } => type_text(session, value).await,
        Action::Select { value } => select_option(session, element, value).await,
    }
}

// ── Click ───────────────────────────────────────────────────────────────

/// Click an element, trying strategies in order and stopping at the first
/// success.
pub async fn click(session: &BrowserSession, element: &PageElement) -> ActionOutcome {
    let mut errors: Vec<String> = Vec::new();

    // Strategy 1: physical click at the recorded center. The cursor overlay
    // move is visual feedback only.
    update_cursor(session, element.center_x, element.center_y).await;
    match coordinate_click(session, element.center_x, element.center_y).await {
        Ok(()) => {
            debug!(id = element.id, "clicked via coordinates");
            return click_success(element);
        },
        Err(e) => errors.push(format!("Coordinate click failed: {e}")),
    }

    // Strategy 2: the backend's native selector click, bounded by the short
    // action timeout.
    if !element.selector.is_empty() {
        match session.click_selector(&element.selector).await {
            Ok(()) => {
                debug!(id = element.id, "clicked via CSS selector");
                return click_success(element);
            },
            Err(e) => errors.push(format!("CSS selector click failed: {e}")),
        }
    }

    // Strategy 3: script-context click on the selector-resolved element.
    if !element.selector.is_empty() {
        match js_click(session, &element.selector).await {
            Ok(()) => {
                debug!(id = element.id, "clicked via JavaScript");
                return click_success(element);
            },
            Err(e) => errors.push(format!("JavaScript click failed: {e}")),
        }
    }

    // Strategy 4: full-document text search, bypassing the cached selector.
    // Recovers from selectors gone stale since the snapshot.
    match text_search_click(session, element).await {
        Ok(()) => {
            debug!(id = element.id, "clicked via text search");
            return click_success(element);
        },
        Err(e) => errors.push(format!("JavaScript text search click failed: {e}")),
    }

    // Strategy 5: synthetic click event dispatch.
    if !element.selector.is_empty() {
        match dispatch_click_event(session, &element.selector).await {
            Ok(()) => {
                debug!(id = element.id, "clicked via dispatched event");
                return click_success(element);
            },
            Err(e) => errors.push(format!("Event dispatch click failed: {e}")),
        }
    }

    aggregate_click_failure(&errors)
}

fn click_success(element: &PageElement) -> ActionOutcome {
    ActionOutcome::ok(format!(
        "Clicked on element: {} with text '{}'",
        element.kind.map(|k| k.as_str()).unwrap_or(element.tag.as_str()),
        element.text
    ))
}

/// Build the all-strategies-exhausted failure, one entry per attempt.
fn aggregate_click_failure(errors: &[String]) -> ActionOutcome {
    ActionOutcome::fail(format!(
        "Failed to click element after trying multiple methods. Errors: {}",
        errors.join("; ")
    ))
}

async fn coordinate_click(session: &BrowserSession, x: f64, y: f64) -> Result<(), BrowserError> {
    // Recorded centers are page coordinates; CDP wants viewport coordinates.
    let (scroll_x, scroll_y) = session.scroll_offsets().await.unwrap_or((0.0, 0.0));
    session.click_at(x - scroll_x, y - scroll_y).await
}

async fn js_click(session: &BrowserSession, selector: &str) -> Result<(), BrowserError> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({});
            if (!el) return false;
            el.click();
            return true;
        }})()"#,
        json_str(selector)
    );
    let clicked = session.evaluate(&js).await?.as_bool().unwrap_or(false);
    if !clicked {
        return Err(BrowserError::ElementNotFound(format!(
            "no element for selector {selector}"
        )));
    }
    Ok(())
}

async fn text_search_click(
    session: &BrowserSession,
    element: &PageElement,
) -> Result<(), BrowserError> {
    let kind = element.kind.map(|k| k.as_str()).unwrap_or("");
    let js = format!(
        r#"((targetText, targetKind) => {{
            if (!targetText) return false;
            const elements = Array.from(document.querySelectorAll('*'));
            const target = elements.find(el => {{
                const text = (el.innerText || el.textContent || '').trim();
                const tag = el.tagName.toLowerCase();
                return text.includes(targetText) &&
                       (targetKind === '' || tag === targetKind || el.type === targetKind);
            }});
            if (target) {{
                target.click();
                return true;
            }}
            return false;
        }})({}, {})"#,
        json_str(&element.text),
        json_str(kind)
    );
    let clicked = session.evaluate(&js).await?.as_bool().unwrap_or(false);
    if !clicked {
        return Err(BrowserError::ElementNotFound(
            "no element with matching text".to_string(),
        ));
    }
    Ok(())
}

async fn dispatch_click_event(
    session: &BrowserSession,
    selector: &str,
) -> Result<(), BrowserError> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({});
            if (!el) return false;
            const event = new MouseEvent('click', {{
                view: window,
                bubbles: true,
                cancelable: true
            }});
            el.dispatchEvent(event);
            return true;
        }})()"#,
        json_str(selector)
    );
    let dispatched = session.evaluate(&js).await?.as_bool().unwrap_or(false);
    if !dispatched {
        return Err(BrowserError::ElementNotFound(format!(
            "no element for selector {selector}"
        )));
    }
    Ok(())
}

/// Move the visual cursor overlay. Purely cosmetic; failures are ignored.
async fn update_cursor(session: &BrowserSession, x: f64, y: f64) {
    let js = format!(
        r#"(() => {{
            let cursor = document.getElementById('skiff-cursor');
            if (!cursor) {{
                cursor = document.createElement('div');
                cursor.id = 'skiff-cursor';
                cursor.style.cssText =
                    'position:absolute;width:12px;height:12px;border-radius:50%;' +
                    'background:rgba(255,64,64,0.75);border:2px solid #fff;' +
                    'pointer-events:none;z-index:2147483647;' +
                    'transition:left 0.1s ease,top 0.1s ease;';
                document.body.appendChild(cursor);
            }}
            cursor.style.left = ({x} - 6) + 'px';
            cursor.style.top = ({y} - 6) + 'px';
        }})()"#
    );
    let _ = session.run_js(&js).await;
}

// ── Type ────────────────────────────────────────────────────────────────

const CLEAR_FOCUSED_JS: &str = r#"
(() => {
    const active = document.activeElement;
    if (!active) return false;
    if (active.tagName === 'INPUT' || active.tagName === 'TEXTAREA') {
        active.value = '';
        active.focus();
        return true;
    }
    if (active.contentEditable === 'true') {
        active.textContent = '';
        active.focus();
        return true;
    }
    return false;
})()
"#;

/// Type into the currently focused element, clearing its value first.
///
/// Callers are responsible for the click-before-type discipline: when no
/// input-capable element is focused the clear step silently no-ops and the
/// keystrokes go to whatever has focus.
pub async fn type_text(session: &BrowserSession, value: &str) -> ActionOutcome {
    if value.is_empty() {
        return ActionOutcome::fail("Error: 'value' parameter is required.");
    }

    match session.evaluate(CLEAR_FOCUSED_JS).await {
        Ok(cleared) if cleared.as_bool() == Some(true) => {
            debug!("cleared focused field");
        },
        Ok(_) => {
            debug!("no input-capable element focused, typing proceeds anyway");
        },
        Err(e) => {
            debug!(error = %e, "clear step failed, typing proceeds anyway");
        },
    }

    if let Err(e) = session.type_chars(value).await {
        return ActionOutcome::fail(format!("Error typing: {e}"));
    }
    ActionOutcome::ok(format!(
        "Cleared field and typed '{value}' into currently focused element"
    ))
}

// ── Select ──────────────────────────────────────────────────────────────

/// Select an option on a dropdown element.
///
/// Native `<select>` controls try label text, then the value attribute,
/// then (for numeric input) positional index. Custom dropdowns are clicked
/// open, then the newly-rendered document is searched for an option node.
pub async fn select_option(
    session: &BrowserSession,
    element: &PageElement,
    value: &str,
) -> ActionOutcome {
    if element.kind_is("dropdown") || element.tag == "select" {
        select_native(session, element, value).await
    } else {
        select_custom(session, element, value).await
    }
}

async fn select_native(
    session: &BrowserSession,
    element: &PageElement,
    value: &str,
) -> ActionOutcome {
    if element.selector.is_empty() {
        return ActionOutcome::fail(format!(
            "Could not determine a valid selector for dropdown: {} with text '{}'",
            element.kind.map(|k| k.as_str()).unwrap_or(element.tag.as_str()),
            element.text
        ));
    }

    let by_label = session
        .select_native(&element.selector, SelectBy::Label(value))
        .await;
    if by_label.is_ok() {
        return ActionOutcome::ok(format!(
            "Selected option '{value}' from dropdown: {} by visible text",
            element.text
        ));
    }

    let by_value = session
        .select_native(&element.selector, SelectBy::Value(value))
        .await;
    if by_value.is_ok() {
        return ActionOutcome::ok(format!(
            "Selected option with value '{value}' from dropdown: {}",
            element.text
        ));
    }

    if let Ok(index) = value.parse::<usize>() {
        if session
            .select_native(&element.selector, SelectBy::Index(index))
            .await
            .is_ok()
        {
            return ActionOutcome::ok(format!(
                "Selected option at index {value} from dropdown: {}",
                element.text
            ));
        }
    }

    ActionOutcome::fail(format!(
        "Failed to select option '{value}' from dropdown: {}, {}",
        by_label.err().map(|e| e.to_string()).unwrap_or_default(),
        by_value.err().map(|e| e.to_string()).unwrap_or_default(),
    ))
}

async fn select_custom(
    session: &BrowserSession,
    element: &PageElement,
    value: &str,
) -> ActionOutcome {
    // Open the dropdown first.
    update_cursor(session, element.center_x, element.center_y).await;
    if let Err(e) = coordinate_click(session, element.center_x, element.center_y).await {
        return ActionOutcome::fail(format!("Error selecting option from dropdown: {e}"));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let js = format!(
        r#"((optionText) => {{
            const options = Array.from(document.querySelectorAll(
                'li, div[role="option"], option, .dropdown-item'));
            let found = options.find(el =>
                el.innerText.trim() === optionText ||
                el.textContent.trim() === optionText ||
                el.getAttribute('value') === optionText);
            if (!found) {{
                found = options.find(el =>
                    el.innerText.trim().includes(optionText) ||
                    el.textContent.trim().includes(optionText));
            }}
            if (found) {{
                const rect = found.getBoundingClientRect();
                return {{
                    x: rect.left + rect.width / 2 + window.pageXOffset,
                    y: rect.top + rect.height / 2 + window.pageYOffset,
                    text: found.innerText.trim() || found.textContent.trim()
                }};
            }}
            return null;
        }})({})"#,
        json_str(value)
    );

    let option = match session.evaluate(&js).await {
        Ok(v) => v,
        Err(e) => {
            return ActionOutcome::fail(format!("Error selecting option from dropdown: {e}"));
        },
    };

    if option.is_null() {
        return ActionOutcome::fail(format!(
            "Could not find option '{value}' in the opened dropdown: {}",
            element.text
        ));
    }

    let x = option["x"].as_f64().unwrap_or(0.0);
    let y = option["y"].as_f64().unwrap_or(0.0);
    let text = option["text"].as_str().unwrap_or(value).to_string();

    update_cursor(session, x, y).await;
    match coordinate_click(session, x, y).await {
        Ok(()) => ActionOutcome::ok(format!(
            "Clicked on option '{text}' in dropdown: {}",
            element.text
        )),
        Err(e) => ActionOutcome::fail(format!("Error selecting option from dropdown: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn element(kind: Option<ElementKind>, tag: &str, text: &str) -> PageElement {
        PageElement {
            id: 0,
            tag: tag.to_string(),
            kind,
            text: text.to_string(),
            selector: "#el".to_string(),
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
            href: String::new(),
        }
    }

    #[test]
    fn success_message_names_kind_and_text() {
        let outcome = click_success(&element(Some(ElementKind::Button), "button", "Submit"));
        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "Clicked on element: button with text 'Submit'"
        );
    }

    #[test]
    fn success_message_falls_back_to_tag() {
        let outcome = click_success(&element(None, "div", "Card"));
        assert!(outcome.message.contains("div"));
    }

    #[test]
    fn aggregated_failure_lists_every_attempted_strategy() {
        let errors = vec![
            "Coordinate click failed: boom".to_string(),
            "CSS selector click failed: boom".to_string(),
            "JavaScript click failed: boom".to_string(),
            "JavaScript text search click failed: boom".to_string(),
            "Event dispatch click failed: boom".to_string(),
        ];
        let outcome = aggregate_click_failure(&errors);
        assert!(!outcome.success);
        for label in [
            "Coordinate click failed",
            "CSS selector click failed",
            "JavaScript click failed",
            "JavaScript text search click failed",
            "Event dispatch click failed",
        ] {
            assert!(outcome.message.contains(label), "missing: {label}");
        }
        assert_eq!(outcome.message.matches("failed:").count(), 5);
    }
}
