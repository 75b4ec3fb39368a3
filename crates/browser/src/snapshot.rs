//! DOM snapshot extraction: one pass over the live page producing the
//! indexed element list the Resolver and Executor work against.
//!
//! The extraction runs entirely in page context and returns plain JSON;
//! element ids are assigned on the Rust side in discovery order so the
//! contiguity invariant (`0..n-1`, base elements before popup elements)
//! holds regardless of what the page does.

use tracing::debug;

use crate::{
    error::BrowserError,
    session::BrowserSession,
    types::{ElementKind, PageElement, PageSnapshot},
};

/// JavaScript to enumerate observable elements.
///
/// Emits, in order: interactive elements of the base document, salient
/// non-interactive text, then elements of up to two detected overlay
/// regions flagged `isPopup`.
const EXTRACT_PAGE_JS: &str = r#"
(() => {
    function isVisibleInViewport(el) {
        const rect = el.getBoundingClientRect();
        if (rect.width <= 0 || rect.height <= 0) return false;
        if (rect.bottom <= 0 || rect.top >= window.innerHeight ||
            rect.right <= 0 || rect.left >= window.innerWidth) return false;
        const style = window.getComputedStyle(el);
        return style.display !== 'none' &&
               style.visibility !== 'hidden' &&
               parseFloat(style.opacity) > 0.1;
    }

    function cleanText(text) {
        return text ? text.replace(/\s+/g, ' ').trim() : '';
    }

    function elementKind(el) {
        const tag = el.tagName.toLowerCase();
        const type = el.type ? el.type.toLowerCase() : '';
        const role = (el.getAttribute('role') || '').toLowerCase();

        if (tag === 'a') return 'link';
        if (tag === 'button') return 'button';
        if (tag === 'select') return 'dropdown';
        if (tag === 'textarea') return 'textarea';

        if (tag === 'input') {
            if (type === 'submit' || type === 'button' || type === 'reset') return 'button';
            if (type === 'checkbox') return 'checkbox';
            if (type === 'radio') return 'radio';
            return 'input';
        }

        if (role === 'button') return 'button';
        if (role === 'link') return 'link';
        if (role === 'checkbox') return 'checkbox';
        if (role === 'radio') return 'radio';
        if (role === 'textbox' || role === 'searchbox') return 'input';
        if (role === 'combobox' || role === 'listbox') return 'dropdown';

        const style = window.getComputedStyle(el);
        const hasClickHandler = el.onclick || el.getAttribute('onclick');
        const isPointer = style.cursor === 'pointer';

        if ((tag === 'div' || tag === 'span') && (hasClickHandler || isPointer)) {
            if (el.getAttribute('aria-haspopup') === 'true') return 'dropdown';
            return 'button';
        }

        if (tag === 'label') return 'label';
        if (tag === 'img' && (isPointer || hasClickHandler)) return 'image';
        if (['h1','h2','h3','h4','h5','h6'].includes(tag) && (isPointer || hasClickHandler)) {
            return 'header';
        }

        if (hasClickHandler || el.getAttribute('tabindex') === '0' || isPointer) {
            return 'interactive';
        }

        return null;
    }

    function generateSelector(el) {
        if (!el) return '';

        if (el.id && el.id.trim()) {
            const escapedId = CSS.escape(el.id);
            if (document.querySelectorAll('#' + escapedId).length === 1) {
                return '#' + escapedId;
            }
        }

        const uniqueAttrs = ['data-testid', 'data-cy', 'data-test', 'name'];
        for (const attr of uniqueAttrs) {
            const value = el.getAttribute(attr);
            if (value && value.trim()) {
                const selector = '[' + attr + '="' + CSS.escape(value) + '"]';
                if (document.querySelectorAll(selector).length === 1) {
                    return selector;
                }
            }
        }

        let selector = el.tagName.toLowerCase();
        if (el.tagName.toLowerCase() === 'input' && el.type) {
            selector += '[type="' + el.type + '"]';
        }

        if (el.classList && el.classList.length > 0) {
            const classes = Array.from(el.classList)
                .filter(cls => cls.length > 0 && !cls.match(/^(ng-|_|css-)/))
                .slice(0, 2);
            if (classes.length > 0) {
                selector += '.' + classes.map(cls => CSS.escape(cls)).join('.');
            }
        }

        if (document.querySelectorAll(selector).length > 1) {
            const parent = el.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(child =>
                    child.tagName === el.tagName &&
                    (el.className === child.className || (!el.className && !child.className))
                );
                if (siblings.length > 1) {
                    const index = siblings.indexOf(el) + 1;
                    selector += ':nth-child(' + index + ')';
                }
            }
        }

        if (document.querySelectorAll(selector).length > 1 && el.parentElement) {
            const parentTag = el.parentElement.tagName.toLowerCase();
            const parentClass = el.parentElement.classList.length > 0 ?
                '.' + CSS.escape(Array.from(el.parentElement.classList)[0]) : '';
            selector = parentTag + parentClass + ' > ' + selector;
        }

        return selector;
    }

    function findVisiblePopups() {
        const popups = [];
        const modalSelectors = [
            '[role="dialog"]', '[role="alertdialog"]', '[aria-modal="true"]',
            '.modal', '.dialog', '.popup', '.overlay', '.pop-up', '.popover',
            '.ant-modal', '.MuiDialog-root', '.ReactModal__Content', '.modal-dialog',
            '[class*="modal"]', '[class*="dialog"]', '[class*="popup"]'
        ];

        for (const selector of modalSelectors) {
            for (const el of document.querySelectorAll(selector)) {
                if (isVisibleInViewport(el) && !popups.includes(el)) {
                    popups.push(el);
                }
            }
        }

        // Fixed/absolute elements with high z-index are often modals.
        for (const el of document.querySelectorAll('div, section, aside')) {
            if (popups.includes(el) || !isVisibleInViewport(el)) continue;
            const style = window.getComputedStyle(el);
            const position = style.position;
            const zIndex = parseInt(style.zIndex) || 0;
            if ((position === 'fixed' || position === 'absolute') && zIndex > 10) {
                const rect = el.getBoundingClientRect();
                if (rect.width > 50 && rect.height > 50) {
                    popups.push(el);
                }
            }
        }

        // Centered elements near a visible backdrop.
        const backdrops = document.querySelectorAll(
            '.modal-backdrop, .backdrop, .dimmer, [class*="backdrop"], [class*="overlay"]');
        for (const backdrop of backdrops) {
            if (!isVisibleInViewport(backdrop)) continue;
            const viewportCenter = {
                x: window.innerWidth / 2,
                y: window.innerHeight / 2
            };
            for (const el of document.querySelectorAll('div, section, aside')) {
                if (popups.includes(el) || !isVisibleInViewport(el)) continue;
                const rect = el.getBoundingClientRect();
                const elementCenter = {
                    x: rect.left + rect.width / 2,
                    y: rect.top + rect.height / 2
                };
                const isCentered =
                    Math.abs(elementCenter.x - viewportCenter.x) < viewportCenter.x / 3 &&
                    Math.abs(elementCenter.y - viewportCenter.y) < viewportCenter.y / 3;
                if (isCentered && rect.width > 50 && rect.height > 50) {
                    popups.push(el);
                }
            }
        }

        return popups;
    }

    const interactiveSelectors =
        'a, button, input, select, textarea, [onclick], [role="button"], ' +
        '[role="link"], [tabindex="0"], label, img[onclick], div[onclick], span[onclick]';

    const elements = [];

    function pushInteractive(el, isPopup) {
        const kind = elementKind(el);
        if (!kind) return;

        let text = cleanText(el.textContent || el.value || el.placeholder ||
                             el.getAttribute('aria-label') || el.getAttribute('title') ||
                             el.alt || kind);
        if ((kind === 'input' || kind === 'textarea') && !text) {
            text = el.getAttribute('name') || el.getAttribute('placeholder') || kind;
        }
        if (text.length > 100) text = text.substring(0, 100) + '...';

        // A label identical to the classified kind carries no information.
        if (text === kind) return;
        if (isPopup && text.length === 0) return;

        const rect = el.getBoundingClientRect();
        elements.push({
            tag: el.tagName.toLowerCase(),
            kind: kind,
            text: text,
            selector: generateSelector(el),
            x: rect.left + window.pageXOffset,
            y: rect.top + window.pageYOffset,
            width: rect.width,
            height: rect.height,
            centerX: rect.left + rect.width / 2 + window.pageXOffset,
            centerY: rect.top + rect.height / 2 + window.pageYOffset,
            disabled: !!(el.disabled || el.hasAttribute('disabled')),
            isPopup: isPopup,
            inViewport: true,
            value: el.value || '',
            placeholder: el.placeholder || '',
            ariaLabel: el.getAttribute('aria-label') || '',
            title: el.getAttribute('title') || '',
            className: (typeof el.className === 'string') ? el.className : '',
            role: el.getAttribute('role') || '',
            href: el.href || ''
        });
    }

    // Pass 1: interactive elements of the base document.
    for (const el of document.querySelectorAll(interactiveSelectors)) {
        if (!isVisibleInViewport(el)) continue;
        pushInteractive(el, false);
    }

    // Pass 2: salient non-interactive text (own text only, not children's).
    for (const el of document.querySelectorAll('h1, h2, h3, h4, h5, h6, p, span, div, li, td, th')) {
        if (!isVisibleInViewport(el)) continue;

        let ownText = '';
        for (const child of el.childNodes) {
            if (child.nodeType === Node.TEXT_NODE) {
                ownText += child.textContent;
            }
        }
        ownText = cleanText(ownText);

        if (ownText && ownText.length > 1 && ownText.length < 200 &&
            !ownText.match(/^\s*[\d\W]*\s*$/)) {
            const rect = el.getBoundingClientRect();
            elements.push({
                tag: el.tagName.toLowerCase(),
                kind: null,
                text: ownText.substring(0, 100),
                selector: '',
                x: rect.left + window.pageXOffset,
                y: rect.top + window.pageYOffset,
                width: rect.width,
                height: rect.height,
                centerX: rect.left + rect.width / 2 + window.pageXOffset,
                centerY: rect.top + rect.height / 2 + window.pageYOffset,
                disabled: false,
                isPopup: false,
                inViewport: true,
                value: '',
                placeholder: '',
                ariaLabel: '',
                title: '',
                className: '',
                role: '',
                href: ''
            });
        }
    }

    // Pass 3: up to two overlay regions, appended after base elements.
    for (const popup of findVisiblePopups().slice(0, 2)) {
        for (const el of popup.querySelectorAll(interactiveSelectors)) {
            if (!isVisibleInViewport(el)) continue;
            pushInteractive(el, true);
        }
    }

    return { elements: elements };
})()
"#;

/// Capture a fresh snapshot, unconditionally replacing the cached one.
pub async fn capture(session: &BrowserSession) -> Result<PageSnapshot, BrowserError> {
    let url = session.current_url().await?;
    let title = session.title().await?;

    let value = session.evaluate(EXTRACT_PAGE_JS).await?;
    let elements = parse_elements(&value);

    debug!(url, elements = elements.len(), "captured page snapshot");

    let snapshot = PageSnapshot {
        url,
        title,
        elements,
    };
    session.store_snapshot(snapshot.clone()).await;
    Ok(snapshot)
}

/// Capture and render the page for the model.
///
/// Backend failures surface as an empty snapshot plus a diagnostic string;
/// they are never fatal to the caller.
pub async fn analyze(session: &BrowserSession) -> String {
    match capture(session).await {
        Ok(snapshot) => {
            let rendered = format_snapshot(&snapshot);
            if rendered.is_empty() {
                "Page analyzed: no visible elements found.".to_string()
            } else {
                rendered
            }
        },
        Err(e) => {
            session.store_snapshot(PageSnapshot::default()).await;
            format!("Error analyzing page: {e}")
        },
    }
}

/// Parse the extraction result, assigning ids `0..n-1` in discovery order.
pub(crate) fn parse_elements(result: &serde_json::Value) -> Vec<PageElement> {
    let Some(raw) = result["elements"].as_array() else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|e| {
            Some(PageElement {
                id: 0, // assigned below
                tag: e["tag"].as_str()?.to_string(),
                kind: e["kind"].as_str().and_then(ElementKind::parse),
                text: e["text"].as_str().unwrap_or_default().to_string(),
                selector: e["selector"].as_str().unwrap_or_default().to_string(),
                x: e["x"].as_f64().unwrap_or(0.0),
                y: e["y"].as_f64().unwrap_or(0.0),
                width: e["width"].as_f64().unwrap_or(0.0),
                height: e["height"].as_f64().unwrap_or(0.0),
                center_x: e["centerX"].as_f64().unwrap_or(0.0),
                center_y: e["centerY"].as_f64().unwrap_or(0.0),
                disabled: e["disabled"].as_bool().unwrap_or(false),
                is_popup: e["isPopup"].as_bool().unwrap_or(false),
                in_viewport: e["inViewport"].as_bool().unwrap_or(false),
                value: e["value"].as_str().unwrap_or_default().to_string(),
                placeholder: e["placeholder"].as_str().unwrap_or_default().to_string(),
                aria_label: e["ariaLabel"].as_str().unwrap_or_default().to_string(),
                title: e["title"].as_str().unwrap_or_default().to_string(),
                class_name: e["className"].as_str().unwrap_or_default().to_string(),
                role: e["role"].as_str().unwrap_or_default().to_string(),
                href: e["href"].as_str().unwrap_or_default().to_string(),
            })
        })
        .enumerate()
        .map(|(i, mut el)| {
            el.id = i;
            el
        })
        .collect()
}

/// Render a snapshot as the compact text listing handed to the model.
///
/// Interactive elements get `[id][kind][selector]text` lines; bare text is
/// grouped onto shared lines when short; popup elements are bracketed by
/// marker lines.
pub fn format_snapshot(snapshot: &PageSnapshot) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_popup = false;

    for el in &snapshot.elements {
        if el.is_popup && !in_popup {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
            result.push("--- Modal/Popup Detected ---".to_string());
            in_popup = true;
        }

        let (item, tagged) = match el.kind {
            Some(kind) => (
                format!("[{}][{}][{}]{}", el.id, kind, el.selector, el.text),
                true,
            ),
            None => (el.text.clone(), false),
        };

        if tagged || current.is_empty() {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
            current = item;
        } else if item.len() < 30 && current.len() + item.len() + 1 < 80 {
            current.push(' ');
            current.push_str(&item);
        } else {
            result.push(std::mem::take(&mut current));
            current = item;
        }
    }

    if !current.is_empty() {
        result.push(current);
    }
    if in_popup {
        result.push("--- End of Popup ---".to_string());
    }

    result.join("\n").trim().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw_element(kind: Option<&str>, text: &str, is_popup: bool) -> serde_json::Value {
        serde_json::json!({
            "tag": "button",
            "kind": kind,
            "text": text,
            "selector": "#el",
            "x": 10.0, "y": 20.0, "width": 100.0, "height": 40.0,
            "centerX": 60.0, "centerY": 40.0,
            "disabled": false,
            "isPopup": is_popup,
            "inViewport": true,
            "value": "", "placeholder": "", "ariaLabel": "", "title": "",
            "className": "", "role": "", "href": ""
        })
    }

    #[test]
    fn parse_empty_result() {
        let elements = parse_elements(&serde_json::json!({ "elements": [] }));
        assert!(elements.is_empty());
        let elements = parse_elements(&serde_json::json!({}));
        assert!(elements.is_empty());
    }

    #[test]
    fn parse_assigns_contiguous_ids() {
        let result = serde_json::json!({ "elements": [
            raw_element(Some("button"), "Submit", false),
            raw_element(Some("link"), "Home", false),
            raw_element(None, "Welcome back", false),
            raw_element(Some("button"), "Accept cookies", true),
        ]});
        let elements = parse_elements(&result);
        assert_eq!(elements.len(), 4);
        let ids: Vec<usize> = elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn parse_keeps_base_before_popup() {
        let result = serde_json::json!({ "elements": [
            raw_element(Some("button"), "Submit", false),
            raw_element(Some("button"), "Close", true),
            raw_element(Some("button"), "Confirm", true),
        ]});
        let elements = parse_elements(&result);
        let first_popup = elements.iter().position(|e| e.is_popup).unwrap();
        assert!(elements[..first_popup].iter().all(|e| !e.is_popup));
        assert!(elements[first_popup..].iter().all(|e| e.is_popup));
    }

    #[test]
    fn parse_maps_kind_and_geometry() {
        let result = serde_json::json!({ "elements": [
            raw_element(Some("dropdown"), "Country", false),
        ]});
        let elements = parse_elements(&result);
        assert_eq!(elements[0].kind, Some(ElementKind::Dropdown));
        assert_eq!(elements[0].center_x, 60.0);
        assert_eq!(elements[0].center_y, 40.0);
    }

    #[test]
    fn format_renders_tagged_lines_and_popup_markers() {
        let result = serde_json::json!({ "elements": [
            raw_element(Some("button"), "Submit", false),
            raw_element(None, "Fine print", false),
            raw_element(Some("button"), "Close", true),
        ]});
        let snapshot = PageSnapshot {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            elements: parse_elements(&result),
        };
        let rendered = format_snapshot(&snapshot);
        assert!(rendered.contains("[0][button][#el]Submit"));
        assert!(rendered.contains("Fine print"));
        assert!(rendered.contains("--- Modal/Popup Detected ---"));
        assert!(rendered.contains("--- End of Popup ---"));
        assert!(rendered.contains("[2][button][#el]Close"));
    }

    #[test]
    fn format_groups_short_text_lines() {
        let result = serde_json::json!({ "elements": [
            raw_element(None, "Alpha", false),
            raw_element(None, "Beta", false),
        ]});
        let snapshot = PageSnapshot {
            url: String::new(),
            title: String::new(),
            elements: parse_elements(&result),
        };
        assert_eq!(format_snapshot(&snapshot), "Alpha Beta");
    }

    #[test]
    fn format_empty_snapshot() {
        assert_eq!(format_snapshot(&PageSnapshot::default()), "");
    }
}
