//! Keyboard shortcuts and special keys (not for typing text).

use {
    chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType},
    tracing::debug,
};

use crate::{error::BrowserError, session::BrowserSession};

// CDP modifier bitmask.
const MOD_ALT: i64 = 1;
const MOD_CTRL: i64 = 2;
const MOD_META: i64 = 4;
const MOD_SHIFT: i64 = 8;

/// A parsed key press: optional modifiers plus one key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KeyChord {
    pub modifiers: i64,
    pub key: String,
    pub code: String,
    pub virtual_key_code: i64,
    /// Text emitted by the key, when it produces any (Enter, Space).
    pub text: Option<String>,
}

/// Simulate keyboard shortcuts and special keys.
///
/// Accepts single keys ("enter", "escape", "f5"), combinations
/// ("ctrl+a", "shift+tab"), and comma/semicolon-separated sequences
/// ("tab, enter"). Returns a status message; never fails outward.
pub async fn keyboard_action(session: &BrowserSession, input: &str) -> String {
    let input = input.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    if input.is_empty() {
        return "Error: no key specified.".to_string();
    }

    let steps = split_sequence(input);
    let mut results: Vec<String> = Vec::new();

    for step in &steps {
        let Some(chord) = parse_key_spec(step) else {
            return format!(
                "Error: '{step}' is not a valid special key or combination. \
                 Use the type tool for typing text."
            );
        };

        if let Err(e) = press_chord(session, &chord).await {
            return format!("Error with keyboard action: {e}");
        }
        results.push(format!("Pressed {step}"));

        if steps.len() > 1 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    if results.len() == 1 {
        results.remove(0)
    } else {
        format!("Executed key sequence: {}", results.join(" → "))
    }
}

/// Split a comma/semicolon-separated key sequence.
pub(crate) fn split_sequence(input: &str) -> Vec<String> {
    input
        .split([',', ';'])
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a single key spec ("enter", "ctrl+a") into a chord.
///
/// Returns `None` for anything that is not a recognized special key or a
/// modifier combination — plain text belongs to the typing path.
pub(crate) fn parse_key_spec(input: &str) -> Option<KeyChord> {
    let spec = input.trim().to_lowercase();
    let parts: Vec<&str> = spec.split('+').map(str::trim).collect();

    let mut modifiers = 0i64;
    let (mods, key_part) = parts.split_at(parts.len() - 1);
    for m in mods {
        modifiers |= match *m {
            "ctrl" | "control" => MOD_CTRL,
            "shift" => MOD_SHIFT,
            "alt" => MOD_ALT,
            "cmd" | "meta" => MOD_META,
            _ => return None,
        };
    }

    let key_name = key_part[0];
    if let Some(mut chord) = special_key(key_name) {
        chord.modifiers = modifiers;
        // Modified keys do not insert text.
        if modifiers != 0 {
            chord.text = None;
        }
        return Some(chord);
    }

    // Single letters/digits are only valid inside a combination.
    if modifiers != 0 && key_name.chars().count() == 1 {
        let c = key_name.chars().next()?;
        if c.is_ascii_alphanumeric() {
            let upper = c.to_ascii_uppercase();
            let code = if c.is_ascii_digit() {
                format!("Digit{c}")
            } else {
                format!("Key{upper}")
            };
            return Some(KeyChord {
                modifiers,
                key: c.to_string(),
                code,
                virtual_key_code: upper as i64,
                text: None,
            });
        }
    }

    None
}

fn special_key(name: &str) -> Option<KeyChord> {
    let (key, code, vk, text): (&str, &str, i64, Option<&str>) = match name {
        "enter" => ("Enter", "Enter", 13, Some("\r")),
        "tab" => ("Tab", "Tab", 9, None),
        "backspace" => ("Backspace", "Backspace", 8, None),
        "escape" | "esc" => ("Escape", "Escape", 27, None),
        "delete" | "del" => ("Delete", "Delete", 46, None),
        "space" => (" ", "Space", 32, Some(" ")),
        "up" => ("ArrowUp", "ArrowUp", 38, None),
        "down" => ("ArrowDown", "ArrowDown", 40, None),
        "left" => ("ArrowLeft", "ArrowLeft", 37, None),
        "right" => ("ArrowRight", "ArrowRight", 39, None),
        "home" => ("Home", "Home", 36, None),
        "end" => ("End", "End", 35, None),
        "pageup" => ("PageUp", "PageUp", 33, None),
        "pagedown" => ("PageDown", "PageDown", 34, None),
        "f1" => ("F1", "F1", 112, None),
        "f2" => ("F2", "F2", 113, None),
        "f3" => ("F3", "F3", 114, None),
        "f4" => ("F4", "F4", 115, None),
        "f5" => ("F5", "F5", 116, None),
        "f6" => ("F6", "F6", 117, None),
        "f7" => ("F7", "F7", 118, None),
        "f8" => ("F8", "F8", 119, None),
        "f9" => ("F9", "F9", 120, None),
        "f10" => ("F10", "F10", 121, None),
        "f11" => ("F11", "F11", 122, None),
        "f12" => ("F12", "F12", 123, None),
        _ => return None,
    };
    Some(KeyChord {
        modifiers: 0,
        key: key.to_string(),
        code: code.to_string(),
        virtual_key_code: vk,
        text: text.map(String::from),
    })
}

async fn press_chord(session: &BrowserSession, chord: &KeyChord) -> Result<(), BrowserError> {
    debug!(key = %chord.key, modifiers = chord.modifiers, "pressing key");
    let page = session.page();

    let key_down = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::RawKeyDown)
        .modifiers(chord.modifiers)
        .key(chord.key.clone())
        .code(chord.code.clone())
        .windows_virtual_key_code(chord.virtual_key_code)
        .build()
        .map_err(|e| BrowserError::Cdp(e.to_string()))?;
    page.execute(key_down)
        .await
        .map_err(|e| BrowserError::Cdp(e.to_string()))?;

    if let Some(ref text) = chord.text {
        let char_event = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .modifiers(chord.modifiers)
            .text(text.clone())
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        page.execute(char_event)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
    }

    let key_up = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyUp)
        .modifiers(chord.modifiers)
        .key(chord.key.clone())
        .code(chord.code.clone())
        .windows_virtual_key_code(chord.virtual_key_code)
        .build()
        .map_err(|e| BrowserError::Cdp(e.to_string()))?;
    page.execute(key_up)
        .await
        .map_err(|e| BrowserError::Cdp(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_special_keys() {
        let enter = parse_key_spec("enter").unwrap();
        assert_eq!(enter.virtual_key_code, 13);
        assert_eq!(enter.text.as_deref(), Some("\r"));
        assert_eq!(enter.modifiers, 0);

        let esc = parse_key_spec("Esc").unwrap();
        assert_eq!(esc.key, "Escape");

        assert_eq!(parse_key_spec("f5").unwrap().virtual_key_code, 116);
    }

    #[test]
    fn parses_modifier_combinations() {
        let chord = parse_key_spec("ctrl+a").unwrap();
        assert_eq!(chord.modifiers, MOD_CTRL);
        assert_eq!(chord.key, "a");
        assert_eq!(chord.code, "KeyA");
        assert_eq!(chord.virtual_key_code, 'A' as i64);

        let chord = parse_key_spec("shift+tab").unwrap();
        assert_eq!(chord.modifiers, MOD_SHIFT);
        assert_eq!(chord.key, "Tab");

        let chord = parse_key_spec("cmd+v").unwrap();
        assert_eq!(chord.modifiers, MOD_META);
    }

    #[test]
    fn modified_keys_emit_no_text() {
        let chord = parse_key_spec("ctrl+enter").unwrap();
        assert_eq!(chord.modifiers, MOD_CTRL);
        assert!(chord.text.is_none());
    }

    #[test]
    fn rejects_plain_text() {
        assert!(parse_key_spec("hello").is_none());
        assert!(parse_key_spec("a").is_none());
        assert!(parse_key_spec("bogus+a").is_none());
    }

    #[test]
    fn splits_sequences() {
        assert_eq!(split_sequence("tab, enter"), vec!["tab", "enter"]);
        assert_eq!(split_sequence("tab; enter ;"), vec!["tab", "enter"]);
        assert_eq!(split_sequence("enter"), vec!["enter"]);
    }
}
