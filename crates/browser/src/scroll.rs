//! Viewport scrolling with boundary detection.

use tracing::debug;

use crate::{error::BrowserError, session::BrowserSession};

/// Boundary tolerance in pixels, absorbing fractional scroll positions.
const EDGE_TOLERANCE: f64 = 10.0;

const SCROLL_INFO_JS: &str = r#"
(() => {
    const documentHeight = Math.max(
        document.body.scrollHeight,
        document.body.offsetHeight,
        document.documentElement.clientHeight,
        document.documentElement.scrollHeight,
        document.documentElement.offsetHeight
    );
    return {
        currentY: window.pageYOffset || document.documentElement.scrollTop,
        maxY: documentHeight - window.innerHeight,
        viewportHeight: window.innerHeight
    };
})()
"#;

/// Scroll the page in the given direction, returning a status message.
///
/// Directions: "down", "up", "top", "bottom". Anything else defaults to
/// down with a note. Never fails outward; backend errors fall back to a
/// best-effort basic scroll, and their messages are surfaced as text.
pub async fn scroll(session: &BrowserSession, direction: &str) -> String {
    let direction = direction.trim().trim_matches(|c| c == '\'' || c == '"').to_lowercase();

    match scroll_checked(session, &direction).await {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, direction, "position-aware scroll failed, using fallback");
            match scroll_fallback(session, &direction).await {
                Ok(message) => message,
                Err(fallback_err) => {
                    format!("Error scrolling: {e} - fallback also failed: {fallback_err}")
                },
            }
        },
    }
}

async fn scroll_checked(session: &BrowserSession, direction: &str) -> Result<String, BrowserError> {
    let info = session.evaluate(SCROLL_INFO_JS).await?;
    let current_y = info["currentY"].as_f64().unwrap_or(0.0);
    let max_y = info["maxY"].as_f64().unwrap_or(0.0);
    let viewport_height = info["viewportHeight"].as_f64().unwrap_or(0.0);

    match direction {
        "down" => {
            let Some(amount) = scroll_amount_down(current_y, max_y, viewport_height) else {
                return Ok("Already at the bottom of the page - cannot scroll down further"
                    .to_string());
            };
            session.run_js(&format!("window.scrollBy(0, {amount})")).await?;

            let new_y = session
                .evaluate("window.pageYOffset || document.documentElement.scrollTop")
                .await?
                .as_f64()
                .unwrap_or(0.0);
            if new_y >= max_y - EDGE_TOLERANCE {
                Ok("Scrolled down and reached the bottom of the page".to_string())
            } else {
                Ok(format!("Scrolled down {amount:.0}px - showing new content"))
            }
        },
        "up" => {
            let Some(amount) = scroll_amount_up(current_y, viewport_height) else {
                return Ok("Already at the top of the page - cannot scroll up further".to_string());
            };
            session.run_js(&format!("window.scrollBy(0, -{amount})")).await?;

            let new_y = session
                .evaluate("window.pageYOffset || document.documentElement.scrollTop")
                .await?
                .as_f64()
                .unwrap_or(0.0);
            if new_y <= EDGE_TOLERANCE {
                Ok("Scrolled up and reached the top of the page".to_string())
            } else {
                Ok(format!("Scrolled up {amount:.0}px - showing previous content"))
            }
        },
        "top" => {
            if current_y <= EDGE_TOLERANCE {
                return Ok("Already at the top of the page".to_string());
            }
            session.run_js("window.scrollTo(0, 0)").await?;
            Ok("Scrolled to top of the page".to_string())
        },
        "bottom" => {
            if current_y >= max_y - EDGE_TOLERANCE {
                return Ok("Already at the bottom of the page".to_string());
            }
            session
                .run_js("window.scrollTo(0, document.body.scrollHeight)")
                .await?;
            Ok("Scrolled to bottom of the page".to_string())
        },
        other => {
            if current_y >= max_y - EDGE_TOLERANCE {
                return Ok(format!(
                    "Invalid direction '{other}' - already at bottom, cannot scroll down"
                ));
            }
            let amount = scroll_amount_down(current_y, max_y, viewport_height).unwrap_or(0.0);
            session.run_js(&format!("window.scrollBy(0, {amount})")).await?;
            Ok(format!(
                "Invalid direction '{other}', defaulted to scrolling down {amount:.0}px"
            ))
        },
    }
}

async fn scroll_fallback(session: &BrowserSession, direction: &str) -> Result<String, BrowserError> {
    match direction {
        "top" => {
            session.run_js("window.scrollTo(0, 0)").await?;
            Ok("Scrolled to top (fallback method)".to_string())
        },
        "bottom" => {
            session
                .run_js("window.scrollTo(0, document.body.scrollHeight)")
                .await?;
            Ok("Scrolled to bottom (fallback method)".to_string())
        },
        "up" => {
            session.run_js("window.scrollBy(0, -window.innerHeight)").await?;
            Ok("Scrolled up one viewport (fallback method)".to_string())
        },
        other => {
            session.run_js("window.scrollBy(0, window.innerHeight)").await?;
            Ok(format!(
                "Scrolled down one viewport (fallback method) for direction: {other}"
            ))
        },
    }
}

/// Downward scroll amount clamped to the remaining range, or `None` when
/// already at the bottom.
pub(crate) fn scroll_amount_down(current_y: f64, max_y: f64, viewport_height: f64) -> Option<f64> {
    if current_y >= max_y - EDGE_TOLERANCE {
        return None;
    }
    Some(viewport_height.min(max_y - current_y))
}

/// Upward scroll amount clamped to the distance from the top, or `None`
/// when already at the top.
pub(crate) fn scroll_amount_up(current_y: f64, viewport_height: f64) -> Option<f64> {
    if current_y <= EDGE_TOLERANCE {
        return None;
    }
    Some(viewport_height.min(current_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_clamps_to_remaining_range() {
        assert_eq!(scroll_amount_down(0.0, 2000.0, 720.0), Some(720.0));
        assert_eq!(scroll_amount_down(1800.0, 2000.0, 720.0), Some(200.0));
    }

    #[test]
    fn down_at_bottom_is_none() {
        assert_eq!(scroll_amount_down(1995.0, 2000.0, 720.0), None);
        assert_eq!(scroll_amount_down(2000.0, 2000.0, 720.0), None);
    }

    #[test]
    fn up_clamps_to_top() {
        assert_eq!(scroll_amount_up(300.0, 720.0), Some(300.0));
        assert_eq!(scroll_amount_up(1500.0, 720.0), Some(720.0));
    }

    #[test]
    fn up_at_top_is_none() {
        assert_eq!(scroll_amount_up(0.0, 720.0), None);
        assert_eq!(scroll_amount_up(5.0, 720.0), None);
    }
}
