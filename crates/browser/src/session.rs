//! A single managed Chrome/Chromium session over CDP.
//!
//! The session owns the CDP page handle and the cached element snapshot,
//! replacing the process-wide "current page" / "current elements" state of
//! ancestral designs. All snapshot access is serialized behind one async
//! lock: Resolver and Executor always operate on whatever the latest
//! snapshot is, and ids never outlive the pass that produced them.

use std::time::Duration;

use {
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::{
            emulation::SetDeviceMetricsOverrideParams,
            input::{
                DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
                DispatchMouseEventType, MouseButton,
            },
        },
    },
    futures::StreamExt,
    tokio::sync::Mutex,
    tokio::time::timeout,
    tracing::{debug, info, warn},
};

use crate::{
    detect,
    error::BrowserError,
    types::{BrowserConfig, PageSnapshot},
};

/// How to pick an option on a native `<select>` element.
#[derive(Debug, Clone, Copy)]
pub enum SelectBy<'a> {
    /// Match the option's visible label text.
    Label(&'a str),
    /// Match the option's underlying `value` attribute.
    Value(&'a str),
    /// Positional index.
    Index(usize),
}

/// Persistent browser session: one browser, one page, one live snapshot.
pub struct BrowserSession {
    _browser: Browser,
    page: Page,
    config: BrowserConfig,
    snapshot: Mutex<PageSnapshot>,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page.
    pub async fn launch(config: BrowserConfig) -> Result<Self, BrowserError> {
        let chrome_path = detect::detect_browser(config.chrome_path.as_deref())
            .ok_or(BrowserError::BrowserNotAvailable)?;

        let mut builder = CdpBrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .chrome_executable(&chrome_path)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms));

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "browser launch failed: {e}\n\n{}",
                detect::install_instructions()
            ))
        })?;

        // Drain CDP events for the lifetime of the session.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
            debug!("browser event handler exited");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Browser-level viewport may not always be applied to new pages.
        let viewport_cmd = SetDeviceMetricsOverrideParams::builder()
            .width(config.viewport_width)
            .height(config.viewport_height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        if let Err(e) = page.execute(viewport_cmd).await {
            warn!(error = %e, "failed to set page viewport");
        }

        info!(
            chrome = %chrome_path.display(),
            headless = config.headless,
            viewport_width = config.viewport_width,
            viewport_height = config.viewport_height,
            "browser session ready"
        );

        Ok(Self {
            _browser: browser,
            page,
            config,
            snapshot: Mutex::new(PageSnapshot::default()),
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub(crate) fn page(&self) -> &Page {
        &self.page
    }

    // ── Snapshot slot ───────────────────────────────────────────────────

    /// Clone of the latest snapshot.
    pub async fn cached_snapshot(&self) -> PageSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Unconditionally replace the cached snapshot.
    pub(crate) async fn store_snapshot(&self, snapshot: PageSnapshot) {
        *self.snapshot.lock().await = snapshot;
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Navigate to a URL after cleanup and validation.
    ///
    /// Returns the URL actually reached.
    pub async fn navigate(&self, url: &str) -> Result<String, BrowserError> {
        let url = clean_url(url);
        validate_url(&url)?;

        debug!(url, "navigating");
        let nav = timeout(
            Duration::from_millis(self.config.navigation_timeout_ms),
            self.page.goto(url.as_str()),
        )
        .await
        .map_err(|_| {
            BrowserError::Timeout(format!(
                "navigation to {url} timed out after {}ms",
                self.config.navigation_timeout_ms
            ))
        })?;
        nav.map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        let _ = self.page.wait_for_navigation().await;

        let current = self.current_url().await?;
        info!(requested = url, current, "navigated to URL");
        Ok(current)
    }

    /// Navigate back in history, verifying that the URL actually changed.
    pub async fn go_back(&self) -> Result<String, BrowserError> {
        let can_go_back: bool = self
            .evaluate("window.history.length > 1")
            .await?
            .as_bool()
            .unwrap_or(false);
        if !can_go_back {
            return Err(BrowserError::NavigationFailed(
                "no previous page in history".to_string(),
            ));
        }

        let before = self.current_url().await?;
        self.run_js("history.back()").await?;
        let _ = self.page.wait_for_navigation().await;

        let mut after = self.current_url().await?;
        if after == before {
            // Some pages swallow the first attempt.
            self.run_js("window.history.back()").await?;
            let _ = self.page.wait_for_navigation().await;
            after = self.current_url().await?;
        }

        if after == before {
            return Err(BrowserError::NavigationFailed(
                "back navigation attempted but URL remains unchanged".to_string(),
            ));
        }
        Ok(after)
    }

    /// Current page URL.
    pub async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?
            .unwrap_or_default())
    }

    /// Current page title.
    pub async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?
            .unwrap_or_default())
    }

    // ── Script evaluation ───────────────────────────────────────────────

    /// Evaluate a JS expression and return its JSON value.
    pub async fn evaluate(&self, js: &str) -> Result<serde_json::Value, BrowserError> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::JsEvalFailed(format!("failed to get result: {e:?}")))
    }

    /// Run JS for its side effect, ignoring the result value.
    pub async fn run_js(&self, js: &str) -> Result<(), BrowserError> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        Ok(())
    }

    // ── Pointer and keyboard primitives ─────────────────────────────────

    /// Dispatch a physical click at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), BrowserError> {
        let press = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MousePressed)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .execute(press)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        let release = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseReleased)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .execute(release)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        debug!(x, y, "dispatched click");
        Ok(())
    }

    /// Click an element through the backend's native selector primitive,
    /// bounded by the configured action timeout.
    pub async fn click_selector(&self, selector: &str) -> Result<(), BrowserError> {
        let bound = Duration::from_millis(self.config.action_timeout_ms);
        let attempt = async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|e| BrowserError::ElementNotFound(e.to_string()))?;
            element
                .click()
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            Ok::<(), BrowserError>(())
        };
        timeout(bound, attempt).await.map_err(|_| {
            BrowserError::Timeout(format!(
                "selector click timed out after {}ms",
                self.config.action_timeout_ms
            ))
        })?
    }

    /// Emit keystroke input for the given text into the focused element.
    pub async fn type_chars(&self, text: &str) -> Result<(), BrowserError> {
        for c in text.chars() {
            let key_down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .text(c.to_string())
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(key_down)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;

            let key_up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .text(c.to_string())
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(key_up)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        }
        debug!(chars = text.chars().count(), "typed text");
        Ok(())
    }

    /// Current page scroll offsets `(x, y)`.
    pub async fn scroll_offsets(&self) -> Result<(f64, f64), BrowserError> {
        let value = self
            .evaluate("(() => ({ x: window.scrollX, y: window.scrollY }))()")
            .await?;
        Ok((
            value["x"].as_f64().unwrap_or(0.0),
            value["y"].as_f64().unwrap_or(0.0),
        ))
    }

    /// Pick an option on a native `<select>` element.
    pub async fn select_native(
        &self,
        selector: &str,
        by: SelectBy<'_>,
    ) -> Result<(), BrowserError> {
        let sel_json = json_str(selector);
        let js = match by {
            SelectBy::Label(label) => {
                let label_json = json_str(label);
                format!(
                    r#"(() => {{
                        const el = document.querySelector({sel_json});
                        if (!el || el.tagName !== 'SELECT') return false;
                        const idx = Array.from(el.options)
                            .findIndex(o => o.text.trim() === {label_json});
                        if (idx < 0) return false;
                        el.selectedIndex = idx;
                        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }})()"#
                )
            },
            SelectBy::Value(value) => {
                let value_json = json_str(value);
                format!(
                    r#"(() => {{
                        const el = document.querySelector({sel_json});
                        if (!el || el.tagName !== 'SELECT') return false;
                        const idx = Array.from(el.options)
                            .findIndex(o => o.value === {value_json});
                        if (idx < 0) return false;
                        el.selectedIndex = idx;
                        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }})()"#
                )
            },
            SelectBy::Index(index) => format!(
                r#"(() => {{
                    const el = document.querySelector({sel_json});
                    if (!el || el.tagName !== 'SELECT') return false;
                    if ({index} >= el.options.length) return false;
                    el.selectedIndex = {index};
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()"#
            ),
        };

        let matched = self.evaluate(&js).await?.as_bool().unwrap_or(false);
        if !matched {
            return Err(BrowserError::ElementNotFound(format!(
                "no option matched {by:?} on {selector}"
            )));
        }
        Ok(())
    }
}

/// JSON-encode a string for safe embedding in a JS source snippet.
pub(crate) fn json_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Clean up a model-supplied URL: strip backticks, collapse duplicated
/// protocol prefixes, default to https.
pub(crate) fn clean_url(url: &str) -> String {
    let mut url = url.replace('`', "").trim().to_string();

    // "https://https://example.com" style duplication: keep the last prefix.
    if url.matches("http").count() > 1 {
        let last = url.rfind("https://").max(url.rfind("http://"));
        if let Some(idx) = last {
            url = url[idx..].to_string();
        }
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{url}");
    }
    url
}

/// Validate a URL before attempting navigation: parseable, http/https,
/// and free of obvious model garbage.
pub(crate) fn validate_url(url: &str) -> Result<(), BrowserError> {
    if url.is_empty() {
        return Err(BrowserError::InvalidAction("URL cannot be empty".to_string()));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::InvalidAction(format!("invalid URL '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {},
        scheme => {
            return Err(BrowserError::InvalidAction(format!(
                "unsupported URL scheme '{scheme}', only http/https allowed"
            )));
        },
    }

    // Obviously malformed URLs from hallucinated tool arguments.
    let suspicious_patterns = ["}}}", "]}", "}<", "assistant to=", "functions."];
    for pattern in suspicious_patterns {
        if url.contains(pattern) {
            warn!(url, pattern, "rejecting URL with suspicious pattern");
            return Err(BrowserError::InvalidAction(format!(
                "URL contains invalid characters: '{url}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_url_adds_protocol() {
        assert_eq!(clean_url("example.com"), "https://example.com");
        assert_eq!(clean_url("http://example.com"), "http://example.com");
    }

    #[test]
    fn clean_url_strips_backticks() {
        assert_eq!(clean_url("`https://example.com`"), "https://example.com");
    }

    #[test]
    fn clean_url_collapses_duplicate_protocols() {
        assert_eq!(
            clean_url("https://https://example.com"),
            "https://example.com"
        );
    }

    #[test]
    fn validate_url_accepts_http_https() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://localhost:8080/path").is_ok());
    }

    #[test]
    fn validate_url_rejects_bad_schemes() {
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn validate_url_rejects_model_garbage() {
        assert!(validate_url("https://example.com/path>assistant to=functions.browser").is_err());
        assert!(validate_url("https://example.com/a}}}b").is_err());
    }

    #[test]
    fn json_str_escapes_quotes() {
        assert_eq!(json_str("a\"b"), "\"a\\\"b\"");
    }
}
