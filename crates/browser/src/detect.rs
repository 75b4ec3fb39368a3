//! Browser detection and install guidance.

use std::path::PathBuf;

/// Known Chromium-based browser executable names to search for.
/// All of these support CDP (Chrome DevTools Protocol).
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chrome",
    "chrome-browser",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "msedge",
    "microsoft-edge",
    "microsoft-edge-stable",
    "brave",
    "brave-browser",
];

/// macOS app bundle paths for Chromium-based browsers.
#[cfg(target_os = "macos")]
const MACOS_APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

/// Windows installation paths for Chromium-based browsers.
#[cfg(target_os = "windows")]
const WINDOWS_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Detect a Chromium-based browser on the system.
///
/// Checks (in order):
/// 1. Custom path from config (if provided)
/// 2. `CHROME` environment variable
/// 3. Platform-specific installation paths
/// 4. Known executable names in PATH
pub fn detect_browser(custom_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(path) = std::env::var("CHROME") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    #[cfg(target_os = "macos")]
    for path in MACOS_APP_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    #[cfg(target_os = "windows")]
    for path in WINDOWS_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    for name in CHROMIUM_EXECUTABLES {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

/// Platform-specific install instructions, used in launch failure messages.
pub fn install_instructions() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "Install Chrome with: brew install --cask google-chrome"
    }
    #[cfg(target_os = "linux")]
    {
        "Install Chromium with your package manager, e.g.: apt install chromium-browser"
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        "Install Google Chrome from https://www.google.com/chrome/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_path_must_exist() {
        // A path that does not exist is never returned.
        let result = detect_browser(Some("/definitely/not/a/browser"));
        if let Some(p) = result {
            assert_ne!(p, PathBuf::from("/definitely/not/a/browser"));
        }
    }

    #[test]
    fn install_instructions_nonempty() {
        assert!(!install_instructions().is_empty());
    }
}
