//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::SkiffConfig};

const CONFIG_FILENAME: &str = "skiff.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> Result<SkiffConfig, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors from loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./skiff.toml` (project-local)
/// 2. `~/.config/skiff/skiff.toml` (user-global)
///
/// Returns `SkiffConfig::default()` if no config file is found.
pub fn discover_and_load() -> SkiffConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SkiffConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/skiff/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skiff").map(|d| d.config_dir().to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let raw = r#"
            [llm]
            provider = "anthropic"

            [agent]
            max_iterations = 12
        "#;
        let config: SkiffConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.agent.max_iterations, 12);
        // Untouched sections keep defaults.
        assert_eq!(config.browser.viewport_height, 720);
    }

    #[test]
    fn parses_browser_overrides() {
        let raw = r#"
            [browser]
            headless = true
            chrome_path = "/usr/bin/chromium"
            chrome_args = ["--lang=en-US"]
        "#;
        let config: SkiffConfig = toml::from_str(raw).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.chrome_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.browser.chrome_args, vec!["--lang=en-US"]);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/skiff.toml")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
