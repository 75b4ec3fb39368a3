//! Configuration schema.

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
    tracing::warn,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkiffConfig {
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub agent: AgentConfig,
}

/// Which inference provider to use, plus per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Selected provider: "openai", "groq", or "anthropic".
    pub provider: String,
    pub openai: ProviderSettings,
    pub groq: ProviderSettings,
    pub anthropic: ProviderSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            openai: ProviderSettings {
                model: "gpt-4o".to_string(),
                temperature: 0.0,
                max_tokens: 2048,
                api_key: None,
                base_url: None,
            },
            groq: ProviderSettings {
                model: "openai/gpt-oss-120b".to_string(),
                temperature: 0.0,
                max_tokens: 2048,
                api_key: None,
                base_url: None,
            },
            anthropic: ProviderSettings {
                model: "claude-sonnet-4-20250514".to_string(),
                temperature: 0.0,
                max_tokens: 8192,
                api_key: None,
                base_url: None,
            },
        }
    }
}

/// Settings for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// API key; usually injected via `${..._API_KEY}` substitution.
    pub api_key: Option<String>,
    /// Override the provider's default API base URL.
    pub base_url: Option<String>,
}

/// Provider identity, used to pick the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Groq,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Self::OpenAi),
            "groq" => Some(Self::Groq),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// A provider selection with its API key resolved.
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Secret<String>,
    pub base_url: Option<String>,
}

/// Errors from provider resolution.
#[derive(Debug, thiserror::Error)]
pub enum ProviderResolveError {
    #[error("unknown provider '{0}', expected one of: openai, groq, anthropic")]
    UnknownProvider(String),

    #[error(
        "no API key found for any provider; set at least one of \
         OPENAI_API_KEY, GROQ_API_KEY, ANTHROPIC_API_KEY"
    )]
    NoApiKey,
}

impl LlmConfig {
    fn settings_for(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Groq => &self.groq,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    fn key_for(&self, kind: ProviderKind) -> Option<String> {
        self.settings_for(kind)
            .api_key
            .clone()
            .filter(|k| !k.is_empty() && !k.starts_with("${"))
            .or_else(|| std::env::var(kind.key_env_var()).ok().filter(|k| !k.is_empty()))
    }

    /// Resolve the configured provider to a usable selection.
    ///
    /// When the selected provider has no API key, falls back to the first
    /// provider that does (a warning is logged). Errors only when no
    /// provider has a key at all.
    pub fn resolve(&self) -> Result<ResolvedProvider, ProviderResolveError> {
        let selected = ProviderKind::from_name(&self.provider)
            .ok_or_else(|| ProviderResolveError::UnknownProvider(self.provider.clone()))?;

        let kind = if self.key_for(selected).is_some() {
            selected
        } else {
            let fallback = [ProviderKind::OpenAi, ProviderKind::Groq, ProviderKind::Anthropic]
                .into_iter()
                .find(|k| self.key_for(*k).is_some())
                .ok_or(ProviderResolveError::NoApiKey)?;
            warn!(
                selected = selected.as_str(),
                fallback = fallback.as_str(),
                "no API key for selected provider, switching"
            );
            fallback
        };

        let settings = self.settings_for(kind);
        let api_key = self.key_for(kind).ok_or(ProviderResolveError::NoApiKey)?;

        Ok(ResolvedProvider {
            kind,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            api_key: Secret::new(api_key),
            base_url: settings.base_url.clone(),
        })
    }
}

/// Browser launch and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Default viewport width.
    pub viewport_width: u32,
    /// Default viewport height.
    pub viewport_height: u32,
    /// Navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Bounded timeout for click/selector operations, in milliseconds.
    pub action_timeout_ms: u64,
    /// Additional Chrome arguments.
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
            chrome_args: vec![
                "--start-maximized".to_string(),
                "--disable-notifications".to_string(),
                "--disable-extensions".to_string(),
            ],
        }
    }
}

/// Conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Iteration ceiling for one loop invocation.
    pub max_iterations: usize,
    /// Recent exchanges to prepend to the system prompt from memory.
    pub memory_context_messages: usize,
    /// Bounded retention for session memory.
    pub memory_max_exchanges: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            memory_context_messages: 5,
            memory_max_exchanges: 100,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SkiffConfig::default();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.agent.max_iterations, 50);
        assert_eq!(config.browser.viewport_width, 1280);
        assert!(!config.browser.headless);
    }

    #[test]
    fn resolve_unknown_provider_errors() {
        let llm = LlmConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            llm.resolve(),
            Err(ProviderResolveError::UnknownProvider(_))
        ));
    }

    #[test]
    fn resolve_prefers_configured_key() {
        let llm = LlmConfig {
            provider: "openai".to_string(),
            openai: ProviderSettings {
                model: "gpt-4o".to_string(),
                api_key: Some("sk-configured".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = llm.resolve().unwrap();
        assert_eq!(resolved.kind, ProviderKind::OpenAi);
        assert_eq!(resolved.model, "gpt-4o");
    }

    #[test]
    fn resolve_falls_back_to_provider_with_key() {
        let llm = LlmConfig {
            provider: "groq".to_string(),
            anthropic: ProviderSettings {
                model: "claude-sonnet-4-20250514".to_string(),
                api_key: Some("sk-ant".to_string()),
                ..Default::default()
            },
            // groq/openai have no keys in this test config
            groq: ProviderSettings::default(),
            openai: ProviderSettings::default(),
            ..Default::default()
        };
        // Only meaningful when the env vars are absent; skip otherwise.
        if std::env::var("GROQ_API_KEY").is_ok() || std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let resolved = llm.resolve().unwrap();
        assert_eq!(resolved.kind, ProviderKind::Anthropic);
    }

    #[test]
    fn unresolved_placeholder_does_not_count_as_key() {
        let llm = LlmConfig {
            provider: "openai".to_string(),
            openai: ProviderSettings {
                api_key: Some("${OPENAI_API_KEY}".to_string()),
                ..Default::default()
            },
            groq: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            ..Default::default()
        };
        if std::env::var("OPENAI_API_KEY").is_ok()
            || std::env::var("GROQ_API_KEY").is_ok()
            || std::env::var("ANTHROPIC_API_KEY").is_ok()
        {
            return;
        }
        assert!(matches!(llm.resolve(), Err(ProviderResolveError::NoApiKey)));
    }
}
