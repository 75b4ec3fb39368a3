//! LLM provider implementations and construction from config.

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use tracing::info;

use skiff_config::{ProviderKind, ResolvedProvider};

use crate::model::LlmProvider;

pub use {
    anthropic::AnthropicProvider,
    openai::OpenAiCompatProvider,
};

/// Build the provider selected (and key-resolved) by configuration.
pub fn build_provider(resolved: ResolvedProvider) -> Arc<dyn LlmProvider> {
    info!(
        provider = resolved.kind.as_str(),
        model = %resolved.model,
        "initializing LLM provider"
    );

    match resolved.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(
            "openai",
            resolved.api_key,
            resolved.model,
            resolved
                .base_url
                .unwrap_or_else(|| openai::OPENAI_BASE_URL.to_string()),
            resolved.temperature,
            resolved.max_tokens,
        )),
        ProviderKind::Groq => Arc::new(OpenAiCompatProvider::new(
            "groq",
            resolved.api_key,
            resolved.model,
            resolved
                .base_url
                .unwrap_or_else(|| openai::GROQ_BASE_URL.to_string()),
            resolved.temperature,
            resolved.max_tokens,
        )),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            resolved.api_key,
            resolved.model,
            resolved
                .base_url
                .unwrap_or_else(|| anthropic::ANTHROPIC_BASE_URL.to_string()),
            resolved.temperature,
            resolved.max_tokens,
        )),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn resolved(kind: ProviderKind) -> ResolvedProvider {
        ResolvedProvider {
            kind,
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            api_key: Secret::new("sk-test".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn builds_each_provider_kind() {
        for kind in [ProviderKind::OpenAi, ProviderKind::Groq, ProviderKind::Anthropic] {
            let provider = build_provider(resolved(kind));
            assert_eq!(provider.name(), kind.as_str());
            assert_eq!(provider.id(), "test-model");
        }
    }
}
