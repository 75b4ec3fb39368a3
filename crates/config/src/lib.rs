//! Configuration loading, env substitution, and provider resolution.
//!
//! Config file: `skiff.toml`, searched in `./` then `~/.config/skiff/`.
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        AgentConfig, BrowserConfig, LlmConfig, ProviderKind, ProviderSettings, ResolvedProvider,
        SkiffConfig,
    },
};
