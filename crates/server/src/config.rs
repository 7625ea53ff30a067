//! Configuration persistence.
//!
//! Configuration is loaded with the following priority:
//! 1. CLI arguments (highest priority)
//! 2. Config file (`~/.config/tokenlens/config.toml`)
//! 3. Default values (lowest priority)

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persistent configuration stored in TOML format. Every field is optional;
/// absent fields fall back to the CLI defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the `tokenizer.json` used as the codec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,

    /// Label reported by `/healthz` and in `model_info`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Host to bind to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port to listen on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Maximum context length in tokens; older tokens are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_cap: Option<usize>,

    /// Lower clamp bound for requested top-k.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k_min: Option<usize>,

    /// Upper clamp bound for requested top-k.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k_max: Option<usize>,

    /// End-of-sequence token id, softened together with newline when a
    /// request asks for terminator softening.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eos_token_id: Option<u32>,

    /// Comma-separated list of allowed CORS origins. "*" allows all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<String>,

    /// Comma-separated list of allowed CORS HTTP methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<String>,

    /// Comma-separated list of allowed CORS headers. "*" allows all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<String>,

    /// Log level for the server (trace, debug, info, warn, error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tokenlens").join("config.toml"))
    }

    /// Load from the default path; missing or unreadable files yield the
    /// defaults, a malformed file is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                eprintln!("Ignoring malformed config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}
