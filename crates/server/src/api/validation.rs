use tokenlens_core::config::EngineConfig;
use tokenlens_core::sampling::Policy;

use super::error::ApiError;
use super::types::{PolicyKind, StepRequest};

/// Maximum accepted `context_text` length in characters. Oversized inputs
/// are rejected before the scorer runs.
pub const MAX_PAYLOAD_CHARS: usize = 50_000;

pub fn validate_context_text(text: &str) -> Result<(), ApiError> {
    if text.chars().count() > MAX_PAYLOAD_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "context_text too large (max {MAX_PAYLOAD_CHARS} characters); reduce the input"
        )));
    }
    Ok(())
}

/// Resolve the wire policy into a core [`Policy`], filling the configured
/// defaults for absent stochastic parameters. The engine clamps temperature
/// and nucleus-p into their documented ranges; together with top-k these are
/// the only coerced request parameters.
pub fn resolve_policy(req: &StepRequest, config: &EngineConfig) -> Policy {
    match req.policy {
        PolicyKind::Deterministic => Policy::Deterministic,
        PolicyKind::Stochastic => Policy::Stochastic {
            temperature: req.temperature.unwrap_or(config.default_temperature),
            nucleus_p: req.nucleus_p.unwrap_or(config.default_nucleus_p),
        },
    }
}
