//! Wire schema for the step surface.
//!
//! Every external payload crosses into the core through these types, with
//! serde handling validation and defaulting exhaustively — nothing
//! duck-typed reaches the pipeline.

use serde::{Deserialize, Serialize};
use tokenlens_core::token::{ChosenToken, TokenCandidate};

/// Schema version stamped into every response body and the
/// `X-Tokenlens-Contract` header.
pub const CONTRACT_VERSION: &str = "v1";

/// Wire name of the selection policy. "argmax" is accepted as a legacy alias
/// for the deterministic policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[serde(alias = "argmax")]
    Deterministic,
    Stochastic,
}

/// Request body for `POST /step`.
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub context_text: String,
    /// Requested top-k; the server clamps it and reports the used value.
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default = "default_policy")]
    pub policy: PolicyKind,
    /// Stochastic temperature; defaults and clamps are configuration.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus threshold; `top_p` is accepted as an alias.
    #[serde(default, alias = "top_p")]
    pub nucleus_p: Option<f32>,
    /// Penalize newline/EOS logits to discourage premature termination.
    #[serde(default, alias = "soften_newline_eot")]
    pub soften_terminators: bool,
    /// Seed for reproducible stochastic sampling.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Request body for `POST /next_dist`.
#[derive(Debug, Deserialize)]
pub struct NextDistRequest {
    pub context_text: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

fn default_top_k() -> i64 {
    10
}

fn default_policy() -> PolicyKind {
    PolicyKind::Stochastic
}

// ─── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token_id: u32,
    /// Exact decoded bytes; the only field safe for concatenation.
    pub token_text_raw: String,
    /// Rendering-safe label; presentation only.
    pub token_text_display: String,
    pub prob: f32,
    pub logprob: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChosenEntry {
    pub token_id: u32,
    pub token_text_raw: String,
    pub token_text_display: String,
    pub prob: f32,
    pub logprob: f32,
    pub surprisal: f32,
}

/// Final context token, or nulls on a cold start.
#[derive(Debug, Serialize, Deserialize)]
pub struct LastToken {
    pub id: Option<u32>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
    pub vocab_size: usize,
}

/// Response body for `POST /next_dist`: the ranked distribution with no
/// token chosen and nothing to append.
#[derive(Debug, Serialize, Deserialize)]
pub struct NextDistResponse {
    /// Context length in tokens after truncation.
    pub context_len_tokens: usize,
    pub truncated: bool,
    /// The k actually used, after clamping.
    pub used_top_k: usize,
    pub topk: Vec<TokenEntry>,
    /// Probability mass captured by `topk`; below 1 unless k covers the
    /// whole vocabulary.
    pub coverage_topk: f32,
    pub last_token: LastToken,
    pub model_info: ModelInfo,
    pub contract_version: String,
}

/// Response body for `POST /step`: the distribution plus the chosen token.
#[derive(Debug, Serialize, Deserialize)]
pub struct StepResponse {
    #[serde(flatten)]
    pub dist: NextDistResponse,
    pub chosen: ChosenEntry,
    /// Exact text the client appends to its rendered output.
    pub append_text: String,
}

impl From<&TokenCandidate> for TokenEntry {
    fn from(candidate: &TokenCandidate) -> Self {
        Self {
            token_id: candidate.id,
            token_text_raw: candidate.raw_text.clone(),
            token_text_display: candidate.display_text.clone(),
            prob: candidate.prob,
            logprob: candidate.logprob,
        }
    }
}

impl From<&ChosenToken> for ChosenEntry {
    fn from(chosen: &ChosenToken) -> Self {
        Self {
            token_id: chosen.candidate.id,
            token_text_raw: chosen.candidate.raw_text.clone(),
            token_text_display: chosen.candidate.display_text.clone(),
            prob: chosen.candidate.prob,
            logprob: chosen.candidate.logprob,
            surprisal: chosen.surprisal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_request_defaults() {
        let req: StepRequest = serde_json::from_str(r#"{"context_text": "hi"}"#).unwrap();
        assert_eq!(req.top_k, 10);
        assert_eq!(req.policy, PolicyKind::Stochastic);
        assert!(req.temperature.is_none());
        assert!(req.nucleus_p.is_none());
        assert!(!req.soften_terminators);
        assert!(req.seed.is_none());
    }

    #[test]
    fn policy_accepts_the_argmax_alias() {
        let req: StepRequest =
            serde_json::from_str(r#"{"context_text": "", "policy": "argmax"}"#).unwrap();
        assert_eq!(req.policy, PolicyKind::Deterministic);

        let req: StepRequest =
            serde_json::from_str(r#"{"context_text": "", "policy": "deterministic"}"#).unwrap();
        assert_eq!(req.policy, PolicyKind::Deterministic);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result: Result<StepRequest, _> =
            serde_json::from_str(r#"{"context_text": "", "policy": "beam"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn top_p_alias_maps_to_nucleus_p() {
        let req: StepRequest =
            serde_json::from_str(r#"{"context_text": "", "top_p": 0.9}"#).unwrap();
        assert_eq!(req.nucleus_p, Some(0.9));
    }

    #[test]
    fn negative_top_k_parses_for_later_clamping() {
        let req: StepRequest =
            serde_json::from_str(r#"{"context_text": "", "top_k": -3}"#).unwrap();
        assert_eq!(req.top_k, -3);
    }
}
