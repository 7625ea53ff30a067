//! The per-step pipeline: encode → score → rank → select → assemble.
//!
//! Each step is one synchronous unit of work, and failure is all-or-nothing:
//! an error from any stage produces no outcome and therefore nothing a
//! caller could append to a trace. The server stays stateless — the
//! [`SessionTrace`](crate::trace::SessionTrace) lives with the client, which
//! turns outcomes into records via [`StepOutcome::to_record`].

use std::sync::Arc;

use crate::codec::Codec;
use crate::config::EngineConfig;
use crate::context::{self, ContextWindow};
use crate::display;
use crate::distribution::{self, Ranked, RankedToken};
use crate::error::CoreError;
use crate::sampling::{self, Policy, SamplerState};
use crate::scorer::Scorer;
use crate::token::{ChosenToken, TokenCandidate};
use crate::trace::StepRecord;

/// Parameters for one step request.
#[derive(Debug, Clone, Copy)]
pub struct StepParams {
    /// Requested top-k; clamped into the configured bounds.
    pub top_k: i64,
    pub policy: Policy,
    /// Penalize newline/EOS logits to discourage premature termination.
    pub soften_terminators: bool,
    /// Seed for reproducible stochastic sampling. Randomness is owned per
    /// call; no generator is shared between steps.
    pub seed: Option<u64>,
}

/// Read-only ranking outcome: the distribution without a choice.
#[derive(Debug, Clone)]
pub struct DistributionOutcome {
    /// Context length in ids, after truncation.
    pub context_len: usize,
    pub truncated: bool,
    /// Final context token, if the context was non-empty.
    pub last_token_id: Option<u32>,
    pub last_token_text: Option<String>,
    pub requested_k: i64,
    pub used_k: usize,
    pub top_k: Vec<TokenCandidate>,
    pub coverage: f32,
}

/// Full step outcome: the distribution plus the chosen token and the exact
/// text to append to the rendered output.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub dist: DistributionOutcome,
    pub chosen: ChosenToken,
    /// Always the chosen token's `raw_text`; the caller appends this and
    /// nothing else.
    pub append_text: String,
}

impl StepOutcome {
    /// Build the trace record for this outcome at the given position.
    pub fn to_record(&self, index: usize) -> StepRecord {
        StepRecord {
            index,
            context_length_before: self.dist.context_len,
            chosen: self.chosen.clone(),
            top_k: self.dist.top_k.clone(),
        }
    }
}

/// The pipeline, wired to a codec and a scorer.
pub struct StepEngine {
    codec: Arc<dyn Codec>,
    scorer: Arc<dyn Scorer>,
    config: EngineConfig,
    /// Token ids penalized when softening is requested (newline, EOS).
    terminator_ids: Vec<u32>,
}

impl StepEngine {
    pub fn new(codec: Arc<dyn Codec>, scorer: Arc<dyn Scorer>, config: EngineConfig) -> Self {
        let terminator_ids = resolve_terminators(codec.as_ref(), config.eos_token_id);
        Self {
            codec,
            scorer,
            config,
            terminator_ids,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocab_size(&self) -> usize {
        self.codec.vocab_size()
    }

    /// Rank the next-token distribution for `context_text` without choosing
    /// a token or advancing anything.
    pub fn distribution(
        &self,
        context_text: &str,
        top_k: i64,
    ) -> Result<DistributionOutcome, CoreError> {
        let window = context::prepare(context_text, self.codec.as_ref(), self.config.context_cap)?;
        let logits = self.score(&window, false)?;
        let ranked = distribution::rank(&logits, top_k, self.config.top_k)?;
        self.assemble(&window, ranked)
    }

    /// Run one full step: rank the distribution, pick exactly one token, and
    /// guarantee the pick appears in the reported top-k.
    pub fn step(&self, context_text: &str, params: &StepParams) -> Result<StepOutcome, CoreError> {
        let window = context::prepare(context_text, self.codec.as_ref(), self.config.context_cap)?;
        let logits = self.score(&window, params.soften_terminators)?;

        let mut ranked = distribution::rank(&logits, params.top_k, self.config.top_k)?;

        let policy = self.clamp_policy(params.policy);
        let mut state = SamplerState::new(params.seed);
        let selection = sampling::choose(&logits, policy, &mut state)?;

        // The chosen token must be visible in the candidate slice; if the
        // draw landed outside it, the tail entry is evicted for it.
        if sampling::merge_chosen(&mut ranked.entries, &selection) {
            ranked.coverage = ranked.entries.iter().map(|e| e.prob).sum();
        }

        tracing::debug!(
            context_len = window.len,
            truncated = window.truncated,
            chosen = selection.id,
            surprisal = selection.surprisal,
            "step complete"
        );

        let dist = self.assemble(&window, ranked)?;
        let candidate = self.hydrate(&RankedToken {
            id: selection.id,
            prob: selection.prob,
            logprob: selection.logprob,
        })?;
        let append_text = candidate.raw_text.clone();

        Ok(StepOutcome {
            dist,
            chosen: ChosenToken {
                candidate,
                surprisal: selection.surprisal,
            },
            append_text,
        })
    }

    fn score(&self, window: &ContextWindow, soften: bool) -> Result<Vec<f32>, CoreError> {
        let mut logits = self
            .scorer
            .forward(&window.ids)
            .map_err(|e| CoreError::ScorerUnavailable(e.to_string()))?;

        let vocab = self.codec.vocab_size();
        if logits.len() != vocab {
            return Err(CoreError::ScorerUnavailable(format!(
                "scorer returned {} logits for a vocabulary of {vocab}",
                logits.len()
            )));
        }
        distribution::ensure_finite(&logits)?;

        if soften {
            sampling::soften_terminators(
                &mut logits,
                &self.terminator_ids,
                self.config.soften_penalty,
            );
        }
        Ok(logits)
    }

    /// Apply the documented clamps to the stochastic parameters. Along with
    /// top-k these are the only coerced inputs.
    fn clamp_policy(&self, policy: Policy) -> Policy {
        match policy {
            Policy::Deterministic => Policy::Deterministic,
            Policy::Stochastic {
                temperature,
                nucleus_p,
            } => Policy::Stochastic {
                temperature: self.config.temperature.clamp(temperature),
                nucleus_p: self.config.nucleus_p.clamp(nucleus_p),
            },
        }
    }

    fn assemble(
        &self,
        window: &ContextWindow,
        ranked: Ranked,
    ) -> Result<DistributionOutcome, CoreError> {
        let top_k = ranked
            .entries
            .iter()
            .map(|entry| self.hydrate(entry))
            .collect::<Result<Vec<_>, _>>()?;

        let (last_token_id, last_token_text) = match window.ids.last() {
            Some(&id) => (Some(id), Some(self.codec.token_text(id)?)),
            None => (None, None),
        };

        Ok(DistributionOutcome {
            context_len: window.len,
            truncated: window.truncated,
            last_token_id,
            last_token_text,
            requested_k: ranked.requested_k,
            used_k: ranked.used_k,
            top_k,
            coverage: ranked.coverage,
        })
    }

    fn hydrate(&self, entry: &RankedToken) -> Result<TokenCandidate, CoreError> {
        let raw_text = self.codec.token_text(entry.id)?;
        let display_text = display::token_display(&raw_text);
        Ok(TokenCandidate {
            id: entry.id,
            raw_text,
            display_text,
            prob: entry.prob,
            logprob: entry.logprob,
        })
    }
}

fn resolve_terminators(codec: &dyn Codec, eos_token_id: Option<u32>) -> Vec<u32> {
    let mut ids = Vec::new();
    if let Ok(encoded) = codec.encode("\n") {
        if let Some(&newline) = encoded.first() {
            ids.push(newline);
        }
    }
    if let Some(eos) = eos_token_id {
        if !ids.contains(&eos) {
            ids.push(eos);
        }
    }
    ids
}
