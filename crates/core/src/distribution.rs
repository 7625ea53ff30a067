//! The distribution engine: stable softmax over raw logits and the ranked
//! top-k slice.
//!
//! All probability math goes through [`log_softmax`]; raw logits are never
//! exponentiated directly, so large positive scores cannot overflow and very
//! negative ones cannot underflow to zero before normalization.

use std::cmp::Ordering;

use crate::config::TopKBounds;
use crate::error::CoreError;

/// One ranked entry: a token id with its full-vocabulary probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedToken {
    pub id: u32,
    pub prob: f32,
    pub logprob: f32,
}

/// The top slice of a next-token distribution, highest probability first.
#[derive(Debug, Clone)]
pub struct Ranked {
    /// Strictly non-increasing in probability; ties ordered by ascending id.
    pub entries: Vec<RankedToken>,
    /// Probability mass captured by `entries`. Less than one whenever
    /// `used_k` is smaller than the vocabulary; callers must not treat the
    /// slice as a full distribution.
    pub coverage: f32,
    /// The k the caller asked for, before clamping.
    pub requested_k: i64,
    /// The k actually used, after clamping to the policy bounds and the
    /// vocabulary size.
    pub used_k: usize,
}

/// Reject empty or non-finite logit vectors before any probability math.
pub fn ensure_finite(logits: &[f32]) -> Result<(), CoreError> {
    if logits.is_empty() {
        return Err(CoreError::InvalidRequest("empty logit vector".to_string()));
    }
    if let Some(index) = logits.iter().position(|l| !l.is_finite()) {
        return Err(CoreError::NumericAnomaly { index });
    }
    Ok(())
}

/// Numerically stable log-softmax:
/// `log_softmax(x_i) = x_i - max(x) - ln(Σ exp(x_j - max(x)))`.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum_ln = logits
        .iter()
        .map(|&x| (x - max_logit).exp())
        .sum::<f32>()
        .ln();
    logits.iter().map(|&x| x - max_logit - exp_sum_ln).collect()
}

/// Rank the `requested_k` most probable tokens.
///
/// `requested_k` is clamped into `bounds` (zero and negative requests clamp
/// to the lower bound) and then into the vocabulary size; the clamped value
/// comes back as `used_k` so callers can detect the coercion. Ties break
/// toward the smaller token id, which makes the ordering reproducible.
pub fn rank(logits: &[f32], requested_k: i64, bounds: TopKBounds) -> Result<Ranked, CoreError> {
    ensure_finite(logits)?;

    let used_k = bounds.clamp(requested_k, logits.len());
    let log_probs = log_softmax(logits);

    let mut order: Vec<u32> = (0..logits.len() as u32).collect();
    order.sort_unstable_by(|&a, &b| {
        log_probs[b as usize]
            .partial_cmp(&log_probs[a as usize])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order.truncate(used_k);

    let entries: Vec<RankedToken> = order
        .into_iter()
        .map(|id| {
            let logprob = log_probs[id as usize];
            RankedToken {
                id,
                prob: logprob.exp(),
                logprob,
            }
        })
        .collect();
    let coverage = entries.iter().map(|e| e.prob).sum();

    Ok(Ranked {
        entries,
        coverage,
        requested_k,
        used_k,
    })
}
