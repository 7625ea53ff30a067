//! The selector: picks exactly one next token under a deterministic or
//! stochastic policy.
//!
//! The stochastic path scales logits by temperature, truncates to the
//! nucleus, and samples from the renormalized remainder — but that transform
//! governs selection only. The reported probability, log probability, and
//! surprisal always come from the unscaled full-vocabulary softmax, so the
//! numbers shown to the user reflect the true model distribution rather than
//! the sampling-biased one.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distribution::{self, RankedToken};
use crate::error::CoreError;

/// Selection policy for one step. Chosen per call; there are no transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Pick the highest-probability token; ties break toward the smaller id.
    Deterministic,
    /// Temperature-scaled nucleus sampling.
    Stochastic { temperature: f32, nucleus_p: f32 },
}

/// Per-call randomness owner. Each step creates its own state so a scripted
/// seed makes sampling fully reproducible and no global generator is shared
/// across sessions.
pub struct SamplerState {
    rng: StdRng,
}

impl SamplerState {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

/// Outcome of a selection: the picked id with its probability, log
/// probability, and surprisal under the unscaled distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub id: u32,
    pub prob: f32,
    pub logprob: f32,
    pub surprisal: f32,
}

/// Subtract `penalty` from the logits of the given terminator tokens.
///
/// Applied before any ranking or selection when softening is requested, so
/// the entire pipeline sees the biased scores. Ids outside the vocabulary
/// are ignored.
pub fn soften_terminators(logits: &mut [f32], terminator_ids: &[u32], penalty: f32) {
    for &id in terminator_ids {
        if let Some(logit) = logits.get_mut(id as usize) {
            *logit -= penalty;
        }
    }
}

/// Pick exactly one token id from `logits` under `policy`.
pub fn choose(
    logits: &[f32],
    policy: Policy,
    state: &mut SamplerState,
) -> Result<Selection, CoreError> {
    distribution::ensure_finite(logits)?;
    let log_probs = distribution::log_softmax(logits);

    let id = match policy {
        Policy::Deterministic => argmax_smallest_id(&log_probs),
        Policy::Stochastic {
            temperature,
            nucleus_p,
        } => {
            if temperature <= 0.0 {
                return Err(CoreError::InvalidRequest(format!(
                    "temperature must be positive, got {temperature}"
                )));
            }
            if nucleus_p <= 0.0 || nucleus_p > 1.0 {
                return Err(CoreError::InvalidRequest(format!(
                    "nucleus_p must be in (0, 1], got {nucleus_p}"
                )));
            }
            sample_nucleus(logits, temperature, nucleus_p, &mut state.rng)
        }
    };

    let logprob = log_probs[id as usize];
    Ok(Selection {
        id,
        prob: logprob.exp(),
        logprob,
        surprisal: (-logprob).max(0.0),
    })
}

/// Ensure the chosen id appears in the ranked slice.
///
/// A token sampled from outside the slice has probability at most equal to
/// the current tail entry, so it replaces the last element: the list keeps
/// its length and stays sorted non-increasing. Returns true when a
/// replacement happened.
pub fn merge_chosen(entries: &mut [RankedToken], chosen: &Selection) -> bool {
    if entries.iter().any(|e| e.id == chosen.id) {
        return false;
    }
    let Some(last) = entries.last_mut() else {
        return false;
    };
    *last = RankedToken {
        id: chosen.id,
        prob: chosen.prob,
        logprob: chosen.logprob,
    };
    true
}

fn argmax_smallest_id(values: &[f32]) -> u32 {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate().skip(1) {
        // Strictly greater keeps the first occurrence, i.e. the smallest id.
        if v > values[best] {
            best = i;
        }
    }
    best as u32
}

fn sample_nucleus<R: Rng>(logits: &[f32], temperature: f32, nucleus_p: f32, rng: &mut R) -> u32 {
    let scaled: Vec<f32> = logits.iter().map(|&l| l / temperature).collect();
    let log_probs = distribution::log_softmax(&scaled);

    let mut order: Vec<u32> = (0..logits.len() as u32).collect();
    order.sort_unstable_by(|&a, &b| {
        log_probs[b as usize]
            .partial_cmp(&log_probs[a as usize])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });

    // Smallest prefix whose cumulative probability reaches the threshold;
    // the top token is always kept.
    let mut kept = 0usize;
    let mut nucleus_mass = 0.0f32;
    for &id in &order {
        kept += 1;
        nucleus_mass += log_probs[id as usize].exp();
        if nucleus_mass >= nucleus_p {
            break;
        }
    }
    let nucleus = &order[..kept];

    // One uniform draw over the renormalized nucleus.
    let draw: f32 = rng.gen::<f32>() * nucleus_mass;
    let mut acc = 0.0f32;
    for &id in nucleus {
        acc += log_probs[id as usize].exp();
        if draw < acc {
            return id;
        }
    }
    nucleus[nucleus.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stochastic(temperature: f32, nucleus_p: f32) -> Policy {
        Policy::Stochastic {
            temperature,
            nucleus_p,
        }
    }

    #[test]
    fn deterministic_picks_the_argmax() {
        let mut state = SamplerState::new(Some(1));
        let sel = choose(&[1.0, 5.0, 3.0, 2.0], Policy::Deterministic, &mut state).unwrap();
        assert_eq!(sel.id, 1);
    }

    #[test]
    fn deterministic_ties_break_to_smallest_id() {
        let mut state = SamplerState::new(Some(1));
        let sel = choose(&[1.0, 5.0, 5.0, 3.0], Policy::Deterministic, &mut state).unwrap();
        assert_eq!(sel.id, 1);
    }

    #[test]
    fn deterministic_is_repeatable() {
        let logits = vec![0.4, -0.2, 2.2, 1.9];
        let a = choose(&logits, Policy::Deterministic, &mut SamplerState::new(None)).unwrap();
        let b = choose(&logits, Policy::Deterministic, &mut SamplerState::new(None)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn surprisal_is_negative_logprob() {
        let mut state = SamplerState::new(Some(1));
        let sel = choose(&[2.0, 1.0, 0.1], Policy::Deterministic, &mut state).unwrap();
        assert!((sel.surprisal - 0.417).abs() < 1e-3);
        assert!((sel.surprisal + sel.logprob).abs() < 1e-6);
        assert!(sel.surprisal >= 0.0);
    }

    #[test]
    fn seeded_sampling_is_repeatable() {
        let logits = vec![0.1, 0.5, 0.3, 0.9, 0.2];
        let policy = stochastic(1.0, 1.0);
        let picks_a: Vec<u32> = {
            let mut state = SamplerState::new(Some(123));
            (0..32)
                .map(|_| choose(&logits, policy, &mut state).unwrap().id)
                .collect()
        };
        let picks_b: Vec<u32> = {
            let mut state = SamplerState::new(Some(123));
            (0..32)
                .map(|_| choose(&logits, policy, &mut state).unwrap().id)
                .collect()
        };
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn varying_the_seed_varies_the_draws() {
        let logits = vec![0.0; 16];
        let policy = stochastic(1.0, 1.0);
        let picks_a: Vec<u32> = {
            let mut state = SamplerState::new(Some(7));
            (0..32)
                .map(|_| choose(&logits, policy, &mut state).unwrap().id)
                .collect()
        };
        let picks_b: Vec<u32> = {
            let mut state = SamplerState::new(Some(8));
            (0..32)
                .map(|_| choose(&logits, policy, &mut state).unwrap().id)
                .collect()
        };
        assert_ne!(picks_a, picks_b);
    }

    #[test]
    fn tight_nucleus_always_keeps_the_top_token() {
        // The top token alone exceeds the threshold, so it is the only
        // sampleable candidate.
        let logits = vec![10.0, 0.0, 0.0, 0.0];
        let policy = stochastic(1.0, 0.7);
        let mut state = SamplerState::new(Some(3));
        for _ in 0..64 {
            let sel = choose(&logits, policy, &mut state).unwrap();
            assert_eq!(sel.id, 0);
        }
    }

    #[test]
    fn reported_numbers_come_from_the_unscaled_distribution() {
        let logits = vec![2.0, 1.5, 0.5, -1.0, -3.0];
        let full = distribution::log_softmax(&logits);
        let policy = stochastic(0.5, 0.9);
        let mut state = SamplerState::new(Some(11));
        for _ in 0..64 {
            let sel = choose(&logits, policy, &mut state).unwrap();
            // The nucleus-renormalized value would differ; the reported one
            // must match the full-vocabulary softmax exactly.
            assert!((sel.logprob - full[sel.id as usize]).abs() < 1e-6);
            assert!((sel.prob - full[sel.id as usize].exp()).abs() < 1e-6);
        }
    }

    #[test]
    fn nucleus_excludes_the_tail() {
        // probs ≈ [0.64, 0.24, 0.09, 0.03]; nucleus_p = 0.7 keeps ids 0 and 1.
        let logits = vec![3.0, 2.0, 1.0, 0.0];
        let policy = stochastic(1.0, 0.7);
        let mut state = SamplerState::new(Some(17));
        for _ in 0..256 {
            let sel = choose(&logits, policy, &mut state).unwrap();
            assert!(sel.id <= 1, "sampled outside the nucleus: {}", sel.id);
        }
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        let mut state = SamplerState::new(Some(1));
        let err = choose(&[1.0, 2.0], stochastic(0.0, 0.9), &mut state).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn out_of_range_nucleus_is_rejected() {
        let mut state = SamplerState::new(Some(1));
        assert!(choose(&[1.0, 2.0], stochastic(1.0, 0.0), &mut state).is_err());
        assert!(choose(&[1.0, 2.0], stochastic(1.0, 1.5), &mut state).is_err());
    }

    #[test]
    fn nan_logits_are_rejected_before_sampling() {
        let mut state = SamplerState::new(Some(1));
        let err = choose(&[1.0, f32::NAN], stochastic(1.0, 0.9), &mut state).unwrap_err();
        assert!(matches!(err, CoreError::NumericAnomaly { .. }));
    }

    #[test]
    fn soften_terminators_subtracts_the_penalty() {
        let mut logits = vec![1.0, 2.0, 3.0, 4.0];
        soften_terminators(&mut logits, &[1, 3], 2.0);
        assert_eq!(logits, vec![1.0, 0.0, 3.0, 2.0]);
    }

    #[test]
    fn soften_terminators_ignores_out_of_range_ids() {
        let mut logits = vec![1.0, 2.0];
        soften_terminators(&mut logits, &[9], 2.0);
        assert_eq!(logits, vec![1.0, 2.0]);
    }

    #[test]
    fn merge_keeps_an_already_present_token() {
        let mut entries = vec![
            RankedToken { id: 4, prob: 0.5, logprob: -0.69 },
            RankedToken { id: 2, prob: 0.3, logprob: -1.20 },
        ];
        let before = entries.clone();
        let chosen = Selection { id: 2, prob: 0.3, logprob: -1.20, surprisal: 1.20 };
        assert!(!merge_chosen(&mut entries, &chosen));
        assert_eq!(entries, before);
    }

    #[test]
    fn merge_replaces_the_tail_with_an_outside_pick() {
        let mut entries = vec![
            RankedToken { id: 4, prob: 0.5, logprob: -0.69 },
            RankedToken { id: 2, prob: 0.3, logprob: -1.20 },
            RankedToken { id: 7, prob: 0.1, logprob: -2.30 },
        ];
        let chosen = Selection { id: 9, prob: 0.05, logprob: -3.0, surprisal: 3.0 };
        assert!(merge_chosen(&mut entries, &chosen));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].id, 9);
        // Still sorted non-increasing.
        for pair in entries.windows(2) {
            assert!(pair[0].prob >= pair[1].prob);
        }
    }
}
