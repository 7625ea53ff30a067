//! Weight-free demo scorer based on prompt lookup.
//!
//! For every suffix of the context (length in `[min_n, max_n]`) that also
//! occurs earlier in the same context, the token that followed the earlier
//! occurrence gets its logit raised in proportion to the match length. With
//! no matches the distribution is uniform. This is a pure CPU operation with
//! no model weights, so the server binary and the end-to-end tests can run
//! the full pipeline out of the box; real backends implement
//! [`Scorer`](crate::scorer::Scorer) over an actual model.

use crate::scorer::{Scorer, ScorerError};

/// Configuration for the prompt-lookup scorer.
#[derive(Debug, Clone, Copy)]
pub struct NGramConfig {
    /// Minimum suffix length to match (inclusive).
    pub min_n: usize,
    /// Maximum suffix length to match (inclusive).
    pub max_n: usize,
    /// Logit added per match, scaled by the match length.
    pub boost: f32,
}

impl Default for NGramConfig {
    fn default() -> Self {
        Self {
            min_n: 1,
            max_n: 4,
            boost: 2.0,
        }
    }
}

/// Prompt-lookup scorer over a fixed vocabulary size.
#[derive(Debug, Clone)]
pub struct NGramScorer {
    vocab_size: usize,
    config: NGramConfig,
}

impl NGramScorer {
    pub fn new(vocab_size: usize) -> Self {
        Self::with_config(vocab_size, NGramConfig::default())
    }

    pub fn with_config(vocab_size: usize, config: NGramConfig) -> Self {
        Self { vocab_size, config }
    }
}

impl Scorer for NGramScorer {
    fn forward(&self, ids: &[u32]) -> Result<Vec<f32>, ScorerError> {
        if self.vocab_size == 0 {
            return Err(ScorerError("vocabulary is empty".to_string()));
        }

        let mut logits = vec![0.0f32; self.vocab_size];
        let total = ids.len();

        for n in self.config.min_n..=self.config.max_n.min(total) {
            let suffix = &ids[total - n..];
            // Every earlier window matching the suffix votes for its follower.
            for start in 0..total - n {
                if &ids[start..start + n] == suffix {
                    let follower = ids[start + n] as usize;
                    if follower < self.vocab_size {
                        logits[follower] += self.config.boost * n as f32;
                    }
                }
            }
        }

        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argmax(logits: &[f32]) -> usize {
        let mut best = 0;
        for (i, &l) in logits.iter().enumerate().skip(1) {
            if l > logits[best] {
                best = i;
            }
        }
        best
    }

    #[test]
    fn repeated_pattern_boosts_its_follower() {
        let scorer = NGramScorer::new(16);
        // The suffix [1, 2] occurred earlier followed by 3.
        let logits = scorer.forward(&[1, 2, 3, 1, 2]).unwrap();
        assert_eq!(argmax(&logits), 3);
        assert!(logits[3] > 0.0);
    }

    #[test]
    fn longer_matches_weigh_more() {
        let scorer = NGramScorer::new(16);
        // [5, 6, 7] recurs (follower 8); [7] alone also recurs (follower 8),
        // so token 8 accumulates boosts across n = 1..=3.
        let logits = scorer.forward(&[5, 6, 7, 8, 5, 6, 7]).unwrap();
        let single = scorer.forward(&[9, 7, 8, 1, 7]).unwrap();
        assert!(logits[8] > single[8]);
    }

    #[test]
    fn no_match_is_uniform() {
        let scorer = NGramScorer::new(8);
        let logits = scorer.forward(&[0, 1, 2, 3]).unwrap();
        assert!(logits.iter().all(|&l| l == 0.0));
    }

    #[test]
    fn empty_context_is_uniform() {
        let scorer = NGramScorer::new(8);
        let logits = scorer.forward(&[]).unwrap();
        assert_eq!(logits.len(), 8);
        assert!(logits.iter().all(|&l| l == 0.0));
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let scorer = NGramScorer::new(0);
        assert!(scorer.forward(&[1, 2]).is_err());
    }
}
