//! Deterministic fixtures for tests: a table-driven codec with exact
//! round-trip behavior and scripted scorers. Exposed to downstream crates
//! through the `test-utils` feature.

use crate::codec::{Codec, CodecError};
use crate::scorer::{Scorer, ScorerError};

/// Codec over a fixed vocabulary table. `decode` is plain concatenation of
/// vocabulary entries and `encode` is greedy longest-match, so round-trips
/// are exact by construction.
pub struct TinyCodec {
    vocab: Vec<String>,
}

impl TinyCodec {
    pub fn new<S: Into<String>>(vocab: Vec<S>) -> Self {
        Self {
            vocab: vocab.into_iter().map(Into::into).collect(),
        }
    }

    /// A small word-piece vocabulary, enough for pipeline tests.
    pub fn words() -> Self {
        Self::new(vec![
            "the", " cat", " sat", " on", " mat", "\n", " ", ".", "a", "b", "c", "d",
        ])
    }
}

impl Codec for TinyCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError> {
        let mut ids = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let mut best: Option<(usize, usize)> = None; // (id, byte length)
            for (id, piece) in self.vocab.iter().enumerate() {
                if !piece.is_empty()
                    && rest.starts_with(piece.as_str())
                    && best.map_or(true, |(_, len)| piece.len() > len)
                {
                    best = Some((id, piece.len()));
                }
            }
            match best {
                Some((id, len)) => {
                    ids.push(id as u32);
                    rest = &rest[len..];
                }
                None => {
                    return Err(CodecError(format!(
                        "no vocabulary entry matches {:?}",
                        rest.chars().next().unwrap()
                    )))
                }
            }
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String, CodecError> {
        let mut out = String::new();
        for &id in ids {
            let piece = self
                .vocab
                .get(id as usize)
                .ok_or_else(|| CodecError(format!("token id {id} out of range")))?;
            out.push_str(piece);
        }
        Ok(out)
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

/// Scorer that replays a fixed logit vector regardless of context.
pub struct FixedScorer {
    logits: Vec<f32>,
}

impl FixedScorer {
    pub fn new(logits: Vec<f32>) -> Self {
        Self { logits }
    }
}

impl Scorer for FixedScorer {
    fn forward(&self, _ids: &[u32]) -> Result<Vec<f32>, ScorerError> {
        Ok(self.logits.clone())
    }

    fn vocab_size(&self) -> usize {
        self.logits.len()
    }
}

/// Scorer that always fails, for exercising the retryable error path.
pub struct FailingScorer;

impl Scorer for FailingScorer {
    fn forward(&self, _ids: &[u32]) -> Result<Vec<f32>, ScorerError> {
        Err(ScorerError("backend offline".to_string()))
    }

    fn vocab_size(&self) -> usize {
        0
    }
}
