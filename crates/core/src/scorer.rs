use thiserror::Error;

/// Produces next-position logits for a token-id context.
///
/// This is the model boundary: weight loading and hosting live behind it and
/// are not this crate's concern. `forward` returns one raw score per
/// vocabulary entry for the position following `ids`. The pipeline verifies
/// the vector length against the codec vocabulary and rejects non-finite
/// values before any probability math.
pub trait Scorer: Send + Sync {
    fn forward(&self, ids: &[u32]) -> Result<Vec<f32>, ScorerError>;

    fn vocab_size(&self) -> usize;
}

/// Backend failure. Surfaced to callers as retryable; a failed forward pass
/// never leaves partial state behind.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ScorerError(pub String);
