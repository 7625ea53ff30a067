use thiserror::Error;

use crate::codec::CodecError;

/// Failures surfaced by the step pipeline.
///
/// Every variant is reported to the caller instead of panicking; the service
/// layer translates them into HTTP statuses.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input, rejected before the scorer runs.
    ///
    /// The top-k, temperature, and nucleus-p clamps are the only inputs that
    /// are coerced instead of rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The scorer backend failed or is unreachable. Retryable; nothing is
    /// appended to any trace on this path.
    #[error("scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// The scorer produced a non-finite logit. Fatal for this step: NaN must
    /// never reach the probability vector.
    #[error("non-finite logit at vocabulary index {index}")]
    NumericAnomaly { index: usize },

    /// Text/id conversion failed inside the codec.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
