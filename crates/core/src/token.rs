use serde::{Deserialize, Serialize};

/// One candidate for the next position.
///
/// `raw_text` is the exact decoded byte sequence and is the only field ever
/// used for concatenation or hashing; `display_text` is the rendering-safe
/// transform and is presentation-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCandidate {
    pub id: u32,
    pub raw_text: String,
    pub display_text: String,
    /// Probability under the full-vocabulary softmax, in `(0, 1]`.
    pub prob: f32,
    /// Log probability, `<= 0`.
    pub logprob: f32,
}

/// The candidate the selector picked, with its surprisal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenToken {
    #[serde(flatten)]
    pub candidate: TokenCandidate,
    /// `-logprob`, always `>= 0`. Measures how unexpected the pick was under
    /// the true model distribution.
    pub surprisal: f32,
}
