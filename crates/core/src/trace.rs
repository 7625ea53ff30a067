//! The session trace: an append-only, client-owned record of every step
//! taken, sufficient to rebuild the rendered text and the full chip-by-chip
//! view without another call into the distribution engine or selector.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::{ChosenToken, TokenCandidate};

/// One completed step: the distribution that was shown and the token that
/// was taken. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the trace; always equal to the record's index.
    pub index: usize,
    /// Context length (in ids) the step was scored against.
    pub context_length_before: usize,
    pub chosen: ChosenToken,
    pub top_k: Vec<TokenCandidate>,
}

/// Replayable display data for one step, derived purely from stored records.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipRow {
    pub index: usize,
    pub chosen_display: String,
    pub chosen_surprisal: f32,
    /// `(display_text, prob)` per shown candidate, in ranked order.
    pub candidates: Vec<(String, f32)>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("record index {got} does not continue the trace (expected {expected})")]
    IndexMismatch { expected: usize, got: usize },
}

/// Append-only record of one session.
///
/// A trace belongs to exactly one session and is held by the client; the
/// server never stores one. Editing the initial context means discarding the
/// trace and starting a new one — records are never edited or removed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionTrace {
    records: Vec<StepRecord>,
}

impl SessionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index the next appended record must carry.
    pub fn next_index(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Append the next step. The only mutator. Rejects records whose index
    /// does not continue the sequence, preserving `records[i].index == i`.
    pub fn append(&mut self, record: StepRecord) -> Result<(), TraceError> {
        if record.index != self.records.len() {
            return Err(TraceError::IndexMismatch {
                expected: self.records.len(),
                got: record.index,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// The rendered text: `initial` followed by every chosen token's raw
    /// text in trace order.
    ///
    /// Pure and deterministic — this same derivation builds the next step's
    /// context and the collapsed view, so the two can never drift apart.
    pub fn reconstruct_text(&self, initial: &str) -> String {
        let mut out = String::from(initial);
        for record in &self.records {
            out.push_str(&record.chosen.candidate.raw_text);
        }
        out
    }

    /// Replay the stored per-step display data. Nothing is recomputed:
    /// switching between detailed and collapsed views is free.
    pub fn reconstruct_chips(&self) -> Vec<ChipRow> {
        self.records
            .iter()
            .map(|record| ChipRow {
                index: record.index,
                chosen_display: record.chosen.candidate.display_text.clone(),
                chosen_surprisal: record.chosen.surprisal,
                candidates: record
                    .top_k
                    .iter()
                    .map(|c| (c.display_text.clone(), c.prob))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::token_display;

    fn candidate(id: u32, raw: &str, prob: f32) -> TokenCandidate {
        TokenCandidate {
            id,
            raw_text: raw.to_string(),
            display_text: token_display(raw),
            prob,
            logprob: prob.ln(),
        }
    }

    fn record(index: usize, raw: &str) -> StepRecord {
        let chosen = candidate(index as u32, raw, 0.5);
        StepRecord {
            index,
            context_length_before: index,
            chosen: ChosenToken {
                candidate: chosen.clone(),
                surprisal: -chosen.logprob,
            },
            top_k: vec![chosen, candidate(99, " other", 0.2)],
        }
    }

    #[test]
    fn append_enforces_the_index_invariant() {
        let mut trace = SessionTrace::new();
        trace.append(record(0, "the")).unwrap();
        let err = trace.append(record(2, " cat")).unwrap_err();
        assert_eq!(err, TraceError::IndexMismatch { expected: 1, got: 2 });
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn records_keep_their_positions() {
        let mut trace = SessionTrace::new();
        for (i, raw) in ["the", " cat", " sat"].iter().enumerate() {
            trace.append(record(i, raw)).unwrap();
        }
        for (i, r) in trace.records().iter().enumerate() {
            assert_eq!(r.index, i);
        }
    }

    #[test]
    fn reconstruct_text_is_initial_plus_raw_texts() {
        let mut trace = SessionTrace::new();
        assert_eq!(trace.reconstruct_text("Once"), "Once");

        trace.append(record(0, " upon")).unwrap();
        trace.append(record(1, " a")).unwrap();
        trace.append(record(2, " time")).unwrap();
        assert_eq!(trace.reconstruct_text("Once"), "Once upon a time");
    }

    #[test]
    fn reconstruct_text_preserves_exact_bytes() {
        let mut trace = SessionTrace::new();
        trace.append(record(0, "\n")).unwrap();
        trace.append(record(1, "  x")).unwrap();
        assert_eq!(trace.reconstruct_text(""), "\n  x");
    }

    #[test]
    fn chips_replay_stored_values() {
        let mut trace = SessionTrace::new();
        trace.append(record(0, " cat")).unwrap();

        let chips = trace.reconstruct_chips();
        assert_eq!(chips.len(), 1);
        assert_eq!(chips[0].index, 0);
        assert_eq!(chips[0].chosen_display, "␠cat");
        assert_eq!(chips[0].candidates.len(), 2);
        assert_eq!(chips[0].candidates[0].0, "␠cat");
    }

    #[test]
    fn empty_trace_has_no_chips() {
        assert!(SessionTrace::new().reconstruct_chips().is_empty());
    }
}
