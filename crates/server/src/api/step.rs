//! The step surface: `/step` advances by exactly one token, `/next_dist`
//! exposes the same ranking read-only.
//!
//! The server holds no session state. The client owns its trace and sends
//! the full rendered text each request, so per-session serialization is the
//! client's contract and concurrent sessions need no coordination here.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use tokenlens_core::error::CoreError;
use tokenlens_core::step::{DistributionOutcome, StepOutcome, StepParams};

use super::error::ApiError;
use super::types::{
    ChosenEntry, LastToken, ModelInfo, NextDistRequest, NextDistResponse, StepRequest,
    StepResponse, TokenEntry, CONTRACT_VERSION,
};
use super::validation;
use super::AppState;

/// After this long an in-flight step logs a non-fatal "still working" note.
const SLOW_AFTER: Duration = Duration::from_secs(2);
/// After this long it logs a stronger warning. The computation is never
/// cancelled: a slow request still completes and returns normally.
const STALLED_AFTER: Duration = Duration::from_secs(5);

/// Advance by one token: rank the distribution, choose, and return the text
/// to append.
///
/// POST /step
pub async fn step(
    State(state): State<AppState>,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    validation::validate_context_text(&req.context_text)?;

    let policy = validation::resolve_policy(&req, state.engine.config());
    let params = StepParams {
        top_k: req.top_k,
        policy,
        soften_terminators: req.soften_terminators,
        seed: req.seed,
    };

    let engine = state.engine.clone();
    let context_text = req.context_text;
    let outcome: StepOutcome =
        run_scored(move || engine.step(&context_text, &params), "/step").await?;

    Ok(Json(step_response(&state, outcome)))
}

/// Rank the distribution without choosing or advancing anything.
///
/// POST /next_dist
pub async fn next_dist(
    State(state): State<AppState>,
    Json(req): Json<NextDistRequest>,
) -> Result<Json<NextDistResponse>, ApiError> {
    validation::validate_context_text(&req.context_text)?;

    let engine = state.engine.clone();
    let context_text = req.context_text;
    let top_k = req.top_k;
    let outcome: DistributionOutcome = run_scored(
        move || engine.distribution(&context_text, top_k),
        "/next_dist",
    )
    .await?;

    Ok(Json(dist_response(&state, &outcome)))
}

/// Run a pipeline call on the blocking pool with the two-tier latency
/// indication: an informational log at 2 s and a warning at 5 s, never a
/// cancellation.
async fn run_scored<T, F>(work: F, route: &'static str) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    let watcher = tokio::spawn(async move {
        tokio::time::sleep(SLOW_AFTER).await;
        tracing::info!(route, "step still working");
        tokio::time::sleep(STALLED_AFTER - SLOW_AFTER).await;
        tracing::warn!(route, "step taking unusually long; request continues");
    });

    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")));
    watcher.abort();

    result?.map_err(ApiError::from)
}

fn dist_response(state: &AppState, outcome: &DistributionOutcome) -> NextDistResponse {
    NextDistResponse {
        context_len_tokens: outcome.context_len,
        truncated: outcome.truncated,
        used_top_k: outcome.used_k,
        topk: outcome.top_k.iter().map(TokenEntry::from).collect(),
        coverage_topk: outcome.coverage,
        last_token: LastToken {
            id: outcome.last_token_id,
            text: outcome.last_token_text.clone(),
        },
        model_info: ModelInfo {
            provider: state.provider.clone(),
            model_name: state.model_name.clone(),
            vocab_size: state.vocab_size,
        },
        contract_version: CONTRACT_VERSION.to_string(),
    }
}

fn step_response(state: &AppState, outcome: StepOutcome) -> StepResponse {
    let chosen = ChosenEntry::from(&outcome.chosen);
    StepResponse {
        dist: dist_response(state, &outcome.dist),
        chosen,
        append_text: outcome.append_text,
    }
}
