use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::types::CONTRACT_VERSION;
use super::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub model_name: String,
    pub vocab_size: usize,
    pub contract_version: String,
}

/// Liveness plus the model identity clients should expect.
///
/// GET /healthz
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        model_name: state.model_name.clone(),
        vocab_size: state.vocab_size,
        contract_version: CONTRACT_VERSION.to_string(),
    })
}
