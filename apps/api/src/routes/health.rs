use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health
/// Reports liveness and whether a provider API key is configured.
/// The key itself is never echoed.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let api_key = if state.config.api_key_configured() {
        "configured"
    } else {
        "missing"
    };

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "apiKey": api_key
    }))
}
