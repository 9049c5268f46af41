pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::gateway::handlers as gateway;
use crate::interactions::handlers as interactions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_handler))
        // Assistant gateway
        .route("/api/chat", post(gateway::handle_chat))
        .route("/api/analyze-job", post(gateway::handle_analyze_job))
        .route(
            "/api/resume-feedback",
            post(gateway::handle_resume_feedback),
        )
        .route(
            "/api/interview-prep",
            post(gateway::handle_interview_prep),
        )
        // Job interactions
        .route(
            "/api/jobs/applied",
            get(interactions::handle_list_applied).post(interactions::handle_apply),
        )
        .route(
            "/api/jobs/favorites",
            get(interactions::handle_list_favorites).post(interactions::handle_toggle_favorite),
        )
        // Per-user settings
        .route(
            "/api/settings",
            get(interactions::handle_get_settings).put(interactions::handle_put_settings),
        )
        .with_state(state)
}
