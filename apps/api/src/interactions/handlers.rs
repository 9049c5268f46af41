use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::models::job::{AppliedJobRecord, FavoriteJobRecord, Job};
use crate::models::settings::UserSettings;
use crate::models::user::UserId;
use crate::state::AppState;
use crate::store::RecordKind;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

/// Body for the apply and favorite-toggle endpoints. The job is taken as a
/// raw value so legacy field spellings are folded into the canonical shape
/// during validation rather than rejected by the extractor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobActionRequest {
    pub user_id: Option<String>,
    pub job: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateRequest {
    pub user_id: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    /// False when this (user, job) application already existed.
    pub newly_applied: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    /// The state after the toggle.
    pub favorited: bool,
}

fn require_user(user_id: &Option<String>) -> Result<UserId, AppError> {
    match user_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(UserId::new(id)),
        _ => Err(AppError::Validation("User id is required".to_string())),
    }
}

fn require_job(job: Option<Value>) -> Result<Job, AppError> {
    let value = job.ok_or_else(|| AppError::Validation("Job is required".to_string()))?;
    let job: Job = serde_json::from_value(value)
        .map_err(|err| AppError::Validation(format!("Invalid job payload: {err}")))?;
    if job.link.trim().is_empty() {
        return Err(AppError::Validation("Job link is required".to_string()));
    }
    Ok(job)
}

/// POST /api/jobs/applied
pub async fn handle_apply(
    State(state): State<AppState>,
    Json(req): Json<JobActionRequest>,
) -> Result<Json<ApplyResponse>, AppError> {
    let user = require_user(&req.user_id)?;
    let job = require_job(req.job)?;
    let newly_applied = state.interactions.apply_to_job(&user, &job).await?;
    Ok(Json(ApplyResponse { newly_applied }))
}

/// GET /api/jobs/applied?userId=...
pub async fn handle_list_applied(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<AppliedJobRecord>>, AppError> {
    let user = require_user(&params.user_id)?;
    Ok(Json(state.interactions.applied_jobs(&user).await?))
}

/// POST /api/jobs/favorites
pub async fn handle_toggle_favorite(
    State(state): State<AppState>,
    Json(req): Json<JobActionRequest>,
) -> Result<Json<FavoriteResponse>, AppError> {
    let user = require_user(&req.user_id)?;
    let job = require_job(req.job)?;
    let favorited = state.interactions.toggle_favorite(&user, &job).await?;
    Ok(Json(FavoriteResponse { favorited }))
}

/// GET /api/jobs/favorites?userId=...
pub async fn handle_list_favorites(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<FavoriteJobRecord>>, AppError> {
    let user = require_user(&params.user_id)?;
    Ok(Json(state.interactions.favorite_jobs(&user).await?))
}

/// GET /api/settings?userId=...
///
/// A user with no settings document gets the defaults, not a 404; the first
/// PUT creates the document.
pub async fn handle_get_settings(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UserSettings>, AppError> {
    let user = require_user(&params.user_id)?;
    let settings = match state.store.get(RecordKind::Settings, user.as_str()).await? {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            warn!("settings document for {user} does not match schema: {err}");
            UserSettings::default()
        }),
        None => UserSettings::default(),
    };
    Ok(Json(settings))
}

/// PUT /api/settings
///
/// The body's `settings` object is a partial patch; unmentioned fields keep
/// their stored values.
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Json(req): Json<SettingsUpdateRequest>,
) -> Result<StatusCode, AppError> {
    let user = require_user(&req.user_id)?;
    let patch = req
        .settings
        .ok_or_else(|| AppError::Validation("Settings are required".to_string()))?;
    if !patch.is_object() {
        return Err(AppError::Validation(
            "Settings payload must be a JSON object".to_string(),
        ));
    }

    state
        .store
        .upsert(RecordKind::Settings, user.as_str(), patch)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::interactions::JobInteractions;
    use crate::llm_client::testing::CannedProvider;
    use crate::routes::build_router;
    use crate::store::live::LiveStore;
    use crate::store::memory::MemoryStore;

    fn make_state() -> AppState {
        let store = Arc::new(LiveStore::new(Arc::new(MemoryStore::new())));
        AppState {
            store: store.clone(),
            interactions: JobInteractions::new(store),
            provider: Arc::new(CannedProvider::new("unused")),
            config: Config {
                database_url: "postgres://unused".to_string(),
                anthropic_api_key: "test-key".to_string(),
                port: 8080,
                rust_log: "info".to_string(),
            },
        }
    }

    async fn request(
        state: &AppState,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_apply_roundtrip_and_idempotency() {
        let state = make_state();
        let body = json!({
            "userId": "u1",
            "job": { "link": "https://jobs/1", "title": "Engineer", "company": "Acme" }
        });

        let (status, value) = request(&state, Method::POST, "/api/jobs/applied", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({ "newlyApplied": true }));

        // second apply is a no-op
        let (status, value) = request(&state, Method::POST, "/api/jobs/applied", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({ "newlyApplied": false }));

        let (status, listed) =
            request(&state, Method::GET, "/api/jobs/applied?userId=u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["link"], "https://jobs/1");
        assert_eq!(listed[0]["userId"], "u1");
    }

    #[tokio::test]
    async fn test_favorite_toggle_over_http() {
        let state = make_state();
        let body = json!({
            "userId": "u1",
            "job": { "link": "https://jobs/2", "title": "Architect" }
        });

        let (_, value) =
            request(&state, Method::POST, "/api/jobs/favorites", Some(body.clone())).await;
        assert_eq!(value, json!({ "favorited": true }));

        let (_, value) = request(&state, Method::POST, "/api/jobs/favorites", Some(body)).await;
        assert_eq!(value, json!({ "favorited": false }));

        let (_, listed) = request(&state, Method::GET, "/api/jobs/favorites?userId=u1", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_id_is_rejected() {
        let state = make_state();
        let (status, value) = request(
            &state,
            Method::POST,
            "/api/jobs/applied",
            Some(json!({ "job": { "link": "https://jobs/1" } })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({ "error": "User id is required" }));
    }

    #[tokio::test]
    async fn test_job_without_link_is_rejected() {
        let state = make_state();
        let (status, value) = request(
            &state,
            Method::POST,
            "/api/jobs/favorites",
            Some(json!({ "userId": "u1", "job": { "link": "  " } })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({ "error": "Job link is required" }));
    }

    #[tokio::test]
    async fn test_legacy_job_fields_are_canonicalized() {
        let state = make_state();
        let body = json!({
            "userId": "u1",
            "job": {
                "url": "https://jobs/legacy",
                "Title": "Backend Engineer",
                "Company": "Acme",
                "uploaded": "3 days ago"
            }
        });

        let (status, _) = request(&state, Method::POST, "/api/jobs/applied", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = request(&state, Method::GET, "/api/jobs/applied?userId=u1", None).await;
        assert_eq!(listed[0]["link"], "https://jobs/legacy");
        assert_eq!(listed[0]["title"], "Backend Engineer");
        assert_eq!(listed[0]["postedLabel"], "3 days ago");
    }

    #[tokio::test]
    async fn test_settings_default_then_merge_on_put() {
        let state = make_state();

        let (status, value) = request(&state, Method::GET, "/api/settings?userId=u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["profileVisible"], true);
        assert_eq!(value["displayName"], Value::Null);

        let (status, _) = request(
            &state,
            Method::PUT,
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": { "displayName": "Ada" } })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // a second partial patch must not clear the first
        let (status, _) = request(
            &state,
            Method::PUT,
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": { "phone": "555-0100" } })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, value) = request(&state, Method::GET, "/api/settings?userId=u1", None).await;
        assert_eq!(value["displayName"], "Ada");
        assert_eq!(value["phone"], "555-0100");
    }

    #[tokio::test]
    async fn test_settings_put_rejects_non_object_payload() {
        let state = make_state();
        let (status, value) = request(
            &state,
            Method::PUT,
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": ["not", "an", "object"] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({ "error": "Settings payload must be a JSON object" }));
    }
}
