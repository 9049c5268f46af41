use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::gateway::prompts::{
    ANALYZE_JOB_TEMPLATE, INTERVIEW_PREP_TEMPLATE, RESUME_FEEDBACK_TEMPLATE, SYSTEM_PROMPT,
};
use crate::models::chat::ChatTurn;
use crate::prompt::{
    self, truncate_to_fit, RESUME_BUDGET, RESUME_RESERVE, STANDARD_BUDGET, STANDARD_RESERVE,
};
use crate::state::AppState;

// Request fields are Option so a missing field reaches our validation and
// returns 400 with the contractual message, not axum's 422 rejection.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub job_context: Option<String>,
    /// Option so an explicit JSON `null` reads like an omitted list.
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatTurn>>,
    pub user_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobRequest {
    pub job_description: Option<String>,
    pub user_skills: Option<String>,
    pub experience_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFeedbackRequest {
    pub resume_content: Option<String>,
    pub job_description: Option<String>,
    pub target_role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewPrepRequest {
    pub job_description: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub user_experience: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PreparationResponse {
    pub preparation: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Unwraps a required request field, treating blank strings as missing.
fn required(field: &Option<String>, message: &str) -> Result<String, AppError> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

fn optional_or(field: &Option<String>, fallback: &str) -> String {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => fallback.to_string(),
    }
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = required(&req.message, "Message is required")?;
    let history = req.conversation_history.unwrap_or_default();

    let prompt = prompt::assemble(
        &message,
        req.job_context.as_deref(),
        req.user_profile.as_deref(),
        &history,
    );

    let completion = state
        .provider
        .complete(SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|err| AppError::llm("Failed to get AI response", err))?;

    Ok(Json(ChatResponse {
        content: completion.text,
        model: state.provider.model().to_string(),
        timestamp: Utc::now(),
    }))
}

/// POST /api/analyze-job
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeJobRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let job_description = required(&req.job_description, "Job description is required")?;

    let prompt = ANALYZE_JOB_TEMPLATE
        .replace(
            "{job_description}",
            &truncate_to_fit(&job_description, STANDARD_BUDGET, STANDARD_RESERVE),
        )
        .replace("{user_skills}", &optional_or(&req.user_skills, "Not specified"))
        .replace(
            "{experience_level}",
            &optional_or(&req.experience_level, "Not specified"),
        );

    let completion = state
        .provider
        .complete(SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|err| AppError::llm("Failed to analyze job", err))?;

    Ok(Json(AnalysisResponse {
        analysis: completion.text,
        model: state.provider.model().to_string(),
        timestamp: Utc::now(),
    }))
}

/// POST /api/resume-feedback
pub async fn handle_resume_feedback(
    State(state): State<AppState>,
    Json(req): Json<ResumeFeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let missing = "Resume content, job description, and target role are required";
    let resume_content = required(&req.resume_content, missing)?;
    let job_description = required(&req.job_description, missing)?;
    let target_role = required(&req.target_role, missing)?;

    // Resume text dominates the payload, so it gets the aggressive budget.
    let prompt = RESUME_FEEDBACK_TEMPLATE
        .replace(
            "{resume_content}",
            &truncate_to_fit(&resume_content, RESUME_BUDGET, RESUME_RESERVE),
        )
        .replace(
            "{job_description}",
            &truncate_to_fit(&job_description, STANDARD_BUDGET, STANDARD_RESERVE),
        )
        .replace("{target_role}", &target_role);

    let completion = state
        .provider
        .complete(SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|err| AppError::llm("Failed to generate resume feedback", err))?;

    Ok(Json(FeedbackResponse {
        feedback: completion.text,
        model: state.provider.model().to_string(),
        timestamp: Utc::now(),
    }))
}

/// POST /api/interview-prep
pub async fn handle_interview_prep(
    State(state): State<AppState>,
    Json(req): Json<InterviewPrepRequest>,
) -> Result<Json<PreparationResponse>, AppError> {
    let missing = "Job description, role, and company are required";
    let job_description = required(&req.job_description, missing)?;
    let role = required(&req.role, missing)?;
    let company = required(&req.company, missing)?;

    let prompt = INTERVIEW_PREP_TEMPLATE
        .replace(
            "{job_description}",
            &truncate_to_fit(&job_description, STANDARD_BUDGET, STANDARD_RESERVE),
        )
        .replace("{role}", &role)
        .replace("{company}", &company)
        .replace(
            "{user_experience}",
            &optional_or(&req.user_experience, "Not specified"),
        );

    let completion = state
        .provider
        .complete(SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|err| AppError::llm("Failed to generate interview preparation", err))?;

    Ok(Json(PreparationResponse {
        preparation: completion.text,
        model: state.provider.model().to_string(),
        timestamp: Utc::now(),
    }))
}
