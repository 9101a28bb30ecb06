use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every error is local to the operation that raised it: the workflow always
/// stays in its pre-operation state, and nothing is retried automatically.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Employee ID '{0}' has already been submitted")]
    DuplicateIdentity(String),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Skill index {0} is out of range")]
    SkillIndex(usize),

    #[error("No skill named '{0}' in the rubric")]
    UnknownSkill(String),

    #[error("Structure generation failed: {0}")]
    Generation(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Submission ledger error: {0}")]
    Ledger(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::DuplicateIdentity(id) => (
                StatusCode::CONFLICT,
                "DUPLICATE_IDENTITY",
                format!("An assessment for employee ID '{id}' has already been submitted"),
            ),
            AppError::InvalidStep(msg) => (StatusCode::CONFLICT, "INVALID_STEP", msg.clone()),
            AppError::SkillIndex(index) => (
                StatusCode::NOT_FOUND,
                "SKILL_INDEX_OUT_OF_RANGE",
                format!("Skill index {index} is out of range"),
            ),
            AppError::UnknownSkill(name) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_SKILL",
                format!("No skill named '{name}' in the rubric"),
            ),
            AppError::Generation(msg) => {
                tracing::error!("Structure generation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    "The AI collaborator failed to generate an assessment structure".to_string(),
                )
            }
            AppError::Evaluation(msg) => {
                tracing::error!("Evaluation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EVALUATION_ERROR",
                    "The AI collaborator failed to evaluate the assessment".to_string(),
                )
            }
            AppError::Ledger(msg) => {
                tracing::error!("Submission ledger error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LEDGER_ERROR",
                    "A submission ledger error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
