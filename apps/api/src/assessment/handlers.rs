use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::assessment::editor::SkillPatch;
use crate::assessment::sessions::SharedSession;
use crate::assessment::workflow::SessionSnapshot;
use crate::errors::AppError;
use crate::models::assessment::EmployeeIdentity;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub employee_id: String,
    pub employee_name: String,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScoreRequest {
    pub skill_name: String,
    pub score: i64,
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Assessment session {id} not found")))
}

/// POST /api/v1/assessments
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.create().await;
    let session = session.lock().await;
    Ok(Json(session.snapshot()))
}

/// GET /api/v1/assessments/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/v1/assessments/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(id).await {
        return Err(AppError::NotFound(format!(
            "Assessment session {id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/assessments/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StartRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session
        .start(
            state.ai.as_ref(),
            &state.guard,
            EmployeeIdentity {
                id: req.employee_id,
                name: req.employee_name,
            },
            &req.role,
        )
        .await?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/assessments/:id/skills
pub async fn handle_add_skill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.add_skill()?;
    Ok(Json(session.snapshot()))
}

/// PATCH /api/v1/assessments/:id/skills/:index
pub async fn handle_update_skill(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(patch): Json<SkillPatch>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.update_skill(index, patch)?;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/v1/assessments/:id/skills/:index
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.remove_skill(index)?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/assessments/:id/confirm
pub async fn handle_confirm_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.confirm_structure()?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/assessments/:id/revise
pub async fn handle_revise_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.revise_structure()?;
    Ok(Json(session.snapshot()))
}

/// PUT /api/v1/assessments/:id/scores
pub async fn handle_set_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetScoreRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let score = u32::try_from(req.score)
        .map_err(|_| AppError::Validation("Score must be a non-negative integer".to_string()))?;

    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.set_score(&req.skill_name, score)?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/assessments/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.submit(state.ai.as_ref(), &state.guard).await?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/assessments/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.reset();
    Ok(Json(session.snapshot()))
}
