//! Illustration endpoint: one prompt in, one finished image out.
//!
//! The response body is the decoded image itself, served under whatever
//! MIME type the model reports. No intermediate previews and no streaming;
//! a failed generation is surfaced as an error with nothing to retry
//! automatically.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use base64::prelude::*;
use serde::Deserialize;

use crate::errors::AppError;
use crate::gemini::ImageSize;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub size: ImageSize,
}

/// POST /api/v1/images
pub async fn handle_generate_image(
    State(state): State<AppState>,
    Json(req): Json<ImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt must not be empty".to_string()));
    }

    let image = state
        .gemini
        .generate_image(&req.prompt, req.size)
        .await
        .map_err(|e| AppError::Generation(e.to_string()))?;

    let bytes = BASE64_STANDARD
        .decode(image.data.as_bytes())
        .map_err(|e| AppError::Generation(format!("Image payload was not valid base64: {e}")))?;

    Ok(([(header::CONTENT_TYPE, image.mime_type)], bytes))
}
