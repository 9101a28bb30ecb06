pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::assessment::handlers;
use crate::chat;
use crate::images;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment sessions
        .route("/api/v1/assessments", post(handlers::handle_create_session))
        .route(
            "/api/v1/assessments/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/assessments/:id/start", post(handlers::handle_start))
        // Structure editing
        .route(
            "/api/v1/assessments/:id/skills",
            post(handlers::handle_add_skill),
        )
        .route(
            "/api/v1/assessments/:id/skills/:index",
            patch(handlers::handle_update_skill).delete(handlers::handle_remove_skill),
        )
        .route(
            "/api/v1/assessments/:id/confirm",
            post(handlers::handle_confirm_structure),
        )
        .route(
            "/api/v1/assessments/:id/revise",
            post(handlers::handle_revise_structure),
        )
        // Scoring and submission
        .route(
            "/api/v1/assessments/:id/scores",
            put(handlers::handle_set_score),
        )
        .route(
            "/api/v1/assessments/:id/submit",
            post(handlers::handle_submit),
        )
        .route(
            "/api/v1/assessments/:id/reset",
            post(handlers::handle_reset),
        )
        // Collaborator extras
        .route("/api/v1/images", post(images::handle_generate_image))
        .route("/api/v1/chat/stream", post(chat::handle_chat_stream))
        .with_state(state)
}
