use std::sync::Arc;

use crate::assessment::ai::AssessmentAi;
use crate::assessment::sessions::SessionRegistry;
use crate::gemini::GeminiClient;
use crate::submissions::guard::SubmissionGuard;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub guard: Arc<SubmissionGuard>,
    /// Pluggable collaborator for the assessment workflow. Production wires
    /// in the Gemini client; tests script it.
    pub ai: Arc<dyn AssessmentAi>,
    /// Direct client for the endpoints outside the workflow (chat, images).
    pub gemini: GeminiClient,
}
