// Assessment wizard: session state machine, structure editing, scoring,
// and submission. All collaborator calls go through the AssessmentAi trait,
// backed by the gemini module.

pub mod ai;
pub mod editor;
pub mod handlers;
pub mod sessions;
pub mod workflow;
