//! Assessment wizard state machine.
//!
//! One [`AssessmentSession`] walks the steps details -> editing -> scoring ->
//! result. Every transition is guarded by the current step, and the two
//! AI-backed transitions (start, submit) mutate session state only after the
//! collaborator call succeeds, so a failed call leaves the session exactly
//! where it was.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::assessment::ai::AssessmentAi;
use crate::errors::AppError;
use crate::models::assessment::{EmployeeIdentity, Rubric, Skill, WorkflowStep};
use crate::models::report::Report;
use crate::submissions::guard::SubmissionGuard;

/// State of one assessment run. Scores live beside the rubric, keyed by
/// skill name, so structure edits during a revision never invent or destroy
/// scores; they are re-matched by name on the way back to scoring.
pub struct AssessmentSession {
    pub id: Uuid,
    pub step: WorkflowStep,
    pub employee: Option<EmployeeIdentity>,
    pub rubric: Rubric,
    pub scores: HashMap<String, u32>,
    pub report: Option<Report>,
    pub created_at: DateTime<Utc>,
}

impl AssessmentSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: WorkflowStep::Details,
            employee: None,
            rubric: Rubric::default(),
            scores: HashMap::new(),
            report: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn require_step(&self, step: WorkflowStep, action: &str) -> Result<(), AppError> {
        if self.step != step {
            return Err(AppError::InvalidStep(format!(
                "{action} is only available in the {} step (current step: {})",
                step.as_str(),
                self.step.as_str()
            )));
        }
        Ok(())
    }

    /// Begins the run: validates the details, checks the submission ledger,
    /// and asks the collaborator for a skill structure. The session moves to
    /// editing only if all of that succeeds.
    pub async fn start(
        &mut self,
        ai: &dyn AssessmentAi,
        guard: &SubmissionGuard,
        employee: EmployeeIdentity,
        role: &str,
    ) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Details, "Starting an assessment")?;

        let employee_id = employee.id.trim();
        let employee_name = employee.name.trim();
        let role = role.trim();
        if employee_id.is_empty() {
            return Err(AppError::Validation("Employee ID must not be empty".to_string()));
        }
        if employee_name.is_empty() {
            return Err(AppError::Validation("Employee name must not be empty".to_string()));
        }
        if role.is_empty() {
            return Err(AppError::Validation("Role must not be empty".to_string()));
        }

        if guard.contains(employee_id).await? {
            return Err(AppError::DuplicateIdentity(employee_id.to_string()));
        }

        let skills = ai.generate_structure(role).await?;

        info!(
            "Assessment {} started for role '{}' with {} generated skills",
            self.id,
            role,
            skills.len()
        );

        self.employee = Some(EmployeeIdentity {
            id: employee_id.to_string(),
            name: employee_name.to_string(),
        });
        self.rubric = Rubric {
            role: role.to_string(),
            skills,
        };
        self.step = WorkflowStep::Editing;
        Ok(())
    }

    /// Accepts the current structure as-is and moves to scoring.
    pub fn confirm_structure(&mut self) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Editing, "Confirming the structure")?;
        self.step = WorkflowStep::Scoring;
        Ok(())
    }

    /// Reopens the structure for editing. Scores entered so far are kept and
    /// re-applied by skill name when scoring resumes.
    pub fn revise_structure(&mut self) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Scoring, "Revising the structure")?;
        self.step = WorkflowStep::Editing;
        Ok(())
    }

    /// Records a score for one skill. The score must be within the skill's
    /// bound; out-of-range values are rejected, not clamped.
    pub fn set_score(&mut self, skill_name: &str, score: u32) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Scoring, "Scoring")?;

        let skill = self
            .rubric
            .skills
            .iter()
            .find(|s| s.name == skill_name)
            .ok_or_else(|| AppError::UnknownSkill(skill_name.to_string()))?;

        if score > skill.max_score {
            return Err(AppError::Validation(format!(
                "Score {score} exceeds the maximum of {} for skill '{}'",
                skill.max_score, skill.name
            )));
        }

        self.scores.insert(skill.name.clone(), score);
        Ok(())
    }

    /// Rubric skills with their recorded scores filled in. Unscored skills
    /// default to 0. A recorded score above its skill's current bound (the
    /// bound was lowered during a revision) fails validation here, before
    /// any collaborator call.
    fn scored_skills(&self) -> Result<Vec<Skill>, AppError> {
        self.rubric
            .skills
            .iter()
            .map(|skill| {
                let score = self.scores.get(&skill.name).copied().unwrap_or(0);
                if score > skill.max_score {
                    return Err(AppError::Validation(format!(
                        "Recorded score {score} for skill '{}' exceeds its current maximum of {}",
                        skill.name, skill.max_score
                    )));
                }
                Ok(skill.scored(score))
            })
            .collect()
    }

    /// Finalizes the run: evaluates the scored rubric and records the
    /// submission. The ledger entry and the result step commit together;
    /// any failure leaves the session in scoring and the ledger untouched.
    pub async fn submit(
        &mut self,
        ai: &dyn AssessmentAi,
        guard: &SubmissionGuard,
    ) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Scoring, "Submitting")?;

        let employee = self
            .employee
            .clone()
            .ok_or_else(|| anyhow::anyhow!("session reached scoring with no employee"))?;
        let skills = self.scored_skills()?;

        let ticket = guard.begin(&employee.id).await?;
        let evaluation = ai.evaluate(&employee, &self.rubric.role, &skills).await?;
        ticket.commit().await?;

        info!(
            "Assessment {} submitted for employee {} (overall score {})",
            self.id, employee.id, evaluation.overall_score
        );

        self.report = Some(Report {
            employee_info: employee,
            role: self.rubric.role.clone(),
            generated_at: Utc::now(),
            evaluation,
        });
        self.step = WorkflowStep::Result;
        Ok(())
    }

    /// Returns the session to a blank details step. The submission ledger is
    /// never touched: a submitted employee stays submitted.
    pub fn reset(&mut self) {
        self.employee = None;
        self.rubric = Rubric::default();
        self.scores.clear();
        self.report = None;
        self.step = WorkflowStep::Details;
    }

    /// Client-facing view of the session, with recorded scores merged into
    /// the rubric skills.
    pub fn snapshot(&self) -> SessionSnapshot {
        let skills = self
            .rubric
            .skills
            .iter()
            .map(|skill| Skill {
                user_score: self.scores.get(&skill.name).copied(),
                ..skill.clone()
            })
            .collect();

        SessionSnapshot {
            session_id: self.id,
            step: self.step,
            created_at: self.created_at,
            employee_info: self.employee.clone(),
            rubric: Rubric {
                role: self.rubric.role.clone(),
                skills,
            },
            report: self.report.clone(),
        }
    }
}

impl Default for AssessmentSession {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON view of a session returned by every session endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub step: WorkflowStep,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_info: Option<EmployeeIdentity>,
    pub rubric: Rubric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
