//! Structure editing operations, available only in the editing step.
//!
//! Edits target skills by display position. Skill names stay unique within
//! the rubric because scores are keyed by name; renaming a skill therefore
//! orphans any score recorded under the old name.

use serde::Deserialize;

use crate::assessment::workflow::AssessmentSession;
use crate::errors::AppError;
use crate::models::assessment::{Skill, SkillCategory, WorkflowStep};

const PLACEHOLDER_NAME: &str = "New Skill";
const PLACEHOLDER_MAX_SCORE: u32 = 10;

/// Partial update for one skill. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<SkillCategory>,
    pub max_score: Option<i64>,
}

impl AssessmentSession {
    /// Appends a placeholder skill for the user to rename and describe.
    pub fn add_skill(&mut self) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Editing, "Editing the structure")?;

        let name = placeholder_name(&self.rubric.skills);
        self.rubric.skills.push(Skill {
            name,
            description: String::new(),
            category: SkillCategory::HardSkills,
            max_score: PLACEHOLDER_MAX_SCORE,
            user_score: None,
        });
        Ok(())
    }

    /// Removes the skill at `index`. Positions past the end are an error.
    pub fn remove_skill(&mut self, index: usize) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Editing, "Editing the structure")?;

        if index >= self.rubric.skills.len() {
            return Err(AppError::SkillIndex(index));
        }
        self.rubric.skills.remove(index);
        Ok(())
    }

    /// Applies a partial update to the skill at `index`. The whole patch is
    /// validated before any field changes, so a rejected patch changes
    /// nothing.
    pub fn update_skill(&mut self, index: usize, patch: SkillPatch) -> Result<(), AppError> {
        self.require_step(WorkflowStep::Editing, "Editing the structure")?;

        if index >= self.rubric.skills.len() {
            return Err(AppError::SkillIndex(index));
        }

        let name = match &patch.name {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(
                        "Skill name must not be empty".to_string(),
                    ));
                }
                let taken = self
                    .rubric
                    .skills
                    .iter()
                    .enumerate()
                    .any(|(i, s)| i != index && s.name == trimmed);
                if taken {
                    return Err(AppError::Validation(format!(
                        "A skill named '{trimmed}' already exists"
                    )));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        let max_score = match patch.max_score {
            Some(raw) => {
                if raw < 1 {
                    return Err(AppError::Validation(format!(
                        "maxScore must be at least 1, got {raw}"
                    )));
                }
                let bounded = u32::try_from(raw)
                    .map_err(|_| AppError::Validation(format!("maxScore {raw} is out of range")))?;
                Some(bounded)
            }
            None => None,
        };

        let skill = &mut self.rubric.skills[index];
        if let Some(name) = name {
            skill.name = name;
        }
        if let Some(description) = patch.description {
            skill.description = description;
        }
        if let Some(category) = patch.category {
            skill.category = category;
        }
        if let Some(max_score) = max_score {
            skill.max_score = max_score;
        }
        Ok(())
    }
}

/// First free placeholder name: "New Skill", then "New Skill 2", and so on.
fn placeholder_name(skills: &[Skill]) -> String {
    let mut candidate = PLACEHOLDER_NAME.to_string();
    let mut n = 2;
    while skills.iter().any(|s| s.name == candidate) {
        candidate = format!("{PLACEHOLDER_NAME} {n}");
        n += 1;
    }
    candidate
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
