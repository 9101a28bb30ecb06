//! Core domain types for one assessment run: the employee being assessed,
//! the skill rubric, and the wizard step.

use serde::{Deserialize, Serialize};

/// The person a single assessment run is about.
/// Immutable once the workflow reaches the scoring step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeIdentity {
    pub id: String,
    pub name: String,
}

/// Skill grouping used by the rubric. Exactly two buckets, matching the
/// labels the structure-generation prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillCategory {
    #[serde(rename = "Hard Skills")]
    HardSkills,
    #[serde(rename = "Soft Skills")]
    SoftSkills,
}

/// One assessable skill in the rubric.
/// `user_score`, when present, is in `0..=max_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    pub max_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_score: Option<u32>,
}

impl Skill {
    /// Copy of this skill with `user_score` filled in.
    pub fn scored(&self, score: u32) -> Skill {
        Skill {
            user_score: Some(score),
            ..self.clone()
        }
    }
}

/// The named, ordered skill set generated for a target role.
/// Order is display order only; it must stay stable across edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rubric {
    pub role: String,
    pub skills: Vec<Skill>,
}

/// Wizard step of one assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Details,
    Editing,
    Scoring,
    Result,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Details => "details",
            WorkflowStep::Editing => "editing",
            WorkflowStep::Scoring => "scoring",
            WorkflowStep::Result => "result",
        }
    }
}
