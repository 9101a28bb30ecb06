//! AI collaborator boundary for the assessment workflow.
//!
//! The workflow talks to the collaborator through [`AssessmentAi`] only.
//! [`GeminiClient`] is the production implementation; tests substitute a
//! scripted one. Raw model output is decoded and normalized here, so
//! malformed content is rejected before it can reach session state.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::gemini::prompts;
use crate::gemini::{GeminiClient, GenerationConfig, ThinkingConfig};
use crate::models::assessment::{EmployeeIdentity, Skill, SkillCategory};
use crate::models::report::Evaluation;

/// Thinking budget for structure generation. Evaluation runs without one.
const STRUCTURE_THINKING_BUDGET: u32 = 2048;

/// The two collaborator operations the workflow depends on.
#[async_trait]
pub trait AssessmentAi: Send + Sync {
    /// Proposes a skill structure for the given role.
    async fn generate_structure(&self, role: &str) -> Result<Vec<Skill>, AppError>;

    /// Evaluates scored skills into a narrative assessment.
    async fn evaluate(
        &self,
        employee: &EmployeeIdentity,
        role: &str,
        skills: &[Skill],
    ) -> Result<Evaluation, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Raw model output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawStructure {
    skills: Vec<RawSkill>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSkill {
    name: String,
    #[serde(default)]
    description: String,
    category: SkillCategory,
    max_score: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    summary: String,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    recommendations: Vec<String>,
    training_recommendations: Vec<String>,
    overall_score: f64,
}

/// Validates and normalizes a generated structure. Skills with empty names
/// or non-positive score bounds are rejected outright; duplicate names keep
/// the first occurrence. An empty result is an error: the workflow must
/// never enter editing with nothing to edit.
fn decode_structure(raw: RawStructure) -> Result<Vec<Skill>, AppError> {
    let mut skills: Vec<Skill> = Vec::with_capacity(raw.skills.len());

    for entry in raw.skills {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(AppError::Generation(
                "generated structure contains a skill with an empty name".to_string(),
            ));
        }
        if entry.max_score < 1 {
            return Err(AppError::Generation(format!(
                "generated skill '{}' has a non-positive maxScore ({})",
                name, entry.max_score
            )));
        }
        let max_score = u32::try_from(entry.max_score).map_err(|_| {
            AppError::Generation(format!(
                "generated skill '{}' has an out-of-range maxScore ({})",
                name, entry.max_score
            ))
        })?;

        if skills.iter().any(|s: &Skill| s.name == name) {
            warn!("Generated structure repeats skill '{}', keeping the first occurrence", name);
            continue;
        }

        skills.push(Skill {
            name: name.to_string(),
            description: entry.description,
            category: entry.category,
            max_score,
            user_score: None,
        });
    }

    if skills.is_empty() {
        return Err(AppError::Generation(
            "generated structure contains no skills".to_string(),
        ));
    }

    Ok(skills)
}

/// Normalizes a raw evaluation. The overall score is rounded to the nearest
/// integer and clamped to 0..=100 rather than rejected; everything else
/// passes through as-is.
fn decode_evaluation(raw: RawEvaluation) -> Evaluation {
    let rounded = raw.overall_score.round();
    let overall_score = if (0.0..=100.0).contains(&rounded) {
        rounded as u32
    } else {
        warn!(
            "Evaluation overallScore {} outside 0..=100, clamping",
            raw.overall_score
        );
        rounded.clamp(0.0, 100.0) as u32
    };

    Evaluation {
        summary: raw.summary,
        strengths: raw.strengths,
        weaknesses: raw.weaknesses,
        recommendations: raw.recommendations,
        training_recommendations: raw.training_recommendations,
        overall_score,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini-backed implementation
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AssessmentAi for GeminiClient {
    async fn generate_structure(&self, role: &str) -> Result<Vec<Skill>, AppError> {
        let prompt = prompts::STRUCTURE_PROMPT_TEMPLATE.replace("{role}", role);

        let raw: RawStructure = self
            .generate_json(
                &prompt,
                prompts::STRUCTURE_SYSTEM,
                GenerationConfig {
                    thinking_config: Some(ThinkingConfig {
                        thinking_budget: STRUCTURE_THINKING_BUDGET,
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        decode_structure(raw)
    }

    async fn evaluate(
        &self,
        employee: &EmployeeIdentity,
        role: &str,
        skills: &[Skill],
    ) -> Result<Evaluation, AppError> {
        let skills_json = serde_json::to_string_pretty(skills)
            .map_err(|e| AppError::Evaluation(format!("Failed to encode skills: {e}")))?;

        let prompt = prompts::EVALUATION_PROMPT_TEMPLATE
            .replace("{employee_name}", &employee.name)
            .replace("{role}", role)
            .replace("{skills_json}", &skills_json);

        let raw: RawEvaluation = self
            .generate_json(
                &prompt,
                prompts::EVALUATION_SYSTEM,
                GenerationConfig {
                    response_schema: Some(prompts::evaluation_response_schema()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| AppError::Evaluation(e.to_string()))?;

        Ok(decode_evaluation(raw))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_raw_skill(name: &str) -> RawSkill {
        RawSkill {
            name: name.to_string(),
            description: format!("{name} proficiency"),
            category: SkillCategory::HardSkills,
            max_score: 10,
        }
    }

    fn make_raw_evaluation(overall_score: f64) -> RawEvaluation {
        RawEvaluation {
            summary: "Solid performance overall.".to_string(),
            strengths: vec!["SQL".to_string()],
            weaknesses: vec!["Delegation".to_string()],
            recommendations: vec!["Pair with senior analysts".to_string()],
            training_recommendations: vec!["Advanced SQL course".to_string()],
            overall_score,
        }
    }

    #[test]
    fn test_decode_structure_accepts_valid_skills() {
        let raw = RawStructure {
            skills: vec![make_raw_skill("SQL"), make_raw_skill("Communication")],
        };
        let skills = decode_structure(raw).unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].name, "SQL");
        assert_eq!(skills[0].max_score, 10);
        assert!(skills[0].user_score.is_none());
    }

    #[test]
    fn test_decode_structure_trims_names() {
        let raw = RawStructure {
            skills: vec![RawSkill {
                name: "  SQL  ".to_string(),
                ..make_raw_skill("SQL")
            }],
        };
        let skills = decode_structure(raw).unwrap();
        assert_eq!(skills[0].name, "SQL");
    }

    #[test]
    fn test_decode_structure_rejects_empty_list() {
        let raw = RawStructure { skills: vec![] };
        assert!(matches!(
            decode_structure(raw),
            Err(AppError::Generation(_))
        ));
    }

    #[test]
    fn test_decode_structure_rejects_blank_name() {
        let raw = RawStructure {
            skills: vec![RawSkill {
                name: "   ".to_string(),
                ..make_raw_skill("SQL")
            }],
        };
        assert!(matches!(
            decode_structure(raw),
            Err(AppError::Generation(_))
        ));
    }

    #[test]
    fn test_decode_structure_rejects_non_positive_max_score() {
        let raw = RawStructure {
            skills: vec![RawSkill {
                max_score: 0,
                ..make_raw_skill("SQL")
            }],
        };
        assert!(matches!(
            decode_structure(raw),
            Err(AppError::Generation(_))
        ));
    }

    #[test]
    fn test_decode_structure_keeps_first_of_duplicate_names() {
        let raw = RawStructure {
            skills: vec![
                RawSkill {
                    description: "first".to_string(),
                    ..make_raw_skill("SQL")
                },
                RawSkill {
                    description: "second".to_string(),
                    ..make_raw_skill("SQL")
                },
            ],
        };
        let skills = decode_structure(raw).unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].description, "first");
    }

    #[test]
    fn test_raw_skill_description_defaults_to_empty() {
        let json = r#"{ "name": "SQL", "category": "Hard Skills", "maxScore": 10 }"#;
        let raw: RawSkill = serde_json::from_str(json).unwrap();
        assert_eq!(raw.description, "");
    }

    #[test]
    fn test_raw_structure_tolerates_extra_fields() {
        let json = r#"{
            "role": "Data Analyst",
            "skills": [{ "name": "SQL", "category": "Hard Skills", "maxScore": 10 }]
        }"#;
        let raw: RawStructure = serde_json::from_str(json).unwrap();
        assert_eq!(raw.skills.len(), 1);
    }

    #[test]
    fn test_decode_evaluation_clamps_out_of_range_scores() {
        assert_eq!(decode_evaluation(make_raw_evaluation(150.0)).overall_score, 100);
        assert_eq!(decode_evaluation(make_raw_evaluation(-5.0)).overall_score, 0);
        assert_eq!(decode_evaluation(make_raw_evaluation(70.0)).overall_score, 70);
    }

    #[test]
    fn test_decode_evaluation_rounds_fractional_scores() {
        assert_eq!(decode_evaluation(make_raw_evaluation(70.5)).overall_score, 71);
        assert_eq!(decode_evaluation(make_raw_evaluation(69.4)).overall_score, 69);
        assert_eq!(decode_evaluation(make_raw_evaluation(99.7)).overall_score, 100);
    }

    #[test]
    fn test_raw_evaluation_accepts_fractional_overall_score() {
        let json = r#"{
            "summary": "Solid performance overall.",
            "strengths": ["SQL"],
            "weaknesses": ["Delegation"],
            "recommendations": ["Pair with senior analysts"],
            "trainingRecommendations": ["Advanced SQL course"],
            "overallScore": 70.5
        }"#;
        let raw: RawEvaluation = serde_json::from_str(json).unwrap();
        assert_eq!(raw.overall_score, 70.5);
    }

    #[test]
    fn test_raw_evaluation_requires_all_fields() {
        let json = r#"{ "summary": "ok", "overallScore": 70 }"#;
        assert!(serde_json::from_str::<RawEvaluation>(json).is_err());
    }
}
