//! Evaluation output types: what the collaborator returns and the final
//! report built around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::assessment::EmployeeIdentity;

/// Structured evaluation produced by the collaborator. All six fields are
/// required; a response missing any of them is rejected at the decode
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub training_recommendations: Vec<String>,
    /// 0 to 100.
    pub overall_score: u32,
}

/// Final report for one completed assessment run. Created once, after a
/// successful evaluation; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub employee_info: EmployeeIdentity,
    pub role: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_evaluation() -> Evaluation {
        Evaluation {
            summary: "Jane Doe demonstrates a solid analytical foundation.".to_string(),
            strengths: vec!["SQL fluency".to_string()],
            weaknesses: vec!["Stakeholder communication".to_string()],
            recommendations: vec!["Present findings to wider audiences".to_string()],
            training_recommendations: vec!["Advanced SQL certification".to_string()],
            overall_score: 70,
        }
    }

    #[test]
    fn test_evaluation_deserializes_camel_case() {
        let json = r#"{
            "summary": "Solid performance overall.",
            "strengths": ["SQL"],
            "weaknesses": ["Presentation skills"],
            "recommendations": ["Shadow a senior analyst"],
            "trainingRecommendations": ["Data storytelling course"],
            "overallScore": 70
        }"#;
        let evaluation: Evaluation = serde_json::from_str(json).unwrap();
        assert_eq!(evaluation.overall_score, 70);
        assert_eq!(
            evaluation.training_recommendations,
            vec!["Data storytelling course".to_string()]
        );
    }

    #[test]
    fn test_evaluation_missing_field_is_rejected() {
        let json = r#"{
            "summary": "Solid performance overall.",
            "strengths": ["SQL"],
            "weaknesses": ["Presentation skills"],
            "recommendations": ["Shadow a senior analyst"],
            "overallScore": 70
        }"#;
        assert!(serde_json::from_str::<Evaluation>(json).is_err());
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = Report {
            employee_info: EmployeeIdentity {
                id: "EMP-001".to_string(),
                name: "Jane Doe".to_string(),
            },
            role: "Data Analyst".to_string(),
            generated_at: Utc::now(),
            evaluation: make_evaluation(),
        };
        let json = serde_json::to_value(&report).unwrap();
        // Evaluation fields sit at the top level next to the run metadata.
        assert_eq!(json["employeeInfo"]["id"], "EMP-001");
        assert_eq!(json["role"], "Data Analyst");
        assert_eq!(json["overallScore"], 70);
        assert!(json["summary"].is_string());
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("evaluation").is_none());
    }
}
