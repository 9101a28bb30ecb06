// All prompt constants for the Gemini collaborator.
// Templates carry `{placeholder}` markers filled with str::replace before sending.

/// System instruction for skill-structure generation. Enforces JSON-only output.
pub const STRUCTURE_SYSTEM: &str =
    "You are an expert HR analyst designing skill assessments. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Structure generation prompt template. Replace `{role}` before sending.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Generate a skill assessment structure for the role of "{role}".

Return a JSON object with this EXACT schema (no extra fields):
{
  "role": "{role}",
  "skills": [
    {
      "name": "SQL",
      "description": "Ability to write and optimize relational queries",
      "category": "Hard Skills",
      "maxScore": 10
    }
  ]
}

Rules:
- Produce 5 to 7 skills that are key for this role.
- Include a mix of "Hard Skills" and "Soft Skills"; category must be exactly one of those two labels.
- Give each skill a brief one-sentence description.
- Use a maxScore of 10 for every skill.
- Skill names must be unique within the list."#;

/// System instruction for assessment evaluation. Enforces JSON-only output.
pub const EVALUATION_SYSTEM: &str =
    "You are an expert HR evaluator writing constructive, professional \
    assessment reports. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Evaluation prompt template.
/// Replace: {employee_name}, {role}, {skills_json}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Analyze the following skill assessment of {employee_name} for the role of "{role}".

SCORED SKILLS (userScore is what {employee_name} scored, out of maxScore):
{skills_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "Two to three sentence overview of the assessment",
  "strengths": ["..."],
  "weaknesses": ["..."],
  "recommendations": ["..."],
  "trainingRecommendations": ["..."],
  "overallScore": 70
}

Rules:
- Refer to {employee_name} by name, in the third person.
- overallScore is an integer from 0 to 100 derived from the scores relative to their maximums.
- trainingRecommendations should name concrete courses, certifications, or practice areas.
- Every array must contain at least one entry."#;

/// System instruction for the consultant chat.
pub const CHAT_SYSTEM: &str =
    "You are a helpful and knowledgeable HR and Career Consultant assistant \
    within the SkillArchitect app. Keep your answers professional yet \
    conversational.";

/// Response schema pinned on evaluation calls so the model cannot omit any
/// of the six report fields.
pub fn evaluation_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "weaknesses": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "trainingRecommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            // NUMBER, not INTEGER: fractional scores appear occasionally
            // and the decoder rounds them.
            "overallScore": { "type": "NUMBER" }
        },
        "required": [
            "summary",
            "strengths",
            "weaknesses",
            "recommendations",
            "trainingRecommendations",
            "overallScore"
        ]
    })
}
