/*!
 * Prompt for the translation quality assessment.
 *
 * The system instruction fixes the reviewer role and the reply schema; the user
 * message carries the three texts and their context as a JSON document.
 */

use serde::Serialize;

/// System instruction sent with every assessment request.
pub const QUALITY_REVIEWER: &str = r#"You are an expert reviewer of English to Sinhala and English to Tamil translations for a Sri Lankan marine education website aimed at students and the general public.

## Your Role
- Judge whether each translation conveys the full meaning of the English source
- Check grammar, spelling and script correctness in Sinhala and Tamil
- Check that marine and scientific terminology uses the accepted local terms
- Check that the register suits an educational audience

## Scoring
- qualityScore is an integer from 0 (unusable) to 100 (publication ready)
- Each issue has a category (accuracy, grammar, terminology, fluency, cultural, formatting), a severity (critical, major, minor), the original snippet, a suggestion and an explanation

## Output Requirements
- Return ONLY one JSON object with this shape:
  {"qualityScore": number, "issues": [{"category": string, "severity": string, "original": string, "suggestion": string, "explanation": string}], "enhancedTranslation": {"sinhala": string, "tamil": string}, "summary": string}
- enhancedTranslation always contains your best version of both translations, even when no change is needed
- Do not include any text outside the JSON object"#;

#[derive(Serialize)]
struct AssessmentInput<'a> {
    english: &'a str,
    sinhala: &'a str,
    tamil: &'a str,
    context: &'a str,
}

/// Render the user message for one record
pub fn build_user_message(english: &str, sinhala: &str, tamil: &str, context: Option<&str>) -> String {
    let input = AssessmentInput {
        english,
        sinhala,
        tamil,
        context: context.unwrap_or("general"),
    };
    // Serializing plain string fields cannot fail
    let document = serde_json::to_string_pretty(&input).unwrap_or_default();
    format!("Assess the following translation record:\n\n{}", document)
}
