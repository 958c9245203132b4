/*!
 * Locating and decoding the assessment JSON inside a free-text model reply.
 *
 * Models wrap the object in prose or code fences, and sometimes emit more than
 * one object. The extractor walks the text once, counting braces outside of
 * string literals, and returns the first balanced `{...}` span. Trailing prose
 * and later objects are never swallowed.
 */

use serde_json::Value;

use crate::errors::AssessmentError;
use super::model::QualityAnalysis;

/// Return the first balanced JSON object in `text`, if any
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(len) = balanced_end(&text[start..]) {
            return Some(&text[start..start + len]);
        }
        search_from = start + 1;
    }

    None
}

/// Byte length of the balanced object starting at `text[0] == '{'`
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode the assessment embedded in a model reply.
///
/// The reply must contain a JSON object carrying a numeric `qualityScore` and an
/// `enhancedTranslation` object. The score is clamped to 0..=100.
pub fn parse_analysis(reply: &str) -> Result<QualityAnalysis, AssessmentError> {
    let raw = extract_json_object(reply).ok_or(AssessmentError::NoJsonFound)?;
    let value: Value = serde_json::from_str(raw).map_err(|e| AssessmentError::InvalidJson(e.to_string()))?;

    if !value.get("qualityScore").is_some_and(Value::is_number) {
        return Err(AssessmentError::MissingField("qualityScore"));
    }
    if !value.get("enhancedTranslation").is_some_and(Value::is_object) {
        return Err(AssessmentError::MissingField("enhancedTranslation"));
    }

    let mut analysis: QualityAnalysis =
        serde_json::from_value(value).map_err(|e| AssessmentError::InvalidJson(e.to_string()))?;
    analysis.quality_score = analysis.quality_score.clamp(0.0, 100.0);
    Ok(analysis)
}
