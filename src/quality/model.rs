/*!
 * Records and assessment results exchanged with the content store, the model and
 * API clients. All wire names are camelCase.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One unit of English source text with its Sinhala and Tamil translations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    /// Identifier in the content store; string or number on the wire
    #[serde(default, alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub sinhala: String,
    #[serde(default)]
    pub tamil: String,
    /// Where the text appears (page, component)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TranslationRecord {
    pub fn new(
        id: impl Into<String>,
        english: impl Into<String>,
        sinhala: impl Into<String>,
        tamil: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            english: english.into(),
            sinhala: sinhala.into(),
            tamil: tamil.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

/// A single problem the model found in a translation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default, alias = "type")]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    /// Offending snippet
    #[serde(default)]
    pub original: String,
    #[serde(default, alias = "suggestedFix")]
    pub suggestion: String,
    /// Why it is a problem
    #[serde(default, alias = "rationale")]
    pub explanation: String,
}

/// Corrected target texts proposed by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EnhancedTranslation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinhala: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamil: Option<String>,
}

impl EnhancedTranslation {
    /// True when neither language carries any non-blank text
    pub fn is_empty(&self) -> bool {
        let blank = |text: &Option<String>| text.as_deref().is_none_or(|t| t.trim().is_empty());
        blank(&self.sinhala) && blank(&self.tamil)
    }
}

/// The model's critique of one record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityAnalysis {
    /// 0 to 100
    pub quality_score: f64,
    #[serde(default)]
    pub issues: Vec<Issue>,
    pub enhanced_translation: EnhancedTranslation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Any further fields the model returned, passed through untouched
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Timing and provenance of one adapter call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentMetadata {
    /// Milliseconds spent in the provider call
    pub response_time: u64,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one adapter call; failures are values, never errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<QualityAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: AssessmentMetadata,
}

impl AssessmentResult {
    pub fn succeeded(analysis: QualityAnalysis, metadata: AssessmentMetadata) -> Self {
        Self {
            success: true,
            analysis: Some(analysis),
            error: None,
            metadata,
        }
    }

    pub fn failed(error: impl Into<String>, metadata: AssessmentMetadata) -> Self {
        Self {
            success: false,
            analysis: None,
            error: Some(error.into()),
            metadata,
        }
    }

    /// Score of a successful assessment
    pub fn score(&self) -> Option<f64> {
        self.analysis.as_ref().map(|a| a.quality_score)
    }
}
