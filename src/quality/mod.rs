/*!
 * Translation quality assessment.
 *
 * - `model`: records and assessment results
 * - `extract`: pulling the assessment JSON out of a model reply
 * - `prompts`: the reviewer instruction and user message
 * - `stats`: running counters, score window and run history
 * - `assessor`: the rate-limited provider adapter
 */

pub mod assessor;
pub mod extract;
pub mod model;
pub mod prompts;
pub mod stats;

pub use assessor::{looks_like_rate_limit, AssessorSettings, QualityAssessor};
pub use extract::{extract_json_object, parse_analysis};
pub use model::{
    AssessmentMetadata, AssessmentResult, EnhancedTranslation, Issue, QualityAnalysis, TranslationRecord,
};
pub use stats::{AgentStats, AssessorStats, RingBuffer, RunSummary, StatsSnapshot};
