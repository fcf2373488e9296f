//! Artifact types carried by the metadata envelope, with their shape rules.
//!
//! Field names serialize in the wire form the client consumes
//! (`correctIndex`, `starterCode`, `progressUpdate`, ...). Validation lives
//! next to the types so generators and the aggregator share one set of rules.

use crate::error::SchemaViolation;
use serde::{Deserialize, Serialize};

/// Difficulty tier of one assessment question. Ordered so a batch can be
/// checked for non-decreasing progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionTier {
    Basic,
    Intermediate,
    #[serde(alias = "contextual")]
    Applied,
}

/// One multiple-choice question: exactly 4 options, 0-based answer index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<QuestionTier>,
}

pub const QUIZ_OPTION_COUNT: usize = 4;

impl QuizQuestion {
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.question.trim().is_empty() {
            return Err(SchemaViolation::new("quiz question text is empty"));
        }
        if self.options.len() != QUIZ_OPTION_COUNT {
            return Err(SchemaViolation::new(format!(
                "quiz question must have exactly {} options, got {}",
                QUIZ_OPTION_COUNT,
                self.options.len()
            )));
        }
        if self.correct_index >= QUIZ_OPTION_COUNT {
            return Err(SchemaViolation::new(format!(
                "correctIndex {} out of bounds",
                self.correct_index
            )));
        }
        Ok(())
    }
}

/// The three-question assessment batch attached to a turn that asks a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizBatch {
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
}

pub const QUIZ_BATCH_SIZE: usize = 3;

const BATCH_TIERS: [QuestionTier; QUIZ_BATCH_SIZE] = [
    QuestionTier::Basic,
    QuestionTier::Intermediate,
    QuestionTier::Applied,
];

impl QuizBatch {
    /// Tags untagged questions positionally, then checks the batch
    /// invariants: exactly 3 valid questions, difficulty never decreasing.
    pub fn normalize_and_validate(&mut self) -> Result<(), SchemaViolation> {
        if self.questions.len() != QUIZ_BATCH_SIZE {
            return Err(SchemaViolation::new(format!(
                "quiz batch must have exactly {} questions, got {}",
                QUIZ_BATCH_SIZE,
                self.questions.len()
            )));
        }
        for (question, tier) in self.questions.iter_mut().zip(BATCH_TIERS) {
            question.validate()?;
            if question.difficulty.is_none() {
                question.difficulty = Some(tier);
            }
        }
        let tiers: Vec<QuestionTier> = self
            .questions
            .iter()
            .filter_map(|q| q.difficulty)
            .collect();
        if tiers.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(SchemaViolation::new(
                "quiz batch difficulty must not decrease across questions",
            ));
        }
        Ok(())
    }
}

/// One input/expected pair a submission is judged against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

/// A generated coding challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingChallenge {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(rename = "starterCode", default)]
    pub starter_code: String,
    #[serde(rename = "testCases", default)]
    pub test_cases: Vec<TestCase>,
}

pub const DEFAULT_CHALLENGE_LANGUAGE: &str = "javascript";

impl CodingChallenge {
    /// Fills the language default and checks the challenge is runnable.
    pub fn normalize_and_validate(&mut self) -> Result<(), SchemaViolation> {
        if self.language.trim().is_empty() {
            self.language = DEFAULT_CHALLENGE_LANGUAGE.to_string();
        }
        if self.title.trim().is_empty() {
            return Err(SchemaViolation::new("coding challenge title is empty"));
        }
        if self.test_cases.is_empty() {
            return Err(SchemaViolation::new(
                "coding challenge must carry at least one test case",
            ));
        }
        Ok(())
    }
}

/// 2-4 short follow-up options for the user's next reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Suggestions(Vec<String>);

pub const MIN_SUGGESTIONS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 4;

/// Deterministic padding used when the model returns too few suggestions.
const FALLBACK_SUGGESTIONS: [&str; 3] = ["Tell me more", "I understand", "Show an example"];

impl Suggestions {
    /// Brings an arbitrary model reply into the 2-4 range: blank entries are
    /// dropped, extras truncated, shortfalls padded from a fixed list. Count
    /// problems are normalized, never errors.
    pub fn normalize(entries: Vec<String>) -> Self {
        let mut cleaned: Vec<String> = entries
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        cleaned.truncate(MAX_SUGGESTIONS);
        for fallback in FALLBACK_SUGGESTIONS {
            if cleaned.len() >= MIN_SUGGESTIONS {
                break;
            }
            if !cleaned.iter().any(|s| s == fallback) {
                cleaned.push(fallback.to_string());
            }
        }
        Self(cleaned)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A progress score for the turn, already validated against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// New total percentage, 0-100, never below the stored baseline.
    pub score: u8,
    pub reasoning: String,
}

impl ProgressUpdate {
    /// Applies the scoring rules to a raw model score: a value below the
    /// baseline is rejected (progress never decreases), a value above 100 is
    /// clamped down.
    pub fn from_raw(
        raw_score: i64,
        reasoning: String,
        current_progress: u8,
    ) -> Result<Self, SchemaViolation> {
        if raw_score < i64::from(current_progress) {
            return Err(SchemaViolation::new(format!(
                "progress never decreases: model scored {} below baseline {}",
                raw_score, current_progress
            )));
        }
        Ok(Self {
            score: raw_score.min(100) as u8,
            reasoning,
        })
    }

    /// The aggregator's second-line clamp; a no-op for scores produced by
    /// [`ProgressUpdate::from_raw`].
    pub fn reclamped(mut self, current_progress: u8) -> Self {
        self.score = self.score.clamp(current_progress.min(100), 100);
        self
    }
}

/// Weightage-weighted mean of per-subtopic completion, as a percentage.
/// Subtopics without recorded progress contribute 0; an empty or zero-weight
/// set yields 0.
pub fn weighted_topic_progress(entries: &[(u8, u32)]) -> f64 {
    let total_weight: u64 = entries.iter().map(|(_, w)| u64::from(*w)).sum();
    if total_weight == 0 {
        return 0.0;
    }
    let weighted_score: u64 = entries
        .iter()
        .map(|(score, weight)| u64::from(*score) * u64::from(*weight))
        .sum();
    weighted_score as f64 / total_weight as f64
}

/// The merged, validated bundle of artifacts returned for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizBatch>,
    #[serde(rename = "codeRequest", skip_serializing_if = "Option::is_none")]
    pub code_request: Option<CodingChallenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Suggestions>,
    #[serde(rename = "progressUpdate", skip_serializing_if = "Option::is_none")]
    pub progress_update: Option<ProgressUpdate>,
}

impl MetadataEnvelope {
    /// True when every optional artifact is absent (still a valid envelope).
    pub fn is_empty(&self) -> bool {
        self.quiz.is_none()
            && self.code_request.is_none()
            && self.suggestions.is_none()
            && self.progress_update.is_none()
    }

    /// Cross-artifact invariants: never both quiz and code request,
    /// suggestions only when neither is present.
    pub fn check_invariants(&self) -> Result<(), SchemaViolation> {
        if self.quiz.is_some() && self.code_request.is_some() {
            return Err(SchemaViolation::new(
                "envelope carries both quiz and codeRequest",
            ));
        }
        if self.suggestions.is_some() && (self.quiz.is_some() || self.code_request.is_some()) {
            return Err(SchemaViolation::new(
                "envelope carries suggestions next to a quiz or codeRequest",
            ));
        }
        Ok(())
    }
}
