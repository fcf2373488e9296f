//! Topic/onboarding generation: a free-text learning request becomes either
//! a structured topic plan or a clarification question, never both.

use crate::backend::GenerationBackend;
use crate::error::{ArtifactKind, GenerationError, SchemaViolation};
use crate::parse;
use crate::prompts;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Difficulty of one planned subtopic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Basic,
    Intermediate,
    Advanced,
}

/// The master topic a learning plan hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterTopic {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "iconUrl", default)]
    pub icon_url: String,
    /// Always 100; normalized regardless of what the model emits.
    #[serde(default = "master_weightage")]
    pub weightage: u32,
}

fn master_weightage() -> u32 {
    100
}

/// One planned subtopic.
///
/// `weightage` is an independent relative-importance score (typically 5-20)
/// used to size progress increments. It is NOT a percentage of the master
/// topic's fixed weightage of 100, and the scores of a plan need not sum to
/// anything in particular.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubtopicPlan {
    pub title: String,
    #[serde(rename = "difficultyLevel")]
    pub difficulty_level: DifficultyLevel,
    pub weightage: u32,
}

/// A validated master topic with its ordered subtopics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicPlan {
    #[serde(rename = "masterTopic")]
    pub master_topic: MasterTopic,
    pub subtopics: Vec<SubtopicPlan>,
}

impl TopicPlan {
    fn normalize_and_validate(&mut self) -> Result<(), SchemaViolation> {
        if self.master_topic.name.trim().is_empty() {
            return Err(SchemaViolation::new("master topic name is empty"));
        }
        if self.subtopics.is_empty() {
            return Err(SchemaViolation::new("topic plan has no subtopics"));
        }
        if self.subtopics.iter().any(|s| s.title.trim().is_empty()) {
            return Err(SchemaViolation::new("subtopic with empty title"));
        }
        self.master_topic.weightage = master_weightage();
        Ok(())
    }
}

/// The two terminal outcomes of an onboarding request. Exactly one form is
/// ever populated: detected JSON wins over prose, prose alone is the
/// clarification.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopicOutcome {
    /// The request was a greeting or too vague; ask the user to clarify.
    Clarification { message: String },
    /// The request named a clear subject.
    Plan { plan: TopicPlan },
}

impl TopicOutcome {
    pub fn is_clarification(&self) -> bool {
        matches!(self, TopicOutcome::Clarification { .. })
    }

    pub fn as_plan(&self) -> Option<&TopicPlan> {
        match self {
            TopicOutcome::Plan { plan } => Some(plan),
            TopicOutcome::Clarification { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct TopicPayload {
    topic_generation: TopicPlan,
}

/// Parses free-text learning intent into a [`TopicOutcome`].
pub struct TopicGenerator;

impl TopicGenerator {
    pub async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        user_request: &str,
    ) -> Result<TopicOutcome, GenerationError> {
        let map_backend = |source| GenerationError::Backend {
            artifact: ArtifactKind::TopicPlan,
            source,
        };
        let raw = backend
            .generate(prompts::TOPIC_SYSTEM, user_request)
            .await
            .map_err(map_backend)?;

        let violation = match Self::interpret(&raw) {
            Ok(outcome) => return Ok(outcome),
            Err(violation) => violation,
        };
        warn!(%violation, "topic generation output invalid; retrying once");

        let corrective = format!(
            "{}\n\n{}\nProblem with the previous reply: {}",
            user_request,
            prompts::RETRY_INSTRUCTION,
            violation
        );
        let raw = backend
            .generate(prompts::TOPIC_SYSTEM, &corrective)
            .await
            .map_err(map_backend)?;
        Self::interpret(&raw).map_err(|violation| GenerationError::Schema {
            artifact: ArtifactKind::TopicPlan,
            violation,
        })
    }

    /// Applies the mutual-exclusivity rule: a reply containing JSON is a
    /// plan (prose around it is discarded), a reply without JSON is a
    /// clarification.
    fn interpret(raw: &str) -> Result<TopicOutcome, SchemaViolation> {
        match parse::extract_json_object(raw) {
            None => {
                let message = raw.trim();
                if message.is_empty() {
                    Err(SchemaViolation::new("empty onboarding reply"))
                } else {
                    Ok(TopicOutcome::Clarification {
                        message: message.to_string(),
                    })
                }
            }
            Some(json) => {
                let payload: TopicPayload = serde_json::from_str(&json).map_err(|e| {
                    SchemaViolation::new(format!("topic plan failed to deserialize: {}", e))
                })?;
                let mut plan = payload.topic_generation;
                plan.normalize_and_validate()?;
                Ok(TopicOutcome::Plan { plan })
            }
        }
    }
}
