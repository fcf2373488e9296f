//! Error taxonomy for the metadata pipeline.
//!
//! The split follows the propagation policy: `BackendError` is the only fatal
//! class, `ClassificationError` degrades to safe-default signals at the
//! pipeline boundary, and `GenerationError` is absorbed per artifact (the
//! artifact is simply absent from the envelope).

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Names the artifact a generation failure belongs to, so callers can log
/// and omit exactly the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Quiz,
    Coding,
    Suggestions,
    Progress,
    TopicPlan,
    Evaluation,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::Coding => "coding challenge",
            ArtifactKind::Suggestions => "suggestions",
            ArtifactKind::Progress => "progress update",
            ArtifactKind::TopicPlan => "topic plan",
            ArtifactKind::Evaluation => "evaluation",
        };
        write!(f, "{}", name)
    }
}

/// A structured-output shape mismatch.
///
/// Carried inside both [`ClassificationError`] and [`GenerationError`] so the
/// two sides share one representation of "the model returned the wrong shape"
/// instead of duplicating it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SchemaViolation(pub String);

impl SchemaViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The generation capability itself failed.
///
/// This is the only error class that propagates out of the pipeline: when the
/// backend is unreachable no envelope can be produced at all.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("chat completion request failed: {0}")]
    Api(#[from] async_openai::error::OpenAIError),
    #[error("backend returned a reply with no content")]
    EmptyResponse,
}

/// The classifier produced output that could not be turned into signals.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier backend call failed: {0}")]
    Backend(#[from] BackendError),
    #[error("classifier output invalid: {0}")]
    Schema(#[from] SchemaViolation),
}

/// One artifact could not be generated. Absence of the artifact is the
/// expected, non-exceptional outcome for this error.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{artifact} generator backend call failed: {source}")]
    Backend {
        artifact: ArtifactKind,
        #[source]
        source: BackendError,
    },
    #[error("{artifact} output invalid after one retry: {violation}")]
    Schema {
        artifact: ArtifactKind,
        #[source]
        violation: SchemaViolation,
    },
    #[error("{artifact} generation timed out after {timeout:?}")]
    Timeout {
        artifact: ArtifactKind,
        timeout: Duration,
    },
}

impl GenerationError {
    /// Which artifact failed.
    pub fn artifact(&self) -> ArtifactKind {
        match self {
            GenerationError::Backend { artifact, .. }
            | GenerationError::Schema { artifact, .. }
            | GenerationError::Timeout { artifact, .. } => *artifact,
        }
    }
}
