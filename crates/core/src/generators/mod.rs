//! Artifact generators: one strictly-JSON structured call per artifact.
//!
//! Every generator follows the same contract: render a prompt from the
//! immutable turn context, ask the backend for JSON, validate the shape, and
//! retry exactly once with a corrective instruction before giving up. The
//! outcome is an explicit `Result` because a missing artifact is an expected
//! state of the envelope, not an exception.

mod coding;
mod progress;
mod quiz;
mod suggestions;

pub use coding::CodingGenerator;
pub use progress::ProgressGenerator;
pub use quiz::QuizGenerator;
pub use suggestions::SuggestionsGenerator;

use crate::backend::GenerationBackend;
use crate::error::{ArtifactKind, GenerationError, SchemaViolation};
use crate::parse;
use crate::prompts;
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Outcome of one generator dispatch.
pub type GenerationOutcome<T> = Result<T, GenerationError>;

/// The capability every concrete generator implements: context in,
/// typed artifact out.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    type Artifact: Send;

    async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        ctx: &TurnContext,
    ) -> GenerationOutcome<Self::Artifact>;
}

/// Runs one structured call with the shared retry-once policy.
///
/// `P` is the wire payload the prompt asks for; `validate` turns it into the
/// final artifact and is where shape rules are enforced. Backend failures are
/// never retried, only schema failures are.
pub(crate) async fn structured_call<P, T, F>(
    backend: &dyn GenerationBackend,
    artifact: ArtifactKind,
    system_prompt: &str,
    user_content: &str,
    validate: F,
) -> GenerationOutcome<T>
where
    P: DeserializeOwned,
    F: Fn(P) -> Result<T, SchemaViolation>,
{
    let raw = backend
        .generate(system_prompt, user_content)
        .await
        .map_err(|source| GenerationError::Backend { artifact, source })?;

    let violation = match parse::parse_payload::<P>(&raw).and_then(&validate) {
        Ok(value) => return Ok(value),
        Err(violation) => violation,
    };
    warn!(%artifact, %violation, "structured output invalid; retrying once");

    let corrective = format!(
        "{}\n\n{}\nProblem with the previous reply: {}",
        user_content,
        prompts::RETRY_INSTRUCTION,
        violation
    );
    let raw = backend
        .generate(system_prompt, &corrective)
        .await
        .map_err(|source| GenerationError::Backend { artifact, source })?;
    parse::parse_payload::<P>(&raw)
        .and_then(&validate)
        .map_err(|violation| GenerationError::Schema {
            artifact,
            violation,
        })
}
