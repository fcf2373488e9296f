//! Generates short follow-up suggestions.

use super::{ArtifactGenerator, GenerationOutcome, structured_call};
use crate::artifacts::Suggestions;
use crate::backend::GenerationBackend;
use crate::error::ArtifactKind;
use crate::prompts;
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Deserialize)]
struct SuggestionsPayload {
    suggestions: Vec<String>,
}

pub struct SuggestionsGenerator;

#[async_trait]
impl ArtifactGenerator for SuggestionsGenerator {
    type Artifact = Suggestions;

    async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        ctx: &TurnContext,
    ) -> GenerationOutcome<Suggestions> {
        let user_content = format!(
            "Generate suggestions based on:\n\"{}\"",
            ctx.turn.assistant_response
        );
        structured_call::<SuggestionsPayload, _, _>(
            backend,
            ArtifactKind::Suggestions,
            prompts::SUGGESTIONS_SYSTEM,
            &user_content,
            // Count problems are normalized away, so the only way to fail
            // here is a reply without the suggestions array at all.
            |payload| Ok(Suggestions::normalize(payload.suggestions)),
        )
        .await
    }
}
