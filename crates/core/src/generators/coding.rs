//! Generates one coding challenge.

use super::{ArtifactGenerator, GenerationOutcome, structured_call};
use crate::artifacts::CodingChallenge;
use crate::backend::GenerationBackend;
use crate::error::ArtifactKind;
use crate::prompts;
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Deserialize)]
struct CodingPayload {
    coding_challenge: CodingChallenge,
}

pub struct CodingGenerator;

#[async_trait]
impl ArtifactGenerator for CodingGenerator {
    type Artifact = CodingChallenge;

    async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        ctx: &TurnContext,
    ) -> GenerationOutcome<CodingChallenge> {
        let user_content = format!(
            "Topic: {}\nSubtopic: {}\n\nGenerate a coding challenge based on:\n\"{}\"",
            ctx.topic, ctx.subtopic, ctx.turn.assistant_response
        );
        structured_call::<CodingPayload, _, _>(
            backend,
            ArtifactKind::Coding,
            prompts::CODING_SYSTEM,
            &user_content,
            |payload| {
                let mut challenge = payload.coding_challenge;
                challenge.normalize_and_validate()?;
                Ok(challenge)
            },
        )
        .await
    }
}
