//! Scores the user's progress for the turn.

use super::{ArtifactGenerator, GenerationOutcome, structured_call};
use crate::artifacts::ProgressUpdate;
use crate::backend::GenerationBackend;
use crate::error::ArtifactKind;
use crate::prompts;
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Deserialize)]
struct RawProgress {
    score: i64,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
struct ProgressPayload {
    progress_update: RawProgress,
}

pub struct ProgressGenerator;

#[async_trait]
impl ArtifactGenerator for ProgressGenerator {
    type Artifact = ProgressUpdate;

    async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        ctx: &TurnContext,
    ) -> GenerationOutcome<ProgressUpdate> {
        let user_content = format!(
            "Current Progress: {}%\nWeightage: {}%\nContext: the user demonstrated understanding in the latest turn:\n\"{}\"",
            ctx.current_progress, ctx.weightage, ctx.turn.assistant_response
        );
        let baseline = ctx.current_progress;
        structured_call::<ProgressPayload, _, _>(
            backend,
            ArtifactKind::Progress,
            prompts::PROGRESS_SYSTEM,
            &user_content,
            move |payload| {
                ProgressUpdate::from_raw(
                    payload.progress_update.score,
                    payload.progress_update.reasoning,
                    baseline,
                )
            },
        )
        .await
    }
}
