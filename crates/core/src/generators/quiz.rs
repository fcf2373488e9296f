//! Generates the three-question assessment quiz batch.

use super::{ArtifactGenerator, GenerationOutcome, structured_call};
use crate::artifacts::QuizBatch;
use crate::backend::GenerationBackend;
use crate::error::ArtifactKind;
use crate::prompts;
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Deserialize)]
struct QuizBatchPayload {
    quiz_batch: QuizBatch,
}

pub struct QuizGenerator;

#[async_trait]
impl ArtifactGenerator for QuizGenerator {
    type Artifact = QuizBatch;

    async fn generate(
        &self,
        backend: &dyn GenerationBackend,
        ctx: &TurnContext,
    ) -> GenerationOutcome<QuizBatch> {
        let user_content = format!(
            "Topic: {}\nSubtopic: {}\n\nGenerate a quiz batch grounded in this mentor message:\n\"{}\"",
            ctx.topic, ctx.subtopic, ctx.turn.assistant_response
        );
        structured_call::<QuizBatchPayload, _, _>(
            backend,
            ArtifactKind::Quiz,
            prompts::QUIZ_BATCH_SYSTEM,
            &user_content,
            |payload| {
                let mut batch = payload.quiz_batch;
                batch.normalize_and_validate()?;
                Ok(batch)
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::QuestionTier;
    use crate::backend::testing::ScriptedBackend;
    use crate::error::GenerationError;
    use crate::turn::ConversationTurn;

    fn ctx() -> TurnContext {
        TurnContext::new(
            ConversationTurn::latest_only("Let's check what you know about loops."),
            "JavaScript",
            "Loops",
        )
    }

    fn batch_reply() -> String {
        let question = |text: &str, idx: usize| {
            format!(
                r#"{{"question": "{}", "options": ["a", "b", "c", "d"], "correctIndex": {}}}"#,
                text, idx
            )
        };
        format!(
            r#"{{"quiz_batch": {{"topic": "Loops", "questions": [{}, {}, {}]}}}}"#,
            question("Q1", 0),
            question("Q2", 1),
            question("Q3", 2)
        )
    }

    #[tokio::test]
    async fn test_generates_tagged_batch() {
        let backend = ScriptedBackend::new([batch_reply()]);
        let batch = QuizGenerator.generate(&backend, &ctx()).await.unwrap();
        assert_eq!(batch.questions.len(), 3);
        assert_eq!(batch.questions[0].difficulty, Some(QuestionTier::Basic));
        assert_eq!(batch.questions[2].difficulty, Some(QuestionTier::Applied));
    }

    #[tokio::test]
    async fn test_prompt_carries_lesson_context() {
        let backend = ScriptedBackend::new([batch_reply()]);
        QuizGenerator.generate(&backend, &ctx()).await.unwrap();
        let calls = backend.calls.lock().unwrap();
        assert!(calls[0].1.contains("Topic: JavaScript"));
        assert!(calls[0].1.contains("loops"));
    }

    #[tokio::test]
    async fn test_wrong_question_count_fails_after_retry() {
        let two_questions = r#"{"quiz_batch": {"topic": "Loops", "questions": [
            {"question": "Q1", "options": ["a", "b", "c", "d"], "correctIndex": 0},
            {"question": "Q2", "options": ["a", "b", "c", "d"], "correctIndex": 1}
        ]}}"#;
        let backend = ScriptedBackend::new([two_questions, two_questions]);
        let err = QuizGenerator.generate(&backend, &ctx()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Schema { .. }));
        assert_eq!(err.artifact(), ArtifactKind::Quiz);
    }
}
