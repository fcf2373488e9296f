//! The response aggregator: classify the turn, dispatch only the signalled
//! generators, merge their outputs into one validated envelope.
//!
//! The pipeline is best-effort by construction: a failed or timed-out
//! generator leaves its artifact absent, and only an unreachable backend
//! fails the whole turn. Dropping the returned future cancels every
//! in-flight generator call, since all dispatch happens inside one join.

use crate::artifacts::MetadataEnvelope;
use crate::backend::GenerationBackend;
use crate::classifier::IntentClassifier;
use crate::config::Config;
use crate::error::{ArtifactKind, BackendError, ClassificationError, GenerationError};
use crate::generators::{
    ArtifactGenerator, CodingGenerator, GenerationOutcome, ProgressGenerator, QuizGenerator,
    SuggestionsGenerator,
};
use crate::signals::{IntentSignals, TieBreakPolicy};
use crate::turn::TurnContext;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Independent deadline for every generator dispatch.
    pub generator_timeout: Duration,
    pub tie_break: TieBreakPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            generator_timeout: Duration::from_millis(20_000),
            tie_break: TieBreakPolicy::default(),
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            generator_timeout: config.generator_timeout,
            tie_break: config.tie_break,
        }
    }
}

/// Runs the session-metadata pipeline for one conversation turn.
pub struct MetadataPipeline {
    backend: Arc<dyn GenerationBackend>,
    classifier: IntentClassifier,
    options: PipelineOptions,
}

impl MetadataPipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, options: PipelineOptions) -> Self {
        let classifier = IntentClassifier::new(options.tie_break);
        Self {
            backend,
            classifier,
            options,
        }
    }

    /// Classifies the turn and produces the merged metadata envelope.
    ///
    /// Errors only when the generation backend is unreachable; every
    /// per-artifact failure is absorbed as an absent artifact.
    #[instrument(skip_all, fields(topic = %ctx.topic, subtopic = %ctx.subtopic))]
    pub async fn generate_metadata(
        &self,
        ctx: &TurnContext,
    ) -> Result<MetadataEnvelope, BackendError> {
        let signals = self.signals_for(ctx).await?;
        // Merge-time second line of defense, same routine the classifier ran.
        let signals = signals.resolve_exclusive(self.options.tie_break, &ctx.turn.assistant_response);
        info!(?signals, "dispatching generators");

        let want_suggestions =
            signals.needs_suggestions && !signals.needs_quiz && !signals.needs_coding;

        let (quiz, code_request, suggestions, progress_update) = tokio::join!(
            self.dispatch(
                signals.needs_quiz,
                ArtifactKind::Quiz,
                QuizGenerator.generate(self.backend.as_ref(), ctx),
            ),
            self.dispatch(
                signals.needs_coding,
                ArtifactKind::Coding,
                CodingGenerator.generate(self.backend.as_ref(), ctx),
            ),
            self.dispatch(
                want_suggestions,
                ArtifactKind::Suggestions,
                SuggestionsGenerator.generate(self.backend.as_ref(), ctx),
            ),
            self.dispatch(
                signals.needs_progress,
                ArtifactKind::Progress,
                ProgressGenerator.generate(self.backend.as_ref(), ctx),
            ),
        );

        let mut envelope = MetadataEnvelope::default();
        if let Some(challenge) = code_request {
            envelope.code_request = Some(challenge);
        } else if let Some(batch) = quiz {
            envelope.quiz = Some(batch);
        }
        if envelope.code_request.is_none() && envelope.quiz.is_none() {
            envelope.suggestions = suggestions;
        }
        envelope.progress_update = progress_update.map(|p| p.reclamped(ctx.current_progress));

        debug_assert!(envelope.check_invariants().is_ok());
        Ok(envelope)
    }

    /// Resolves the signal set for the turn: the assessment override wins,
    /// then the classifier, then the safe default when the classifier
    /// produced garbage.
    async fn signals_for(&self, ctx: &TurnContext) -> Result<IntentSignals, BackendError> {
        if ctx.assessment_active {
            info!("assessment active; forcing quiz-only metadata");
            return Ok(IntentSignals::assessment_override());
        }
        match self
            .classifier
            .classify(self.backend.as_ref(), &ctx.turn)
            .await
        {
            Ok(signals) => Ok(signals),
            Err(ClassificationError::Backend(source)) => Err(source),
            Err(ClassificationError::Schema(violation)) => {
                warn!(%violation, "classifier output invalid; using safe default signals");
                Ok(IntentSignals::safe_default())
            }
        }
    }

    /// Runs one generator under its timeout when its signal is set.
    /// Any failure is logged and becomes `None`.
    async fn dispatch<T>(
        &self,
        wanted: bool,
        artifact: ArtifactKind,
        fut: impl Future<Output = GenerationOutcome<T>>,
    ) -> Option<T> {
        if !wanted {
            return None;
        }
        let outcome = match timeout(self.options.generator_timeout, fut).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GenerationError::Timeout {
                artifact,
                timeout: self.options.generator_timeout,
            }),
        };
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, "generator failed; omitting artifact from envelope");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::turn::ConversationTurn;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn pipeline(backend: ScriptedBackend) -> MetadataPipeline {
        MetadataPipeline::new(Arc::new(backend), PipelineOptions::default())
    }

    fn ctx(response: &str) -> TurnContext {
        TurnContext::new(
            ConversationTurn::latest_only(response),
            "JavaScript",
            "Loops",
        )
    }

    fn quiz_batch_reply() -> &'static str {
        r#"{"quiz_batch": {"topic": "Loops", "questions": [
            {"question": "Q1", "options": ["a", "b", "c", "d"], "correctIndex": 0},
            {"question": "Q2", "options": ["a", "b", "c", "d"], "correctIndex": 1},
            {"question": "Q3", "options": ["a", "b", "c", "d"], "correctIndex": 2}
        ]}}"#
    }

    #[tokio::test]
    async fn test_quiz_turn_yields_quiz_and_nothing_else() {
        let backend = ScriptedBackend::new([
            r#"{"needsQuiz": true, "needsCoding": false, "needsProgress": false, "needsSuggestions": false}"#,
            quiz_batch_reply(),
        ]);
        let envelope = pipeline(backend)
            .generate_metadata(&ctx("Let's take a quiz! What is 2+2?"))
            .await
            .unwrap();
        assert!(envelope.quiz.is_some());
        assert!(envelope.code_request.is_none());
        assert!(envelope.suggestions.is_none());
        assert!(envelope.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_plain_turn_yields_suggestions_only() {
        let backend = ScriptedBackend::new([
            r#"{"needsSuggestions": true}"#,
            r#"{"suggestions": ["Why is that?", "Show an example"]}"#,
        ]);
        let envelope = pipeline(backend)
            .generate_metadata(&ctx("Closures capture their environment."))
            .await
            .unwrap();
        assert!(envelope.quiz.is_none());
        assert_eq!(envelope.suggestions.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_classifier_garbage_falls_back_to_safe_default() {
        let backend = ScriptedBackend::new([
            "the user seems engaged",
            r#"{"suggestions": ["Keep going", "Recap the basics"]}"#,
        ]);
        let envelope = pipeline(backend)
            .generate_metadata(&ctx("Good question!"))
            .await
            .unwrap();
        assert!(envelope.quiz.is_none());
        assert!(envelope.code_request.is_none());
        assert!(envelope.suggestions.is_some());
    }

    #[tokio::test]
    async fn test_classifier_backend_failure_is_fatal() {
        let backend = ScriptedBackend::failing();
        let err = pipeline(backend)
            .generate_metadata(&ctx("anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_failed_generator_leaves_artifact_absent() {
        // Quiz generation produces garbage twice; the turn still succeeds
        // with an empty envelope.
        let backend = ScriptedBackend::new([
            r#"{"needsQuiz": true, "needsSuggestions": false}"#,
            "no json",
            "still no json",
        ]);
        let envelope = pipeline(backend)
            .generate_metadata(&ctx("Quiz time!"))
            .await
            .unwrap();
        assert!(envelope.is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_independent_and_reclamped() {
        let backend = ScriptedBackend::new([
            r#"{"needsProgress": true, "needsSuggestions": true}"#,
            r#"{"suggestions": ["Next subtopic", "Recap"]}"#,
            r#"{"progress_update": {"score": 120, "reasoning": "done"}}"#,
        ]);
        let context = ctx("You clearly mastered this step.").with_progress(90, 20);
        let envelope = pipeline(backend)
            .generate_metadata(&context)
            .await
            .unwrap();
        assert_eq!(envelope.progress_update.unwrap().score, 100);
        assert!(envelope.suggestions.is_some());
    }

    #[tokio::test]
    async fn test_assessment_override_skips_classifier() {
        let backend = ScriptedBackend::new([quiz_batch_reply()]);
        let context = ctx("Welcome! Tell me your level.").with_assessment_active(true);
        let pipe = MetadataPipeline::new(Arc::new(backend), PipelineOptions::default());
        let envelope = pipe.generate_metadata(&context).await.unwrap();
        assert!(envelope.quiz.is_some());
        assert!(envelope.suggestions.is_none());
        assert!(envelope.progress_update.is_none());
    }

    /// Serves one canned classifier reply, then stalls forever.
    struct StallingBackend {
        first: Mutex<Option<String>>,
    }

    #[async_trait]
    impl GenerationBackend for StallingBackend {
        async fn generate(
            &self,
            _system_prompt: &str,
            _user_content: &str,
        ) -> Result<String, BackendError> {
            if let Some(reply) = self.first.lock().unwrap().take() {
                return Ok(reply);
            }
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_slow_generator_times_out_and_is_omitted() {
        let backend = StallingBackend {
            first: Mutex::new(Some(r#"{"needsSuggestions": true}"#.to_string())),
        };
        let options = PipelineOptions {
            generator_timeout: Duration::from_millis(50),
            ..PipelineOptions::default()
        };
        let pipe = MetadataPipeline::new(Arc::new(backend), options);
        let envelope = pipe
            .generate_metadata(&ctx("Some explanation."))
            .await
            .unwrap();
        assert!(envelope.is_empty());
    }
}
