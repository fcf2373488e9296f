//! Intent classification over the latest assistant response.

use crate::backend::GenerationBackend;
use crate::error::ClassificationError;
use crate::parse;
use crate::prompts;
use crate::signals::{IntentSignals, TieBreakPolicy};
use crate::turn::ConversationTurn;
use tracing::debug;

/// Messages of trailing history given to the classifier for disambiguation.
const CONTEXT_MESSAGES: usize = 6;

/// Produces [`IntentSignals`] for a turn, with the signal invariants already
/// enforced. No retry here: a bad reply is a [`ClassificationError`] and the
/// pipeline substitutes the safe default instead.
pub struct IntentClassifier {
    tie_break: TieBreakPolicy,
}

impl IntentClassifier {
    pub fn new(tie_break: TieBreakPolicy) -> Self {
        Self { tie_break }
    }

    pub async fn classify(
        &self,
        backend: &dyn GenerationBackend,
        turn: &ConversationTurn,
    ) -> Result<IntentSignals, ClassificationError> {
        let mut user_content = String::new();
        let context = turn.context_window(CONTEXT_MESSAGES);
        if !context.is_empty() {
            user_content.push_str(&format!("RECENT CONTEXT:\n{}\n\n", context));
        }
        user_content.push_str(&format!(
            "LATEST ASSISTANT RESPONSE:\n\"{}\"\n\nClassify the intent now.",
            turn.assistant_response
        ));

        let raw = backend
            .generate(prompts::CLASSIFIER_SYSTEM, &user_content)
            .await?;
        let signals: IntentSignals =
            parse::parse_payload(&raw).map_err(ClassificationError::Schema)?;
        let resolved = signals.resolve_exclusive(self.tie_break, &turn.assistant_response);
        debug!(?resolved, "classified turn intent");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGenerationBackend;
    use crate::backend::testing::ScriptedBackend;
    use crate::error::BackendError;
    use crate::turn::TurnMessage;

    fn quiz_turn() -> ConversationTurn {
        ConversationTurn::latest_only("Let's take a quiz! What is 2+2?")
    }

    #[tokio::test]
    async fn test_classify_quiz_turn() {
        let backend = ScriptedBackend::new([
            r#"{"needsQuiz": true, "needsCoding": false, "needsProgress": false, "needsSuggestions": false}"#,
        ]);
        let classifier = IntentClassifier::new(TieBreakPolicy::default());
        let signals = classifier.classify(&backend, &quiz_turn()).await.unwrap();
        assert!(signals.needs_quiz);
        assert!(!signals.needs_coding);
        assert!(!signals.needs_suggestions);
    }

    #[tokio::test]
    async fn test_classify_resolves_conflicting_flags() {
        // The model breaks the exclusivity rule; the classifier fixes it up
        // before returning.
        let backend = ScriptedBackend::new([
            r#"{"needsQuiz": true, "needsCoding": true, "needsSuggestions": true}"#,
        ]);
        let classifier = IntentClassifier::new(TieBreakPolicy::PreferQuiz);
        let signals = classifier.classify(&backend, &quiz_turn()).await.unwrap();
        assert!(signals.needs_quiz);
        assert!(!signals.needs_coding);
        assert!(!signals.needs_suggestions);
    }

    #[tokio::test]
    async fn test_classify_prose_reply_is_schema_error() {
        let backend = ScriptedBackend::new(["I think the user wants a quiz."]);
        let classifier = IntentClassifier::new(TieBreakPolicy::default());
        let err = classifier
            .classify(&backend, &quiz_turn())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Schema(_)));
    }

    #[tokio::test]
    async fn test_classify_backend_failure_propagates() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate()
            .returning(|_, _| Err(BackendError::EmptyResponse));
        let classifier = IntentClassifier::new(TieBreakPolicy::default());
        let err = classifier
            .classify(&backend, &quiz_turn())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Backend(_)));
    }

    #[tokio::test]
    async fn test_classify_includes_recent_context() {
        let backend = ScriptedBackend::new([r#"{"needsSuggestions": true}"#]);
        let turn = ConversationTurn::new(
            vec![TurnMessage::user("what are closures?")],
            "A closure captures its environment.",
        );
        IntentClassifier::new(TieBreakPolicy::default())
            .classify(&backend, &turn)
            .await
            .unwrap();
        let calls = backend.calls.lock().unwrap();
        assert!(calls[0].1.contains("RECENT CONTEXT"));
        assert!(calls[0].1.contains("what are closures?"));
        assert!(calls[0].1.contains("LATEST ASSISTANT RESPONSE"));
    }
}
