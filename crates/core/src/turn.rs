//! Conversation turn input types.
//!
//! A turn is the unit the pipeline operates on: the latest assistant response
//! plus the preceding exchange. The caller owns the history; everything here
//! is an immutable snapshot for one pipeline run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior message in the tutoring conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: TurnRole,
    pub text: String,
}

impl TurnMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// The latest assistant response together with its preceding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Prior messages, oldest first.
    pub history: Vec<TurnMessage>,
    /// The response the classifier and generators work from.
    pub assistant_response: String,
}

impl ConversationTurn {
    pub fn new(history: Vec<TurnMessage>, assistant_response: impl Into<String>) -> Self {
        Self {
            history,
            assistant_response: assistant_response.into(),
        }
    }

    /// A turn with no prior context.
    pub fn latest_only(assistant_response: impl Into<String>) -> Self {
        Self::new(Vec::new(), assistant_response)
    }

    /// Renders the trailing `max_messages` of history as a plain transcript,
    /// used to give the classifier enough context to disambiguate.
    pub fn context_window(&self, max_messages: usize) -> String {
        let skip = self.history.len().saturating_sub(max_messages);
        self.history[skip..]
            .iter()
            .map(|m| match m.role {
                TurnRole::User => format!("User: {}", m.text),
                TurnRole::Assistant => format!("Mentor: {}", m.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything a single pipeline run reads.
///
/// `current_progress` and `weightage` come from the caller's progress store;
/// the pipeline never persists scores itself. `assessment_active` marks a
/// session whose preliminary assessment quiz is still running, which forces
/// quiz-only metadata for the turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub turn: ConversationTurn,
    pub topic: String,
    pub subtopic: String,
    /// Completion percentage already recorded for the subtopic, 0-100.
    pub current_progress: u8,
    /// Increment granted when the user completes a step, 0-100.
    pub weightage: u8,
    pub assessment_active: bool,
}

impl TurnContext {
    pub fn new(turn: ConversationTurn, topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            turn,
            topic: topic.into(),
            subtopic: subtopic.into(),
            current_progress: 0,
            weightage: 10,
            assessment_active: false,
        }
    }

    pub fn with_progress(mut self, current_progress: u8, weightage: u8) -> Self {
        self.current_progress = current_progress;
        self.weightage = weightage;
        self
    }

    pub fn with_assessment_active(mut self, active: bool) -> Self {
        self.assessment_active = active;
        self
    }
}
