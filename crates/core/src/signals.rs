//! Intent signals emitted by the classifier and consumed by the aggregator.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tie-break applied when the classifier reports both a quiz and a coding
/// challenge for the same turn. The two can never coexist in the envelope, so
/// one signal must be dropped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreakPolicy {
    /// Keep whichever artifact the response text foregrounds last.
    #[default]
    LastForegrounded,
    /// Always keep the quiz.
    PreferQuiz,
    /// Always keep the coding challenge.
    PreferCoding,
}

impl FromStr for TieBreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last" | "last-foregrounded" => Ok(TieBreakPolicy::LastForegrounded),
            "quiz" => Ok(TieBreakPolicy::PreferQuiz),
            "coding" => Ok(TieBreakPolicy::PreferCoding),
            other => Err(format!("unknown tie-break policy '{}'", other)),
        }
    }
}

/// Phrases that mark a response as foregrounding a quiz or a coding task.
/// Used only by [`TieBreakPolicy::LastForegrounded`].
const QUIZ_CUES: &[&str] = &["quiz", "multiple choice", "which of the following"];
const CODING_CUES: &[&str] = &[
    "coding challenge",
    "coding problem",
    "write a function",
    "implement",
    "starter code",
];

impl TieBreakPolicy {
    /// Returns true when the quiz signal should win the tie.
    fn quiz_wins(&self, response_text: &str) -> bool {
        match self {
            TieBreakPolicy::PreferQuiz => true,
            TieBreakPolicy::PreferCoding => false,
            TieBreakPolicy::LastForegrounded => {
                let text = response_text.to_lowercase();
                let last = |cues: &[&str]| cues.iter().filter_map(|c| text.rfind(c)).max();
                match (last(QUIZ_CUES), last(CODING_CUES)) {
                    (Some(q), Some(c)) => q >= c,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    // Neither cue found; keep the quiz, the cheaper artifact.
                    (None, None) => true,
                }
            }
        }
    }
}

/// Four independent flags describing what metadata the latest turn needs.
///
/// Missing fields in classifier output fall back to the safe default, which
/// is why the struct-level `default` matters: a partial reply merges into
/// "suggestions only" rather than "nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentSignals {
    pub needs_quiz: bool,
    pub needs_coding: bool,
    pub needs_progress: bool,
    pub needs_suggestions: bool,
}

impl Default for IntentSignals {
    fn default() -> Self {
        Self::safe_default()
    }
}

impl IntentSignals {
    /// The fallback when classification fails: no artifacts except
    /// follow-up suggestions.
    pub fn safe_default() -> Self {
        Self {
            needs_quiz: false,
            needs_coding: false,
            needs_progress: false,
            needs_suggestions: true,
        }
    }

    /// Signal set forced while a preliminary assessment quiz is active:
    /// quiz only, no progress scoring during assessment.
    pub fn assessment_override() -> Self {
        Self {
            needs_quiz: true,
            needs_coding: false,
            needs_progress: false,
            needs_suggestions: false,
        }
    }

    /// Enforces the signal invariants, shared by the classifier (before
    /// returning) and the aggregator (at merge time):
    ///
    /// - `needs_quiz` and `needs_coding` never both hold; `policy` picks the
    ///   survivor.
    /// - a quiz suppresses suggestions.
    pub fn resolve_exclusive(mut self, policy: TieBreakPolicy, response_text: &str) -> Self {
        if self.needs_quiz && self.needs_coding {
            if policy.quiz_wins(response_text) {
                self.needs_coding = false;
            } else {
                self.needs_quiz = false;
            }
        }
        if self.needs_quiz {
            self.needs_suggestions = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_default_is_suggestions_only() {
        let signals = IntentSignals::safe_default();
        assert!(!signals.needs_quiz);
        assert!(!signals.needs_coding);
        assert!(!signals.needs_progress);
        assert!(signals.needs_suggestions);
    }

    #[test]
    fn test_partial_json_merges_into_safe_default() {
        let signals: IntentSignals = serde_json::from_str("{\"needsQuiz\": true}").unwrap();
        assert!(signals.needs_quiz);
        // Unmentioned fields come from the safe default.
        assert!(signals.needs_suggestions);
        assert!(!signals.needs_coding);
    }

    #[test]
    fn test_quiz_suppresses_suggestions() {
        let signals = IntentSignals {
            needs_quiz: true,
            needs_suggestions: true,
            ..IntentSignals::safe_default()
        };
        let resolved = signals.resolve_exclusive(TieBreakPolicy::PreferQuiz, "");
        assert!(resolved.needs_quiz);
        assert!(!resolved.needs_suggestions);
    }

    #[test]
    fn test_prefer_quiz_drops_coding() {
        let both = IntentSignals {
            needs_quiz: true,
            needs_coding: true,
            ..IntentSignals::safe_default()
        };
        let resolved = both.resolve_exclusive(TieBreakPolicy::PreferQuiz, "");
        assert!(resolved.needs_quiz);
        assert!(!resolved.needs_coding);
    }

    #[test]
    fn test_prefer_coding_drops_quiz() {
        let both = IntentSignals {
            needs_quiz: true,
            needs_coding: true,
            ..IntentSignals::safe_default()
        };
        let resolved = both.resolve_exclusive(TieBreakPolicy::PreferCoding, "");
        assert!(!resolved.needs_quiz);
        assert!(resolved.needs_coding);
    }

    #[test]
    fn test_last_foregrounded_picks_the_later_cue() {
        let both = IntentSignals {
            needs_quiz: true,
            needs_coding: true,
            ..IntentSignals::safe_default()
        };
        let text = "Let's take a quiz. Actually, here is a coding challenge instead.";
        let resolved = both.resolve_exclusive(TieBreakPolicy::LastForegrounded, text);
        assert!(resolved.needs_coding);
        assert!(!resolved.needs_quiz);

        let text = "Try this coding challenge... but first, a quick quiz!";
        let resolved = both.resolve_exclusive(TieBreakPolicy::LastForegrounded, text);
        assert!(resolved.needs_quiz);
        assert!(!resolved.needs_coding);
    }

    #[test]
    fn test_last_foregrounded_defaults_to_quiz_without_cues() {
        let both = IntentSignals {
            needs_quiz: true,
            needs_coding: true,
            ..IntentSignals::safe_default()
        };
        let resolved = both.resolve_exclusive(TieBreakPolicy::LastForegrounded, "no cues here");
        assert!(resolved.needs_quiz);
        assert!(!resolved.needs_coding);
    }

    #[test]
    fn test_assessment_override_is_quiz_only() {
        let signals = IntentSignals::assessment_override();
        assert!(signals.needs_quiz);
        assert!(!signals.needs_coding);
        assert!(!signals.needs_progress);
        assert!(!signals.needs_suggestions);
        // Already consistent; resolving must not change it.
        assert_eq!(
            signals.resolve_exclusive(TieBreakPolicy::LastForegrounded, ""),
            signals
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "quiz".parse::<TieBreakPolicy>().unwrap(),
            TieBreakPolicy::PreferQuiz
        );
        assert_eq!(
            "coding".parse::<TieBreakPolicy>().unwrap(),
            TieBreakPolicy::PreferCoding
        );
        assert_eq!(
            "last".parse::<TieBreakPolicy>().unwrap(),
            TieBreakPolicy::LastForegrounded
        );
        assert!("random".parse::<TieBreakPolicy>().is_err());
    }
}
