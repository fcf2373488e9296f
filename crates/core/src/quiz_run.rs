//! Walks a generated quiz batch question by question.
//!
//! The run tracks the user's answers, stops early after too many misses
//! (the remedial path), and otherwise completes with a tally. It owns no
//! transport or persistence; callers relay the emitted events.

use crate::artifacts::{QuizBatch, QuizQuestion};
use serde::Serialize;

/// Wrong-or-skipped answers after which the run stops for remediation.
pub const MAX_WRONG: usize = 2;

/// What happened as a consequence of one recorded answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizEvent {
    /// The answer was recorded.
    Answered {
        question_index: usize,
        correct: bool,
        correct_index: usize,
        feedback: String,
    },
    /// The run moved on to the next question.
    Advanced { next_index: usize, total: usize },
    /// Too many misses; the caller should fall back to a remedial lesson.
    Stopped { wrong_count: usize },
    /// All questions answered.
    Completed {
        total_questions: usize,
        correct_answers: usize,
    },
}

/// An in-progress walkthrough of one quiz batch.
#[derive(Debug, Clone)]
pub struct QuizRun {
    batch: QuizBatch,
    current_index: usize,
    wrong_count: usize,
    active: bool,
}

impl QuizRun {
    pub fn new(batch: QuizBatch) -> Self {
        Self {
            batch,
            current_index: 0,
            wrong_count: 0,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn wrong_count(&self) -> usize {
        self.wrong_count
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        if !self.active {
            return None;
        }
        self.batch.questions.get(self.current_index)
    }

    /// Records an answer for the current question (`None` is a skip) and
    /// returns the resulting events. A finished run ignores further answers.
    pub fn answer(&mut self, selected: Option<usize>) -> Vec<QuizEvent> {
        if !self.active {
            return Vec::new();
        }
        let Some(question) = self.batch.questions.get(self.current_index) else {
            self.active = false;
            return Vec::new();
        };

        let correct = selected == Some(question.correct_index);
        let correct_option = &question.options[question.correct_index];
        let feedback = if correct {
            "Correct!".to_string()
        } else if selected.is_none() {
            format!("Skipped. The answer was {}.", correct_option)
        } else {
            format!("Incorrect. The answer was {}.", correct_option)
        };

        let mut events = vec![QuizEvent::Answered {
            question_index: self.current_index,
            correct,
            correct_index: question.correct_index,
            feedback,
        }];

        if !correct {
            self.wrong_count += 1;
        }

        let total = self.batch.questions.len();
        if self.wrong_count >= MAX_WRONG {
            self.active = false;
            events.push(QuizEvent::Stopped {
                wrong_count: self.wrong_count,
            });
        } else if self.current_index + 1 < total {
            self.current_index += 1;
            events.push(QuizEvent::Advanced {
                next_index: self.current_index,
                total,
            });
        } else {
            self.active = false;
            events.push(QuizEvent::Completed {
                total_questions: total,
                correct_answers: total - self.wrong_count,
            });
        }

        events
    }
}
