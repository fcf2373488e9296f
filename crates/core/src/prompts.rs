//! Prompt templates for the structured-output calls.
//!
//! Every template demands a single JSON object and nothing else; the parser
//! in [`crate::parse`] still tolerates fenced or prose-wrapped replies.
//! Placeholders are substituted with plain `str::replace`, no template engine.

use crate::artifacts::TestCase;

/// Classifies the latest assistant response into intent flags.
pub const CLASSIFIER_SYSTEM: &str = r#"You are analyzing a tutoring session.
Classify the intent of the LATEST ASSISTANT RESPONSE to decide which metadata must be generated.

Output ONLY a valid JSON object with these boolean flags:

```json
{
  "needsQuiz": boolean,
  "needsCoding": boolean,
  "needsProgress": boolean,
  "needsSuggestions": boolean
}
```

Rules:
1. needsQuiz: true ONLY if the response explicitly asks a knowledge-check question or announces a quiz.
2. needsCoding: true ONLY if the response explicitly assigns a coding task.
3. needsQuiz and needsCoding can NEVER both be true. If the response somehow does both, pick the one it foregrounds most.
4. needsSuggestions: true in general, UNLESS a quiz is being asked.
5. needsProgress: true only when the user clearly reached a new milestone in this turn, not for mere continuation."#;

/// Generates the three-question assessment quiz batch.
pub const QUIZ_BATCH_SYSTEM: &str = r#"You are generating a short assessment quiz grounded in the recent lesson context.
Produce exactly 3 multiple-choice questions, progressing from basic to intermediate to applied.

Output ONLY a valid JSON object:

```json
{
  "quiz_batch": {
    "topic": "Topic Name",
    "questions": [
      {
        "question": "Question text...",
        "options": ["A", "B", "C", "D"],
        "correctIndex": 0,
        "explanation": "Why this answer is correct.",
        "difficulty": "basic"
      }
    ]
  }
}
```

Each question has exactly 4 options and a 0-based correctIndex.
The difficulty tags must be "basic", "intermediate", "applied" in that order."#;

/// Generates one coding challenge.
pub const CODING_SYSTEM: &str = r#"You are generating a coding challenge grounded in the recent lesson context.
Output ONLY a valid JSON object:

```json
{
  "coding_challenge": {
    "title": "Challenge Title",
    "description": "Detailed description...",
    "language": "javascript",
    "starterCode": "function solution() {\n  // code here\n}",
    "testCases": [
      { "input": "...", "expected": "..." }
    ]
  }
}
```

Provide at least one test case. Test inputs are fed to the program on stdin and
the expected value is compared against its stdout."#;

/// Generates short follow-up suggestions.
pub const SUGGESTIONS_SYSTEM: &str = r#"You are generating follow-up suggestions for the user's next reply.
Output ONLY a valid JSON object:

```json
{
  "suggestions": ["Suggestion 1", "Suggestion 2", "Suggestion 3"]
}
```

Provide 2-4 suggestions, each at most 5 words, relevant to continuing the conversation."#;

/// Scores the user's progress for the turn.
pub const PROGRESS_SYSTEM: &str = r#"You are scoring the user's learning progress.
Compute the NEW total percentage as current progress plus the step weightage, capped at 100.
Never report a score below the current progress.

Output ONLY a valid JSON object:

```json
{
  "progress_update": {
    "score": 45,
    "reasoning": "Brief explanation of why progress moved."
  }
}
```"#;

/// Turns a free-text learning request into a master topic plan, or asks for
/// clarification in plain prose.
pub const TOPIC_SYSTEM: &str = r#"The user will tell you what they want to learn.

If the message is a greeting or too vague to name a subject, reply with a short, friendly clarification question in plain text and NO JSON.

If it names a clear subject, reply with ONLY this JSON object and no conversational text around it:

```json
{
  "topic_generation": {
    "masterTopic": {
      "name": "Topic Name",
      "slug": "topic-slug",
      "description": "Short description",
      "category": "Category",
      "iconUrl": "https://example.org/icon.svg",
      "weightage": 100
    },
    "subtopics": [
      {
        "title": "Subtopic Title",
        "difficultyLevel": "basic",
        "weightage": 10
      }
    ]
  }
}
```

difficultyLevel is one of "basic", "intermediate", "advanced".
Subtopic weightage is a relative importance score, typically 5-20.
Never mix the two reply forms."#;

/// Appended to the user content when the first reply failed validation.
pub const RETRY_INSTRUCTION: &str =
    "Your previous reply was not a single valid JSON object of the required shape. \
Respond again with ONLY the corrected JSON object and no other text.";

/// Renders the evaluation instructions for a code submission.
pub fn eval_system(language: &str) -> String {
    format!(
        r#"You are a secure code execution engine for {language} code.
Evaluate the submitted code against the provided test cases.

Return ONLY a valid JSON object with this structure:

{{
  "results": [
    {{ "input": "...", "expected": "...", "actual": "...", "passed": boolean, "consoleOutput": "..." }}
  ],
  "passedCount": number,
  "totalCount": number,
  "error": null
}}

Set "error" to a string ONLY when a syntax or runtime failure prevents any test from running,
and leave "results" empty in that case. Escape all strings properly."#
    )
}

/// Renders the user-side content for an evaluation call.
pub fn eval_user(language: &str, code: &str, test_cases: &[TestCase]) -> String {
    let cases = serde_json::to_string(test_cases).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Language: {language}\n\nUser Code:\n````{language}\n{code}\n````\n\nTest Cases:\n````json\n{cases}\n````\n\nEvaluate now."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_user_embeds_submission() {
        let cases = vec![TestCase {
            input: "2".into(),
            expected: "4".into(),
        }];
        let rendered = eval_user("javascript", "console.log(4)", &cases);
        assert!(rendered.contains("console.log(4)"));
        assert!(rendered.contains("\"input\":\"2\""));
        assert!(rendered.contains("Language: javascript"));
    }

    #[test]
    fn test_templates_demand_json_only() {
        for template in [
            CLASSIFIER_SYSTEM,
            QUIZ_BATCH_SYSTEM,
            CODING_SYSTEM,
            SUGGESTIONS_SYSTEM,
            PROGRESS_SYSTEM,
        ] {
            assert!(template.contains("ONLY a valid JSON object"));
        }
    }
}
