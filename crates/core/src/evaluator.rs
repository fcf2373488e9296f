//! Code evaluation against challenge test cases.
//!
//! Two implementations sit behind one trait: an LLM-judged evaluator that
//! shares the structured-call contract of the generators, and a sandboxed
//! process evaluator that actually runs the submission, one fresh
//! interpreter process per test case. Both funnel their output through
//! [`EvaluationResult::reconcile`] so the count/error invariants hold no
//! matter which path produced the result.

use crate::artifacts::TestCase;
use crate::backend::GenerationBackend;
use crate::error::BackendError;
use crate::parse;
use crate::prompts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

/// A user's solution attempt for a coding challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub language: String,
    pub code: String,
    #[serde(rename = "testCases")]
    pub test_cases: Vec<TestCase>,
}

/// The verdict for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub input: String,
    pub expected: String,
    #[serde(default)]
    pub actual: String,
    pub passed: bool,
    #[serde(rename = "consoleOutput", default)]
    pub console_output: String,
}

/// The full evaluation verdict for a submission.
///
/// `error` is set only when nothing could run at all (the code does not
/// parse, the interpreter is unavailable); per-case failures stay in
/// `results`. Counts are always consistent with `results` — construct
/// through [`EvaluationResult::reconcile`] to guarantee it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub results: Vec<CaseResult>,
    #[serde(rename = "passedCount", default)]
    pub passed_count: usize,
    #[serde(rename = "totalCount", default)]
    pub total_count: usize,
    #[serde(default)]
    pub error: Option<String>,
}

impl EvaluationResult {
    /// A verdict for a submission that could not be executed at all.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            passed_count: 0,
            total_count: 0,
            error: Some(message.into()),
        }
    }

    /// Forces the consistency invariants onto a possibly-sloppy result:
    /// a top-level error empties the case list, and the counts are always
    /// recomputed from the cases actually present.
    pub fn reconcile(mut self) -> Self {
        if self.error.is_some() {
            self.results.clear();
            self.passed_count = 0;
            self.total_count = 0;
        } else {
            self.passed_count = self.results.iter().filter(|r| r.passed).count();
            self.total_count = self.results.len();
        }
        self
    }

    pub fn all_passed(&self) -> bool {
        self.error.is_none() && self.total_count > 0 && self.passed_count == self.total_count
    }
}

/// Evaluates a submission against its test cases.
#[async_trait]
pub trait CodeEvaluator: Send + Sync {
    /// Errors only when the evaluation capability itself is unreachable;
    /// every submission-side failure lands in [`EvaluationResult::error`].
    async fn evaluate(&self, submission: &CodeSubmission) -> Result<EvaluationResult, BackendError>;
}

/// Judges a submission by prompting the backend with the code and cases and
/// validating the structured verdict it returns.
pub struct LlmCodeEvaluator {
    backend: Arc<dyn GenerationBackend>,
}

impl LlmCodeEvaluator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CodeEvaluator for LlmCodeEvaluator {
    async fn evaluate(&self, submission: &CodeSubmission) -> Result<EvaluationResult, BackendError> {
        let system = prompts::eval_system(&submission.language);
        let user = prompts::eval_user(&submission.language, &submission.code, &submission.test_cases);

        let raw = self.backend.generate(&system, &user).await?;
        let violation = match parse::parse_payload::<EvaluationResult>(&raw) {
            Ok(result) => return Ok(result.reconcile()),
            Err(violation) => violation,
        };
        warn!(%violation, "evaluation verdict invalid; retrying once");

        let corrective = format!(
            "{}\n\n{}\nProblem with the previous reply: {}",
            user,
            prompts::RETRY_INSTRUCTION,
            violation
        );
        let raw = self.backend.generate(&system, &corrective).await?;
        match parse::parse_payload::<EvaluationResult>(&raw) {
            Ok(result) => Ok(result.reconcile()),
            // Parse failures surface through the error field, never as Err.
            Err(violation) => Ok(EvaluationResult::from_error(format!(
                "evaluator returned unparsable output: {}",
                violation
            ))),
        }
    }
}

struct Interpreter {
    program: &'static str,
    check_args: &'static [&'static str],
    extension: &'static str,
}

fn interpreter_for(language: &str) -> Option<Interpreter> {
    match language.to_lowercase().as_str() {
        "javascript" | "js" | "node" => Some(Interpreter {
            program: "node",
            check_args: &["--check"],
            extension: "js",
        }),
        "python" | "python3" | "py" => Some(Interpreter {
            program: "python3",
            check_args: &["-m", "py_compile"],
            extension: "py",
        }),
        _ => None,
    }
}

/// Builds the verdict for one executed case. stdout is trimmed and compared
/// to the trimmed expected value; stderr is appended to the console capture.
fn case_outcome(case: &TestCase, stdout: &str, stderr: &str) -> CaseResult {
    let actual = stdout.trim().to_string();
    let passed = actual == case.expected.trim();
    let mut console_output = stdout.trim_end().to_string();
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
        if !console_output.is_empty() {
            console_output.push('\n');
        }
        console_output.push_str(stderr);
    }
    CaseResult {
        input: case.input.clone(),
        expected: case.expected.clone(),
        actual,
        passed,
        console_output,
    }
}

fn failed_case(case: &TestCase, console_output: String) -> CaseResult {
    CaseResult {
        input: case.input.clone(),
        expected: case.expected.clone(),
        actual: String::new(),
        passed: false,
        console_output,
    }
}

/// Runs each test case in a fresh interpreter process with an independent
/// deadline. The submitted program reads a case's input on stdin and its
/// stdout is compared against the expected value.
pub struct SandboxEvaluator {
    case_timeout: Duration,
}

impl SandboxEvaluator {
    pub fn new(case_timeout: Duration) -> Self {
        Self { case_timeout }
    }

    fn stage_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("submission-{}.{}", Uuid::new_v4(), extension))
    }

    async fn run_case(&self, program: &str, code_path: &Path, case: &TestCase) -> CaseResult {
        let mut command = Command::new(program);
        command
            .arg(code_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return failed_case(case, format!("execution failed: {}", e)),
        };

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = case.input.clone();
            if !input.is_empty() && !input.ends_with('\n') {
                input.push('\n');
            }
            let _ = stdin.write_all(input.as_bytes()).await;
            // Dropping stdin closes the pipe so the program sees EOF.
        }

        match timeout(self.case_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => case_outcome(
                case,
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            Ok(Err(e)) => failed_case(case, format!("execution failed: {}", e)),
            // The dropped child is killed via kill_on_drop.
            Err(_) => failed_case(
                case,
                format!("timed out after {:?}", self.case_timeout),
            ),
        }
    }
}

#[async_trait]
impl CodeEvaluator for SandboxEvaluator {
    async fn evaluate(&self, submission: &CodeSubmission) -> Result<EvaluationResult, BackendError> {
        let Some(interpreter) = interpreter_for(&submission.language) else {
            return Ok(EvaluationResult::from_error(format!(
                "unsupported language: {}",
                submission.language
            )));
        };

        let code_path = Self::stage_path(interpreter.extension);
        if let Err(e) = tokio::fs::write(&code_path, &submission.code).await {
            return Ok(EvaluationResult::from_error(format!(
                "could not stage code for execution: {}",
                e
            )));
        }

        // Pre-flight syntax check: a submission that does not parse yields
        // the top-level error and zero results.
        let check = Command::new(interpreter.program)
            .args(interpreter.check_args)
            .arg(&code_path)
            .output()
            .await;
        let check_failure = match &check {
            Err(e) => Some(format!("could not launch {}: {}", interpreter.program, e)),
            Ok(output) if !output.status.success() => {
                Some(String::from_utf8_lossy(&output.stderr).trim().to_string())
            }
            Ok(_) => None,
        };
        if let Some(message) = check_failure {
            remove_staged(&code_path).await;
            return Ok(EvaluationResult::from_error(message));
        }

        let mut results = Vec::with_capacity(submission.test_cases.len());
        for case in &submission.test_cases {
            results.push(self.run_case(interpreter.program, &code_path, case).await);
        }
        remove_staged(&code_path).await;

        Ok(EvaluationResult {
            results,
            ..Default::default()
        }
        .reconcile())
    }
}

async fn remove_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to clean up staged submission");
    }
}
