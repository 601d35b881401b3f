//! Fast Downward planner adapter
//!
//! Runs the planner as a subprocess over persisted PDDL files and turns its
//! output into a `ValidationResult`. Success detection and plan extraction
//! are line-scanning heuristics over free-form planner output; they live in
//! the free functions at the bottom of this file so a structured planner
//! interface could replace them without touching any caller.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::outbound::{PlannerError, PlannerPort};
use crate::domain::value_objects::ValidationResult;

/// Phrases that signal a solved instance, matched case-insensitively.
/// When any of them appears, the exit code is not consulted.
const SOLUTION_PHRASES: [&str; 3] = ["solution found", "plan found", "search successful"];

/// Patterns that pick the most useful diagnostic line out of planner noise
const ERROR_PATTERNS: [&str; 7] = [
    "error:",
    "syntax error",
    "parse error",
    "unsolvable",
    "no solution",
    "invalid",
    "failed",
];

/// Adapter invoking a Fast Downward style planner executable
pub struct FastDownwardPlanner {
    planner_path: PathBuf,
    /// Working directory for the subprocess; the `sas_plan` side-channel
    /// file is read from (and left behind in) this directory
    work_dir: PathBuf,
}

impl FastDownwardPlanner {
    pub fn new(planner_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            planner_path: planner_path.into(),
            work_dir: work_dir.into(),
        }
    }

    fn plan_file(&self) -> PathBuf {
        self.work_dir.join("sas_plan")
    }
}

#[async_trait]
impl PlannerPort for FastDownwardPlanner {
    async fn validate(
        &self,
        domain_path: &Path,
        problem_path: &Path,
        search_strategy: &str,
        timeout: Duration,
    ) -> Result<ValidationResult, PlannerError> {
        if !self.planner_path.exists() {
            return Err(PlannerError::NotInstalled(self.planner_path.clone()));
        }

        tracing::info!(
            domain = %domain_path.display(),
            problem = %problem_path.display(),
            search = search_strategy,
            "running planner"
        );

        let started = Instant::now();
        let child = Command::new(&self.planner_path)
            .arg(domain_path)
            .arg(problem_path)
            .arg("--search")
            .arg(search_strategy)
            .current_dir(&self.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must terminate the process
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "planner timed out");
                return Ok(ValidationResult::failed(
                    format!("planner timed out after {} seconds", timeout.as_secs()),
                    started.elapsed(),
                ));
            }
        };
        let elapsed = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(
            exit = ?output.status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "planner completed"
        );

        let mut result = parse_planner_output(&stdout, &stderr, output.status.success(), elapsed);

        // Supplement the scanned steps with the side-channel plan file.
        // The file is left behind; cleanup is not this adapter's concern.
        if result.has_solution {
            let mut steps = result.plan.take().unwrap_or_default();
            steps.extend(read_plan_file(&self.plan_file()).await);
            result.plan = if steps.is_empty() { None } else { Some(steps) };
        }

        Ok(result)
    }

    async fn check_installation(&self) -> bool {
        if !self.planner_path.exists() {
            return false;
        }

        let mut command = Command::new(&self.planner_path);
        command
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(Duration::from_secs(10), command.status()).await {
            Ok(Ok(status)) => status.success(),
            _ => false,
        }
    }
}

/// Classify one planner invocation from its captured output and exit status.
///
/// A recognized solution phrase is authoritative; otherwise a zero exit code
/// counts as valid (accepted but unsolved).
fn parse_planner_output(
    stdout: &str,
    stderr: &str,
    exit_ok: bool,
    elapsed: Duration,
) -> ValidationResult {
    let combined = format!("{stdout}\n{stderr}");
    let lower = combined.to_lowercase();

    let has_solution = SOLUTION_PHRASES.iter().any(|p| lower.contains(p));
    let is_valid = exit_ok || has_solution;

    let plan = if has_solution {
        Some(scan_plan_lines(&combined))
    } else {
        None
    };

    let error_message = if is_valid {
        String::new()
    } else {
        extract_error_message(stderr, stdout)
    };

    ValidationResult {
        is_valid,
        has_solution,
        error_message,
        plan,
        elapsed,
    }
}

/// Collect parenthesized action lines following a "solution found" or
/// "plan:" marker, stopping at a blank line or a "plan length" line
fn scan_plan_lines(output: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut in_plan = false;

    for line in output.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();

        if lower.contains("solution found") || lower.contains("plan:") {
            in_plan = true;
            continue;
        }

        if in_plan {
            if line.starts_with('(') && line.ends_with(')') {
                steps.push(line.to_string());
            } else if line.is_empty() || lower.contains("plan length") {
                break;
            }
        }
    }

    steps
}

/// Pick the most useful diagnostic line, preferring stderr over stdout and
/// falling back to the whole stderr text
fn extract_error_message(stderr: &str, stdout: &str) -> String {
    for source in [stderr, stdout] {
        for line in source.lines() {
            let lower = line.to_lowercase();
            if ERROR_PATTERNS.iter().any(|p| lower.contains(p)) {
                return line.trim().to_string();
            }
        }
    }

    let fallback = stderr.trim();
    if fallback.is_empty() {
        "Unknown error".to_string()
    } else {
        fallback.to_string()
    }
}

/// Read plan steps from the side-channel file, skipping comment lines.
/// Missing or unreadable file yields no steps.
async fn read_plan_file(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
            .map(String::from)
            .collect(),
        Err(_) => Vec::new(),
    }
}
