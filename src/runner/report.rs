use crate::error::RunnerError;
use crate::options::Mode;
use crate::runner::process::ProcessOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of one input.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub input: PathBuf,
    pub status: RunStatus,
    /// Empty when no process was started for this input.
    pub command: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    #[serde(serialize_with = "serialize_millis", rename = "duration_ms")]
    pub duration: Duration,
}

impl RunResult {
    pub fn from_outcome(input: &Path, command: Vec<String>, outcome: ProcessOutcome) -> Self {
        let status = if outcome.cancelled {
            RunStatus::Cancelled
        } else if outcome.exit_code == Some(0) {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };

        Self {
            input: input.to_path_buf(),
            status,
            command,
            exit_code: outcome.exit_code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            duration: outcome.duration,
        }
    }

    /// The process could not be started at all.
    pub fn spawn_failed(input: &Path, command: Vec<String>, error: &std::io::Error) -> Self {
        Self {
            input: input.to_path_buf(),
            status: RunStatus::Failed,
            command,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("failed to start RePKG: {}", error),
            duration: Duration::ZERO,
        }
    }

    pub fn cancelled(input: &Path) -> Self {
        Self::without_process(input, RunStatus::Cancelled)
    }

    fn without_process(input: &Path, status: RunStatus) -> Self {
        Self {
            input: input.to_path_buf(),
            status,
            command: Vec::new(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn was_executed(&self) -> bool {
        !self.command.is_empty()
    }

    /// The failure as an error value, for callers that want one.
    pub fn to_error(&self) -> Option<RunnerError> {
        match self.status {
            RunStatus::Failed => Some(RunnerError::ProcessingFailed {
                path: self.input.clone(),
                exit_code: self.exit_code,
                stderr: self.stderr.clone(),
            }),
            RunStatus::Cancelled => Some(RunnerError::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverallStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
    /// The run was stopped before every item had a chance to finish.
    Cancelled,
}

impl OverallStatus {
    /// Classifies completed items only; cancelled items do not count.
    ///
    /// A run that was cancelled is reported as [`OverallStatus::Cancelled`]
    /// whatever its completed items did, so this is only for uninterrupted runs.
    pub fn from_results(results: &[RunResult]) -> Self {
        let succeeded = results
            .iter()
            .filter(|r| r.status == RunStatus::Succeeded)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .count();

        match (succeeded, failed) {
            (_, 0) => OverallStatus::AllSucceeded,
            (0, _) => OverallStatus::AllFailed,
            _ => OverallStatus::PartialFailure,
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OverallStatus::AllSucceeded => "all succeeded",
            OverallStatus::PartialFailure => "partial failure",
            OverallStatus::AllFailed => "all failed",
            OverallStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Summary of a finished (or cancelled) run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub status: OverallStatus,
    pub cancelled: bool,
    pub output_dir: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis", rename = "duration_ms")]
    pub duration: Duration,
    /// One entry per candidate, in plan order.
    pub results: Vec<RunResult>,
    /// Files in the selection that RePKG does not handle.
    pub skipped: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn succeeded_count(&self) -> usize {
        self.count(RunStatus::Succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.count(RunStatus::Failed)
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(RunStatus::Cancelled)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
    }

    fn count(&self, status: RunStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: RunStatus) -> RunResult {
        RunResult {
            status,
            ..RunResult::cancelled(Path::new("a.pkg"))
        }
    }

    #[test]
    fn test_overall_status() {
        use RunStatus::*;

        assert_eq!(
            OverallStatus::from_results(&[result(Succeeded), result(Succeeded)]),
            OverallStatus::AllSucceeded
        );
        assert_eq!(
            OverallStatus::from_results(&[result(Succeeded), result(Failed)]),
            OverallStatus::PartialFailure
        );
        assert_eq!(
            OverallStatus::from_results(&[result(Failed), result(Failed)]),
            OverallStatus::AllFailed
        );
    }

    #[test]
    fn test_cancelled_status_serializes() {
        let report = RunReport {
            mode: Mode::Extract,
            status: OverallStatus::Cancelled,
            cancelled: true,
            output_dir: None,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            results: vec![result(RunStatus::Succeeded), result(RunStatus::Cancelled)],
            skipped: Vec::new(),
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["cancelled"], true);
        assert_eq!(OverallStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_status_from_outcome() {
        let outcome = ProcessOutcome {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "bad file".to_string(),
            cancelled: false,
            duration: Duration::from_millis(5),
        };

        let result = RunResult::from_outcome(Path::new("x.pkg"), vec!["RePKG".into()], outcome);
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.stderr, "bad file");

        match result.to_error() {
            Some(RunnerError::ProcessingFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, "bad file");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_kebab_case() {
        let report = RunReport {
            mode: Mode::Extract,
            status: OverallStatus::PartialFailure,
            cancelled: false,
            output_dir: None,
            started_at: Utc::now(),
            duration: Duration::from_millis(1500),
            results: vec![result(RunStatus::Succeeded)],
            skipped: Vec::new(),
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "partial-failure");
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["results"][0]["status"], "succeeded");
    }
}
