use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::options::OptionSet;
use crate::runner::cancel::CancelToken;
use crate::runner::command::ToolCommand;
use crate::runner::process::run_process;
use crate::runner::report::{OverallStatus, RunReport, RunResult};
use crate::runner::request::{ExtractionRequest, RunPlan};
use crate::runner::run_log::RunLog;
use crate::runner::tool::{resolve_tool_path, verify_tool};
use crate::scanner::InputScanner;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Progress notifications sent from the run worker to the interface.
#[derive(Debug, Clone)]
pub enum RunEvent {
    ItemStarted {
        index: usize,
        total: usize,
        input: PathBuf,
    },
    ItemCompleted {
        index: usize,
        total: usize,
        result: RunResult,
    },
    RunFinished(RunReport),
}

/// Runs RePKG once per candidate input, one process at a time.
pub struct Orchestrator {
    tool_path: PathBuf,
    scanner: InputScanner,
    poll_interval: Duration,
    run_log: Option<RunLog>,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Result<Self> {
        let tool_path = resolve_tool_path(&config.tool)?;
        tracing::debug!(tool = %tool_path.display(), "resolved RePKG location");

        let run_log = config
            .tool
            .log_enabled
            .then(|| RunLog::new(config.tool.log_file.clone()));

        Ok(Self {
            tool_path,
            scanner: InputScanner::new(&config.run),
            poll_interval: config.poll_interval(),
            run_log,
        })
    }

    pub fn with_tool_path<P: Into<PathBuf>>(mut self, tool_path: P) -> Self {
        self.tool_path = tool_path.into();
        self
    }

    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    /// Checks everything that can be checked without running RePKG and
    /// expands the inputs into one request per candidate file.
    pub fn plan(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: OptionSet,
    ) -> Result<RunPlan> {
        if inputs.is_empty() {
            return Err(RunnerError::InvalidInput {
                path: PathBuf::new(),
                reason: "no input paths were given".to_string(),
            });
        }

        verify_tool(&self.tool_path)?;

        let scan = self.scanner.scan(inputs, options.is_recursive())?;
        for warning in &scan.warnings {
            tracing::warn!("{}", warning);
        }

        if scan.candidates.is_empty() {
            return Err(RunnerError::NoCandidates {
                searched_extensions: self.scanner.filter().get_extensions().to_vec(),
                skipped: scan.skipped.len(),
            });
        }

        let mode = options.mode();
        let output_dir = mode.writes_output().then(|| output_dir.to_path_buf());

        let requests = scan
            .candidates
            .into_iter()
            .map(|input| ExtractionRequest::new(input, output_dir.clone(), options.clone()))
            .collect::<Vec<_>>();

        tracing::info!(
            mode = %mode,
            candidates = requests.len(),
            skipped = scan.skipped.len(),
            "planned run"
        );

        Ok(RunPlan {
            mode,
            tool_path: self.tool_path.clone(),
            output_dir,
            requests,
            skipped: scan.skipped,
            warnings: scan.warnings,
        })
    }

    /// Runs every request in order, sending events as items start and finish.
    ///
    /// Once `cancel` fires the running child is killed and every remaining
    /// item is reported as cancelled. A vanished or unrunnable tool aborts the
    /// whole run.
    pub fn execute(
        &self,
        plan: RunPlan,
        events: &UnboundedSender<RunEvent>,
        cancel: &CancelToken,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        if let Some(ref output_dir) = plan.output_dir {
            ensure_writable(output_dir)?;
        }

        let total = plan.requests.len();
        let mut results = Vec::with_capacity(total);

        for (index, request) in plan.requests.iter().enumerate() {
            if cancel.is_cancelled() {
                results.push(self.complete(index, total, RunResult::cancelled(request.input()), events));
                continue;
            }

            // Receiver may be gone if the interface stopped listening.
            let _ = events.send(RunEvent::ItemStarted {
                index,
                total,
                input: request.input().to_path_buf(),
            });

            let command = ToolCommand::for_request(&plan.tool_path, request);
            let argv = command.argv();

            let result = match run_process(&command, cancel, self.poll_interval) {
                Ok(outcome) => RunResult::from_outcome(request.input(), argv, outcome),
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                    tracing::error!(tool = %plan.tool_path.display(), error = %e, "RePKG could not be started");
                    return Err(RunnerError::ToolNotFound {
                        path: plan.tool_path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(input = %request.input().display(), error = %e, "spawn failed");
                    RunResult::spawn_failed(request.input(), argv, &e)
                }
            };

            if let Some(ref log) = self.run_log {
                if let Err(e) = log.append(&result) {
                    tracing::warn!(log = %log.path().display(), error = %e, "could not write run log");
                }
            }

            results.push(self.complete(index, total, result, events));
        }

        let cancelled = cancel.is_cancelled();
        let report = RunReport {
            mode: plan.mode,
            status: if cancelled {
                OverallStatus::Cancelled
            } else {
                OverallStatus::from_results(&results)
            },
            cancelled,
            output_dir: plan.output_dir,
            started_at,
            duration: start.elapsed(),
            results,
            skipped: plan.skipped,
            warnings: plan.warnings,
        };

        tracing::info!(
            status = %report.status,
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            "run finished"
        );

        let _ = events.send(RunEvent::RunFinished(report.clone()));
        Ok(report)
    }

    fn complete(
        &self,
        index: usize,
        total: usize,
        result: RunResult,
        events: &UnboundedSender<RunEvent>,
    ) -> RunResult {
        tracing::debug!(input = %result.input.display(), status = %result.status, "item complete");
        let _ = events.send(RunEvent::ItemCompleted {
            index,
            total,
            result: result.clone(),
        });
        result
    }

    /// Executes `plan` on a blocking worker thread.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, plan: RunPlan, cancel: CancelToken) -> RunHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_cancel = cancel.clone();

        let worker = tokio::task::spawn_blocking(move || {
            self.execute(plan, &sender, &worker_cancel)
        });

        RunHandle {
            events: receiver,
            cancel,
            worker,
        }
    }
}

/// Creates the output directory and checks RePKG will be able to write into it.
fn ensure_writable(output_dir: &Path) -> Result<()> {
    let unavailable = |source: std::io::Error| RunnerError::OutputUnavailable {
        path: output_dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(output_dir).map_err(unavailable)?;
    // Dropped straight away; the file is removed by the OS.
    tempfile::tempfile_in(output_dir).map_err(unavailable)?;
    Ok(())
}

/// The interface's side of a running job.
pub struct RunHandle {
    events: UnboundedReceiver<RunEvent>,
    cancel: CancelToken,
    worker: JoinHandle<Result<RunReport>>,
}

impl RunHandle {
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the worker has finished and the channel drained.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> Result<RunReport> {
        self.worker.await.map_err(|e| RunnerError::Config {
            message: format!("Run worker failed: {}", e),
        })?
    }
}
