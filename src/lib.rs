pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod options;
pub mod runner;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ConfigStore, RunConfig, ToolConfig};
pub use error::{Result, RunnerError, UserFriendlyError};

// Core functionality re-exports
pub use options::{Mode, OptionSet, OptionValue};
pub use runner::{
    CancelToken, ExtractionRequest, Orchestrator, OverallStatus, RunEvent, RunHandle, RunPlan,
    RunReport, RunResult, RunStatus,
};
pub use scanner::{FileFilter, InputScanner, ScanOutcome};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::{Path, PathBuf};

/// Main library interface: configuration, terminal output and Ctrl+C
/// handling around one [`Orchestrator`].
pub struct RepkgRunner {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl RepkgRunner {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbosity_level(), cli_args.quiet)
    }

    /// Options for the configured mode, validated.
    pub fn option_set(&self) -> Result<OptionSet> {
        let mode = self.config.run.mode;
        OptionSet::validate(mode, self.config.options_for(mode))
    }

    /// Validates options first so a bad option is reported regardless of
    /// the tool or inputs.
    pub fn plan(&self, inputs: &[PathBuf]) -> Result<RunPlan> {
        let options = self.option_set()?;
        let orchestrator = Orchestrator::new(&self.config)?;
        orchestrator.plan(inputs, &self.config.run.output_dir, options)
    }

    /// Runs `plan` on the background worker and renders its events.
    pub async fn run(&self, plan: RunPlan) -> Result<RunReport> {
        self.shutdown.check_shutdown()?;

        let mode = plan.mode;
        let total = plan.len();
        self.output_formatter.start_operation(&format!(
            "Running RePKG {} on {} file{}",
            mode,
            total,
            if total == 1 { "" } else { "s" }
        ));
        if !plan.skipped.is_empty() {
            self.output_formatter.debug(&format!(
                "Skipping {} unsupported files",
                plan.skipped.len()
            ));
        }
        for warning in &plan.warnings {
            self.output_formatter.warning(warning);
        }

        let orchestrator = Orchestrator::new(&self.config)?.with_tool_path(plan.tool_path.clone());
        let progress = self.progress_manager.create_run_progress(total as u64);
        let mut handle = orchestrator.start(plan, self.shutdown.token());

        while let Some(event) = handle.next_event().await {
            ui::progress::update_run_progress(&progress, &event);

            if let RunEvent::ItemCompleted { ref result, .. } = event {
                self.progress_manager.suspend(|| {
                    self.output_formatter
                        .print_item_result(result, mode == Mode::Info)
                });
            }
        }

        let outcome = handle.wait().await;
        match outcome {
            Ok(ref report) => {
                let summary = if report.cancelled {
                    "Run cancelled".to_string()
                } else {
                    format!("Processed {} files", report.results.len())
                };
                ui::progress::finish_progress_with_summary(&progress, &summary, report.duration);
            }
            Err(_) => progress.abandon(),
        }

        outcome
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(RunnerError::Io)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &RunnerError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}
