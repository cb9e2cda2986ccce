use crate::error::{RunnerError, UserFriendlyError};
use crate::runner::{RunPlan, RunReport, RunResult, RunStatus, ToolCommand};
use console::{style, Emoji, Term};
use serde_json;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");
static STOP: Emoji = Emoji("🛑 ", "- ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Success, message),
                OutputMode::Json => self.print_json_message("success", message),
                OutputMode::Plain => println!("SUCCESS: {}", message),
            }
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &RunnerError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// One line per finished item. `show_output` prints RePKG's stdout too,
    /// which is what the user is after in info mode.
    pub fn print_item_result(&self, result: &RunResult, show_output: bool) {
        match self.mode {
            OutputMode::Json => {
                let mut value = serde_json::to_value(result).unwrap_or_default();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), serde_json::json!("item"));
                }
                self.print_json_object(&value);
            }
            OutputMode::Human => self.print_human_item(result, show_output),
            OutputMode::Plain => self.print_plain_item(result, show_output),
        }
    }

    pub fn print_run_report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => {
                let mut value = serde_json::to_value(report).unwrap_or_default();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), serde_json::json!("report"));
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    /// Dry-run listing: the command each candidate would run.
    pub fn print_plan(&self, plan: &RunPlan) {
        let commands: Vec<String> = plan
            .requests
            .iter()
            .map(|request| ToolCommand::for_request(&plan.tool_path, request).display())
            .collect();

        match self.mode {
            OutputMode::Json => {
                let skipped: Vec<String> = plan
                    .skipped
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                self.print_json_object(&serde_json::json!({
                    "type": "plan",
                    "mode": plan.mode,
                    "tool": plan.tool_path.display().to_string(),
                    "output_dir": plan.output_dir.as_ref().map(|p| p.display().to_string()),
                    "commands": commands,
                    "skipped": skipped,
                    "warnings": plan.warnings,
                }));
            }
            OutputMode::Human | OutputMode::Plain => {
                self.print_header("Run Plan");
                println!("Mode: {}", plan.mode);
                println!("Tool: {}", plan.tool_path.display());
                if let Some(ref output_dir) = plan.output_dir {
                    println!("Output directory: {}", output_dir.display());
                }
                println!();
                println!("Commands ({}):", commands.len());
                for command in &commands {
                    println!("  {}", command);
                }
                if !plan.skipped.is_empty() {
                    println!();
                    println!("Skipped ({} unsupported files):", plan.skipped.len());
                    for path in &plan.skipped {
                        println!("  {}", path.display());
                    }
                }
                for warning in &plan.warnings {
                    self.warning(warning);
                }
            }
        }
    }

    // Specialized output methods
    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_item(&self, result: &RunResult, show_output: bool) {
        let name = result.input.display().to_string();

        match result.status {
            RunStatus::Succeeded => {
                if !self.quiet {
                    if self.use_colors {
                        println!(
                            "{}{} {}",
                            CHECKMARK,
                            style(&name).green(),
                            style(format!("({})", format_duration(result.duration))).dim()
                        );
                    } else {
                        println!("✓ {} ({})", name, format_duration(result.duration));
                    }
                }
            }
            RunStatus::Failed => {
                let code = describe_exit(result.exit_code);
                if self.use_colors {
                    eprintln!("{}{} {}", CROSS, style(&name).red().bold(), style(code).red());
                } else {
                    eprintln!("✗ {} {}", name, code);
                }
                for line in result.stderr.lines() {
                    eprintln!("    {}", line);
                }
            }
            RunStatus::Cancelled => {
                if !self.quiet {
                    if self.use_colors {
                        println!("{}{}", STOP, style(format!("{} (cancelled)", name)).yellow());
                    } else {
                        println!("- {} (cancelled)", name);
                    }
                }
            }
        }

        if (show_output || self.verbose_level >= 1) && !result.stdout.trim().is_empty() {
            for line in result.stdout.lines() {
                println!("    {}", line);
            }
        }
    }

    fn print_plain_item(&self, result: &RunResult, show_output: bool) {
        if result.status == RunStatus::Succeeded && self.quiet {
            return;
        }

        let status = result.status.to_string().to_uppercase();
        match result.status {
            RunStatus::Failed => {
                eprintln!(
                    "{}: {} {}",
                    status,
                    result.input.display(),
                    describe_exit(result.exit_code)
                );
                for line in result.stderr.lines() {
                    eprintln!("  {}", line);
                }
            }
            _ => println!("{}: {}", status, result.input.display()),
        }

        if (show_output || self.verbose_level >= 1) && !result.stdout.trim().is_empty() {
            for line in result.stdout.lines() {
                println!("  {}", line);
            }
        }
    }

    fn print_human_report(&self, report: &RunReport) {
        println!();
        self.print_separator();

        let headline = if report.cancelled {
            format!("RePKG {} run cancelled", report.mode)
        } else {
            format!("RePKG {} run finished: {}", report.mode, report.status)
        };

        if self.use_colors {
            let styled = if report.cancelled {
                style(headline).yellow().bold()
            } else if report.failed_count() == 0 {
                style(headline).green().bold()
            } else {
                style(headline).red().bold()
            };
            println!("{}", styled);
        } else {
            println!("{}", headline);
        }

        println!();
        println!("  Succeeded:  {}", report.succeeded_count());
        println!("  Failed:     {}", report.failed_count());
        if report.cancelled_count() > 0 {
            println!("  Cancelled:  {}", report.cancelled_count());
        }
        if !report.skipped.is_empty() {
            println!("  Skipped:    {} (unsupported file type)", report.skipped.len());
        }
        println!("  Time taken: {}", format_duration(report.duration));
        if let Some(ref output_dir) = report.output_dir {
            println!("  Output:     {}", output_dir.display());
        }

        let failures: Vec<&RunResult> = report.failures().collect();
        if !failures.is_empty() {
            println!();
            println!("Failed inputs:");
            for failure in failures {
                println!(
                    "  - {} {}",
                    failure.input.display(),
                    describe_exit(failure.exit_code)
                );
            }
        }

        for warning in &report.warnings {
            self.warning(warning);
        }

        self.print_separator();
    }

    fn print_plain_report(&self, report: &RunReport) {
        println!("REPORT: {} run {}", report.mode, report.status);
        println!("Started: {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("Succeeded: {}", report.succeeded_count());
        println!("Failed: {}", report.failed_count());
        println!("Cancelled: {}", report.cancelled_count());
        println!("Skipped: {}", report.skipped.len());
        println!("Duration: {:?}", report.duration);
        if report.cancelled {
            println!("CANCELLED");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("(exit code {})", code),
        None => "(no exit code)".to_string(),
    }
}

fn format_duration(duration: Duration) -> String {
    crate::ui::progress::format_duration(duration)
}
