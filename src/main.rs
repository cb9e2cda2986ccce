use clap::Parser;
use repkg_runner::config::DEFAULT_CONFIG_FILE;
use repkg_runner::{
    Cli, ConfigStore, OutputFormatter, OutputMode, OverallStatus, RepkgRunner, RunReport,
    RunnerError, UserFriendlyError,
};
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = repkg_runner::logging::init_tracing(cli.verbosity_level()) {
        eprintln!("Warning: {}", e);
    }

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }
    if let Some(ref key) = cli.config_get {
        return handle_config_get(&cli, key);
    }
    if let Some(ref assignment) = cli.config_set {
        return handle_config_set(&cli, assignment);
    }

    let runner = match RepkgRunner::from_cli(&cli) {
        Ok(runner) => runner,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for_error(&e);
        }
    };

    let plan = match runner.plan(&cli.inputs) {
        Ok(plan) => plan,
        Err(e) => {
            runner.handle_error(&e);
            return exit_code_for_error(&e);
        }
    };

    if cli.dry_run {
        runner.output_formatter().print_plan(&plan);
        return 0;
    }

    match runner.run(plan).await {
        Ok(report) => {
            runner.output_formatter().print_run_report(&report);
            exit_code_for_report(&report)
        }
        Err(e) => {
            runner.handle_error(&e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_report(report: &RunReport) -> i32 {
    match report.status {
        OverallStatus::AllSucceeded => 0,
        OverallStatus::PartialFailure => 2,
        OverallStatus::AllFailed => 3,
        OverallStatus::Cancelled => 130, // Interrupted (SIGINT)
    }
}

fn exit_code_for_error(error: &RunnerError) -> i32 {
    match error {
        RunnerError::Cancelled => 130, // Interrupted (SIGINT)
        RunnerError::ToolNotFound { .. } => 4,
        RunnerError::InvalidOptionCombination { .. } => 5,
        RunnerError::InvalidInput { .. } | RunnerError::NoCandidates { .. } => 6,
        RunnerError::OutputUnavailable { .. } => 7,
        _ => 1,
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = config_path(cli);

    match RepkgRunner::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!(
                "  repkg-runner <inputs...> --config {}",
                config_path.display()
            );
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_config_get(cli: &Cli, key: &str) -> i32 {
    match ConfigStore::open(config_path(cli)) {
        Ok(store) => {
            println!("{}", store.get(key, ""));
            0
        }
        Err(e) => {
            print_startup_error(&e);
            1
        }
    }
}

fn handle_config_set(cli: &Cli, assignment: &str) -> i32 {
    let Some((key, value)) = assignment.split_once('=') else {
        print_startup_error(&RunnerError::Config {
            message: format!("expected KEY=VALUE, got '{}'", assignment),
        });
        return 1;
    };

    let result = ConfigStore::open(config_path(cli)).and_then(|mut store| {
        store.set(key.trim(), value.trim())?;
        store.persist()?;
        Ok(store)
    });

    match result {
        Ok(store) => {
            if !cli.quiet {
                println!("{} = {}", key.trim(), store.get(key.trim(), ""));
            }
            0
        }
        Err(e) => {
            print_startup_error(&e);
            exit_code_for_error(&e)
        }
    }
}

fn print_startup_error(error: &RunnerError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
