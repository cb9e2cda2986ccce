use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("RePKG executable not found or not runnable: {path}")]
    ToolNotFound { path: PathBuf, reason: String },

    #[error("Invalid option combination: {message}")]
    InvalidOptionCombination { message: String },

    #[error("Processing failed for {path}")]
    ProcessingFailed {
        path: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Output directory unavailable: {path}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {path}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("No PKG or TEX files found in the selected inputs")]
    NoCandidates {
        searched_extensions: Vec<String>,
        skipped: usize,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        match self {
            RunnerError::ToolNotFound { path, reason } => {
                format!("Cannot run RePKG at {}: {}", path.display(), reason)
            }
            RunnerError::InvalidOptionCombination { message } => {
                format!("Invalid options: {}", message)
            }
            RunnerError::ProcessingFailed {
                path,
                exit_code,
                stderr,
            } => {
                let code = exit_code
                    .map(|c| format!("exit code {}", c))
                    .unwrap_or_else(|| "no exit code".to_string());
                if stderr.trim().is_empty() {
                    format!("{} failed ({})", path.display(), code)
                } else {
                    format!("{} failed ({}): {}", path.display(), code, stderr.trim_end())
                }
            }
            RunnerError::Cancelled => "Operation was cancelled by user".to_string(),
            RunnerError::OutputUnavailable { path, source } => {
                format!(
                    "Cannot create output directory {}: {}",
                    path.display(),
                    source
                )
            }
            RunnerError::InvalidInput { path, reason } => {
                format!("Invalid input {}: {}", path.display(), reason)
            }
            RunnerError::NoCandidates {
                searched_extensions,
                skipped,
            } => {
                format!(
                    "No files with extensions {} found ({} other files skipped)",
                    searched_extensions.join(", "),
                    skipped
                )
            }
            RunnerError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            RunnerError::ToolNotFound { .. } => Some(
                "Place the RePKG executable next to repkg-runner, set tool.path in the configuration file, or pass --tool <path>.".to_string()
            ),
            RunnerError::InvalidOptionCombination { .. } => Some(
                "Run with --help to list the options supported by each mode.".to_string()
            ),
            RunnerError::OutputUnavailable { .. } => Some(
                "Choose a writable output directory with --output.".to_string()
            ),
            RunnerError::InvalidInput { .. } => Some(
                "Check that every input path exists and is a file or folder.".to_string()
            ),
            RunnerError::NoCandidates { .. } => Some(
                "Select .pkg or .tex files, use --recursive to descend into sub-folders, or adjust run.extensions in the configuration.".to_string()
            ),
            RunnerError::Config { .. } => Some(
                "Check your configuration file syntax or regenerate it with --generate-config.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for RunnerError {
    fn from(error: toml::de::Error) -> Self {
        RunnerError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
