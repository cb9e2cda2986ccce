use crate::options::{Mode, OptionSet};
use std::path::{Path, PathBuf};

/// One RePKG invocation: a single input with the run's options.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    input: PathBuf,
    output_dir: Option<PathBuf>,
    options: OptionSet,
}

impl ExtractionRequest {
    pub fn new(input: PathBuf, output_dir: Option<PathBuf>, options: OptionSet) -> Self {
        Self {
            input,
            output_dir,
            options,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Present only in modes that write files.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn mode(&self) -> Mode {
        self.options.mode()
    }
}

/// Everything a run needs, checked up front so that executing it spawns
/// only RePKG processes.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub mode: Mode,
    pub tool_path: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub requests: Vec<ExtractionRequest>,
    pub skipped: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RunPlan {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
