use crate::config::RunConfig;
use crate::error::{Result, RunnerError};
use crate::scanner::file_filter::FileFilter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Flat, ordered view of the user's selection.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    /// Files RePKG will be run on, in selection order.
    pub candidates: Vec<PathBuf>,
    /// Files seen but not supported by the filter.
    pub skipped: Vec<PathBuf>,
    /// Entries that could not be read while walking folders.
    pub warnings: Vec<String>,
}

pub struct InputScanner {
    filter: FileFilter,
    max_depth: usize,
}

impl InputScanner {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
            max_depth: config.max_depth,
        }
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Expands `inputs` into candidate files.
    ///
    /// Folders contribute their immediate files, or every nested file when
    /// `recursive` is set. Entries are visited in file-name order and
    /// symlinked folders are not followed.
    pub fn scan(&self, inputs: &[PathBuf], recursive: bool) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();

        for input in inputs {
            if !input.exists() {
                return Err(RunnerError::InvalidInput {
                    path: input.clone(),
                    reason: "path does not exist".to_string(),
                });
            }

            if input.is_dir() {
                self.scan_directory(input, recursive, &mut outcome);
            } else if input.is_file() {
                self.classify(input, &mut outcome);
            } else {
                return Err(RunnerError::InvalidInput {
                    path: input.clone(),
                    reason: "not a regular file or folder".to_string(),
                });
            }
        }

        tracing::debug!(
            candidates = outcome.candidates.len(),
            skipped = outcome.skipped.len(),
            warnings = outcome.warnings.len(),
            "input scan finished"
        );

        Ok(outcome)
    }

    fn scan_directory(&self, root: &Path, recursive: bool, outcome: &mut ScanOutcome) {
        let depth = if recursive { self.max_depth } else { 1 };

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(depth)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err
                        .io_error()
                        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
                    {
                        outcome.warnings.push(format!("Permission denied: {}", err));
                    } else {
                        outcome.warnings.push(format!("Scan error: {}", err));
                    }
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            // Symlinks to files count; links to folders are never descended.
            if entry.path().is_file() {
                self.classify(entry.path(), outcome);
            }
        }
    }

    fn classify(&self, path: &Path, outcome: &mut ScanOutcome) {
        if self.filter.is_supported(path) {
            outcome.candidates.push(path.to_path_buf());
        } else {
            outcome.skipped.push(path.to_path_buf());
        }
    }
}
