//! Append-only text log of every RePKG invocation.

use crate::runner::report::RunResult;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry. Results without a command are ignored.
    pub fn append(&self, result: &RunResult) -> io::Result<()> {
        if !result.was_executed() {
            return Ok(());
        }

        let mut entry = format!(
            "[{}]\n=== Command ===\n{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            result.command.join(" ")
        );

        let output = if result.stdout.is_empty() {
            "[No output]"
        } else {
            result.stdout.as_str()
        };
        entry.push_str("=== Output ===\n");
        entry.push_str(output);
        entry.push('\n');

        if !result.stderr.is_empty() {
            entry.push_str("=== Error ===\n");
            entry.push_str(&result.stderr);
            entry.push('\n');
        }
        entry.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}
