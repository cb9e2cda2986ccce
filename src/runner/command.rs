use crate::options::flag_table::OUTPUT_FLAG;
use crate::runner::request::ExtractionRequest;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A fully assembled RePKG command line.
///
/// Layout: `<tool> <mode> [flags...] <input> [-o <output>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn for_request(program: &Path, request: &ExtractionRequest) -> Self {
        let mut args: Vec<OsString> = Vec::new();
        args.push(request.mode().verb().into());
        args.extend(request.options().to_args().into_iter().map(OsString::from));
        args.push(request.input().as_os_str().to_os_string());

        if let Some(output_dir) = request.output_dir() {
            args.push(OUTPUT_FLAG.into());
            args.push(output_dir.as_os_str().to_os_string());
        }

        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Program and arguments as text, for reports and logs.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering with arguments containing spaces quoted.
    pub fn display(&self) -> String {
        self.argv()
            .iter()
            .map(|arg| {
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
