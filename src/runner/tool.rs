//! Locating and checking the RePKG executable.

use crate::config::ToolConfig;
use crate::error::{Result, RunnerError};
use std::path::{Path, PathBuf};

pub const TOOL_NAME: &str = "RePKG";

pub fn default_tool_file_name() -> String {
    format!("{}{}", TOOL_NAME, std::env::consts::EXE_SUFFIX)
}

/// Configured path if any, otherwise RePKG beside the running executable.
pub fn resolve_tool_path(config: &ToolConfig) -> Result<PathBuf> {
    if let Some(ref path) = config.path {
        return Ok(path.clone());
    }

    let exe = std::env::current_exe().map_err(|e| RunnerError::ToolNotFound {
        path: PathBuf::from(default_tool_file_name()),
        reason: format!("cannot determine application directory: {}", e),
    })?;

    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(default_tool_file_name()))
}

pub fn verify_tool(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| RunnerError::ToolNotFound {
        path: path.to_path_buf(),
        reason: match e.kind() {
            std::io::ErrorKind::NotFound => "file does not exist".to_string(),
            _ => e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(RunnerError::ToolNotFound {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(RunnerError::ToolNotFound {
                path: path.to_path_buf(),
                reason: "file is not executable".to_string(),
            });
        }
    }

    Ok(())
}
