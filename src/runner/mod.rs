pub mod cancel;
pub mod command;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod request;
pub mod run_log;
pub mod tool;

pub use cancel::CancelToken;
pub use command::ToolCommand;
pub use orchestrator::{Orchestrator, RunEvent, RunHandle};
pub use process::{run_process, ProcessOutcome};
pub use report::{OverallStatus, RunReport, RunResult, RunStatus};
pub use request::{ExtractionRequest, RunPlan};
pub use run_log::RunLog;
pub use tool::{resolve_tool_path, verify_tool};
