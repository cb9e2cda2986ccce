use crate::error::{Result, RunnerError};
use crate::runner::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ctrl+C handling: the first press cancels the run, the second exits.
pub struct GracefulShutdown {
    token: CancelToken,
    shutdown_message_shown: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let token = CancelToken::new();
        let shutdown_message_shown = Arc::new(AtomicBool::new(false));

        let token_clone = token.clone();
        let message_shown_clone = shutdown_message_shown.clone();

        ctrlc::set_handler(move || {
            token_clone.cancel();

            if !message_shown_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\n🛑 Cancelling... the current RePKG process will be stopped (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\n💀 Force stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| RunnerError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self {
            token,
            shutdown_message_shown,
        })
    }

    /// Create a GracefulShutdown instance for testing (no signal handler registration)
    pub fn new_for_test() -> Self {
        Self {
            token: CancelToken::new(),
            shutdown_message_shown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Token handed to the run worker.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn check_shutdown(&self) -> Result<()> {
        self.token.check()
    }

    pub fn request_shutdown(&self) {
        self.token.cancel();
    }
}
