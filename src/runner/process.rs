use crate::runner::cancel::CancelToken;
use crate::runner::command::ToolCommand;
use std::io::{self, Read};
use std::process::Stdio;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for the pipes to close once the child has been reaped.
///
/// Anything RePKG started itself may keep the pipes open after it exits or is
/// killed. Output collected up to this point is kept and the readers are left
/// to finish on their own.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// What one child process did.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub cancelled: bool,
    pub duration: Duration,
}

/// Runs `command` to completion, or until `cancel` fires.
///
/// The child is polled every `poll_interval`. On cancellation it is killed
/// and reaped before returning. Spawn failures are returned as-is so the
/// caller can tell a missing executable from a failing one.
pub fn run_process(
    command: &ToolCommand,
    cancel: &CancelToken,
    poll_interval: Duration,
) -> io::Result<ProcessOutcome> {
    let start = Instant::now();

    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    tracing::debug!(pid = child.id(), command = %command.display(), "spawned RePKG");

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let mut cancelled = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(pid = child.id(), "cancelling running RePKG process");
            if let Err(e) = child.kill() {
                tracing::warn!(error = %e, "failed to kill RePKG process");
            }
            cancelled = true;
            break child.wait()?;
        }

        thread::sleep(poll_interval);
    };

    let deadline = Instant::now() + DRAIN_GRACE;
    let outcome = ProcessOutcome {
        exit_code: status.code(),
        stdout: collect(stdout, deadline),
        stderr: collect(stderr, deadline),
        cancelled,
        duration: start.elapsed(),
    };

    tracing::debug!(
        exit_code = ?outcome.exit_code,
        cancelled = outcome.cancelled,
        elapsed_ms = outcome.duration.as_millis() as u64,
        "RePKG exited"
    );

    Ok(outcome)
}

struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done) = mpsc::channel();

    let sink = Arc::clone(&buffer);
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.extend_from_slice(&chunk[..n]);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = done_tx.send(());
    });

    Drain { buffer, done }
}

/// Takes what the reader has gathered, waiting for end of stream until `deadline`.
fn collect(drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };

    let remaining = deadline.saturating_duration_since(Instant::now());
    if drain.done.recv_timeout(remaining).is_err() {
        tracing::debug!("RePKG output still open after exit, keeping what was read");
    }

    let bytes = match drain.buffer.lock() {
        Ok(mut buffer) => std::mem::take(&mut *buffer),
        Err(_) => Vec::new(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}
