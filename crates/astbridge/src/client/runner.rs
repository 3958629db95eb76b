//! Running the parser as a child process.
//!
//! [`ToolRunner`] is the seam between the client and the operating system:
//! give it a program, arguments and input, get back the exit code and both
//! output streams. [`ProcessRunner`] is the real implementation; tests inject
//! their own runner so no parser binary is needed.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One run of an external program.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Program to run.
    pub program: &'a Path,
    /// Command-line arguments.
    pub args: &'a [String],
    /// Bytes written to the program's stdin before it is closed.
    pub stdin: &'a [u8],
    /// Kill the program if it runs longer than this.
    pub timeout: Option<Duration>,
    /// Kill the program once this token is cancelled.
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> Invocation<'a> {
    /// Run `program` with `args` and no input, limits or cancellation.
    #[must_use]
    pub fn new(program: &'a Path, args: &'a [String]) -> Self {
        Self {
            program,
            args,
            stdin: &[],
            timeout: None,
            cancel: None,
        }
    }
}

/// Everything a finished program left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, or `None` if the program was killed by a signal.
    pub exit_code: Option<i32>,
    /// Complete stdout.
    pub stdout: Vec<u8>,
    /// Complete stderr.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Output of a program that exited with code 0.
    #[must_use]
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Output of a program that exited with `exit_code` and printed `stderr`.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the program exited with code 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external programs to completion.
pub trait ToolRunner: Send + Sync {
    /// Run the program, feed it the input and wait for it to exit.
    ///
    /// Implementations must drain stdout and stderr completely and observe
    /// the exit status before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] or [`Error::Spawn`] if the program
    /// cannot be started, [`Error::Timeout`] or [`Error::Cancelled`] if it was
    /// killed, and [`Error::Io`] if its pipes fail.
    fn run(&self, invocation: &Invocation<'_>) -> Result<ToolOutput>;
}

/// Shared flag that asks an in-flight run to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every run watching this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// [`ToolRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<ToolOutput> {
        let program = invocation.program.display().to_string();

        if invocation.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled { program });
        }

        debug!(
            program = %program,
            args = ?invocation.args,
            input_bytes = invocation.stdin.len(),
            "Spawning external process"
        );

        let mut child = Command::new(invocation.program)
            .args(invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::ToolNotFound {
                        program: program.clone(),
                    }
                } else {
                    Error::Spawn {
                        program: program.clone(),
                        source: e,
                    }
                }
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            kill_and_reap(&mut child);
            return Err(Error::Io(io::Error::other(format!(
                "pipes of '{program}' were not captured"
            ))));
        };

        // stdin is fed and both outputs are drained on their own threads so a
        // program that fills one pipe while we block on another cannot stall.
        // They are only joined once the program exited by itself: a killed
        // program may leave descendants holding the pipes open, and those
        // threads then finish whenever the descendants do.
        let input = invocation.stdin.to_vec();
        let writer = thread::spawn(move || write_input(stdin, &input));
        let stdout_reader = thread::spawn(move || read_all(stdout));
        let stderr_reader = thread::spawn(move || read_all(stderr));

        let status = wait_for_exit(&mut child, &program, invocation.timeout, invocation.cancel)?;

        join(writer)?;
        let output = ToolOutput {
            exit_code: status.code(),
            stdout: join(stdout_reader)?,
            stderr: join(stderr_reader)?,
        };

        trace!(
            program = %program,
            exit_code = ?output.exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "External process finished"
        );
        Ok(output)
    }
}

fn write_input(mut stdin: ChildStdin, input: &[u8]) -> io::Result<()> {
    match stdin.write_all(input) {
        // the program exited without reading everything; its exit status
        // decides what happened
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            trace!("External process closed stdin early");
            Ok(())
        }
        other => other,
    }
}

fn read_all(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    pipe.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn join<T>(handle: JoinHandle<io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .map_err(|_| io::Error::other("pipe thread panicked"))?
}

fn wait_for_exit(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<ExitStatus> {
    if timeout.is_none() && cancel.is_none() {
        return Ok(child.wait()?);
    }

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(child);
                return Err(e.into());
            }
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            debug!(program, "Cancelling external process");
            kill_and_reap(child);
            return Err(Error::Cancelled {
                program: program.to_string(),
            });
        }

        if let Some(after) = timeout {
            if start.elapsed() >= after {
                warn!(program, timeout_ms = after.as_millis(), "External process timed out");
                kill_and_reap(child);
                return Err(Error::Timeout {
                    program: program.to_string(),
                    after,
                });
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        // InvalidInput means the process already exited
        if e.kind() != io::ErrorKind::InvalidInput {
            warn!(error = %e, "Failed to kill external process");
        }
    }
    // Reap the process to prevent zombies
    let _ = child.wait();
}
