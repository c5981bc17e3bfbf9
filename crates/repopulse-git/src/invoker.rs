//! Shared subprocess invoker for the `git` binary.
//!
//! Every component in the engine funnels its git calls through
//! [`GitInvoker`]: one command, one working directory, one explicit
//! timeout. Output is read as lossy UTF-8; a missing binary, non-zero
//! exit, or timeout all surface as [`PulseError::Git`], which callers
//! convert into their documented default result.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use repopulse_core::PulseError;

/// Timeout for quick metadata lookups (`rev-parse`, `for-each-ref`, ...).
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for potentially large output (`log`, `blame`, `diff`).
pub const LONG_TIMEOUT: Duration = Duration::from_secs(120);

/// Poll interval while waiting for a child process to exit.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Runs `git <args>` in a fixed working directory with a timeout.
///
/// # Examples
///
/// ```no_run
/// use repopulse_git::invoker::{GitInvoker, SHORT_TIMEOUT};
///
/// let invoker = GitInvoker::new(".");
/// let head = invoker.run(&["rev-parse", "HEAD"], SHORT_TIMEOUT).unwrap();
/// assert_eq!(head.trim().len(), 40);
/// ```
#[derive(Debug, Clone)]
pub struct GitInvoker {
    repo_path: PathBuf,
}

impl GitInvoker {
    /// Create an invoker rooted at `repo_path`.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// The repository root this invoker runs in.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run `git <args>` and return stdout as a string.
    ///
    /// Stdout and stderr are drained on dedicated threads so a child
    /// producing more output than the pipe buffer never deadlocks
    /// against the timeout loop.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Git`] if the binary cannot be spawned, the
    /// command exceeds `timeout` (the child is killed), or it exits
    /// non-zero (stderr is included in the message).
    pub fn run(&self, args: &[&str], timeout: Duration) -> Result<String, PulseError> {
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PulseError::Git(format!("failed to spawn git {}: {e}", args.join(" "))))?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| PulseError::Git("stdout pipe missing".into()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| PulseError::Git("stderr pipe missing".into()))?;

        let stdout_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf);
            buf
        });
        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf);
            buf
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_reader.join();
                        let _ = stderr_reader.join();
                        return Err(PulseError::Git(format!(
                            "git {} timed out after {}s",
                            args.join(" "),
                            timeout.as_secs()
                        )));
                    }
                    thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_reader.join();
                    let _ = stderr_reader.join();
                    return Err(PulseError::Git(format!(
                        "failed to wait for git {}: {e}",
                        args.join(" ")
                    )));
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let message = String::from_utf8_lossy(&stderr);
            return Err(PulseError::Git(format!(
                "git {} exited with {status}: {}",
                args.join(" "),
                message.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
