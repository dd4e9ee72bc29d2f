//! # Protocol Session
//!
//! One persistent external metadata service and its line-oriented channel.
//!
//! - One JSON request per line on stdin, one JSON response per line on stdout
//! - Strict alternation: `query` holds `&mut self` until the response is read
//! - The service's stderr is drained into `tracing` on a detached thread
//! - Created `Running`; becomes `Stopped` only through [`ProtocolSession::stop`]
//!   (or drop); never restarted
//!
//! A failed exchange leaves the channel in an unknown position, so the session
//! turns `Broken` and refuses further queries. The owner must stop it and
//! start a new one.

use crate::primitives::{EXIT_POLL_INTERVAL, MAX_RESPONSE_LINE, STOP_TIMEOUT};
use crate::protocol::{MetadataService, Request, Response, decode_response, encode_request};
use crate::AlbuminError;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// How to launch the metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory (the repository), inherited if `None`.
    pub working_dir: Option<PathBuf>,
    /// Bound on graceful shutdown.
    pub stop_timeout: Duration,
    /// Longest accepted response line, newline excluded.
    pub max_response_line: usize,
}

impl Default for SessionConfig {
    /// `git annex metadata --batch --json` in the current directory.
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            args: ["annex", "metadata", "--batch", "--json"]
                .into_iter()
                .map(String::from)
                .collect(),
            working_dir: None,
            stop_timeout: STOP_TIMEOUT,
            max_response_line: MAX_RESPONSE_LINE,
        }
    }
}

impl SessionConfig {
    /// Launch `program` with `args`.
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build a config from a full argv (`["git", "annex", ...]`).
    ///
    /// Returns `ConfigError` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Result<Self, AlbuminError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AlbuminError::ConfigError("empty metadata command".to_string()))?;
        Ok(Self::new(program.clone(), args.iter().cloned()))
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_response_line(mut self, bytes: usize) -> Self {
        self.max_response_line = bytes;
        self
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// An exchange failed midway; the process still runs but is unusable.
    Broken,
    Stopped,
}

/// A running metadata service process.
#[derive(Debug)]
pub struct ProtocolSession {
    config: SessionConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    state: SessionState,
}

impl ProtocolSession {
    /// Spawn the service and wire its streams.
    pub fn start(config: SessionConfig) -> Result<Self, AlbuminError> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            AlbuminError::IoError(format!("cannot start {}: {}", config.program, e))
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            cleanup_process(&mut child);
            return Err(AlbuminError::IoError(
                "metadata service streams are not piped".to_string(),
            ));
        };

        if let Some(stderr) = child.stderr.take() {
            let pid = child.id();
            let spawned = std::thread::Builder::new()
                .name(format!("albumin-stderr-{pid}"))
                .spawn(move || drain_stderr(pid, stderr));
            if let Err(e) = spawned {
                cleanup_process(&mut child);
                return Err(AlbuminError::IoError(format!("cannot drain stderr: {e}")));
            }
        }

        tracing::info!(
            pid = child.id(),
            "started metadata service: {} {}",
            config.program,
            config.args.join(" ")
        );

        Ok(Self {
            config,
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            state: SessionState::Running,
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Process id of the service.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// True if the service process has not exited yet.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send one request and read exactly one response line.
    ///
    /// Fails with `Protocol` on EOF, an empty or oversized line, or an
    /// undecodable response, and the session becomes `Broken`. A broken
    /// session fails every later query with `Protocol`. Fails with
    /// `SessionStopped` after `stop`.
    pub fn query(&mut self, request: &Request) -> Result<Response, AlbuminError> {
        match self.state {
            SessionState::Stopped => return Err(AlbuminError::SessionStopped),
            SessionState::Broken => {
                return Err(AlbuminError::protocol(
                    "session is broken by an earlier protocol failure",
                    "",
                ));
            }
            SessionState::Running => {}
        }

        let mut line = encode_request(request)?;
        line.push('\n');
        let result = self.exchange(request, &line);
        if result.is_err() {
            tracing::warn!(pid = self.pid(), "metadata session broken");
            self.state = SessionState::Broken;
        }
        result
    }

    /// Write one encoded request line and read its response.
    fn exchange(&mut self, request: &Request, line: &str) -> Result<Response, AlbuminError> {
        let stdin = self.stdin.as_mut().ok_or(AlbuminError::SessionStopped)?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|e| AlbuminError::protocol(format!("cannot send request: {e}"), ""))?;

        let max = self.config.max_response_line;
        let mut response = String::new();
        let read = (&mut self.stdout)
            .take(max as u64 + 1)
            .read_line(&mut response)
            .map_err(|e| AlbuminError::protocol(format!("cannot read response: {e}"), ""))?;
        if read == 0 {
            return Err(AlbuminError::protocol("metadata service closed its output", ""));
        }
        let content = read - usize::from(response.ends_with('\n'));
        if content > max {
            return Err(AlbuminError::protocol(
                format!("response exceeds {max} bytes"),
                "",
            ));
        }

        tracing::debug!(
            key = %request.key,
            write = !request.is_read(),
            "metadata round trip ({} bytes)",
            read
        );
        decode_response(&response)
    }

    /// Ask the service to exit and wait up to the configured bound.
    ///
    /// On timeout the process is killed if `allow_kill` is true; otherwise
    /// `Timeout` is returned and the process stays alive and `Running`.
    /// Stopping a stopped session is a no-op.
    pub fn stop(&mut self, allow_kill: bool) -> Result<(), AlbuminError> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }

        if let Some(status) = self.child.try_wait()? {
            self.finish(status);
            return Ok(());
        }

        self.terminate()?;

        let waited = self.config.stop_timeout;
        let deadline = Instant::now() + waited;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.finish(status);
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }

        if !allow_kill {
            tracing::warn!(pid = self.pid(), "metadata service ignored termination");
            return Err(AlbuminError::Timeout {
                pid: self.pid(),
                waited,
            });
        }

        tracing::warn!(pid = self.pid(), "killing metadata service after {:?}", waited);
        self.child.kill()?;
        let status = self.child.wait()?;
        self.finish(status);
        Ok(())
    }

    /// Send the graceful termination signal.
    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), AlbuminError> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(self.pid() as i32), Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(AlbuminError::IoError(format!("cannot signal metadata service: {e}"))),
        }
    }

    /// Closing stdin is the graceful request where signals are unavailable.
    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), AlbuminError> {
        self.stdin = None;
        Ok(())
    }

    fn finish(&mut self, status: ExitStatus) {
        self.stdin = None;
        self.state = SessionState::Stopped;
        tracing::info!(pid = self.pid(), "metadata service exited: {}", status);
    }
}

impl MetadataService for ProtocolSession {
    fn query(&mut self, request: &Request) -> Result<Response, AlbuminError> {
        ProtocolSession::query(self, request)
    }
}

impl Drop for ProtocolSession {
    fn drop(&mut self) {
        if self.state != SessionState::Stopped {
            if let Err(e) = self.stop(true) {
                tracing::error!(pid = self.pid(), "failed to stop metadata service: {}", e);
            }
        }
    }
}

/// Kill and reap a process that never became a session.
fn cleanup_process(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain_stderr(pid: u32, stderr: impl Read) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => tracing::debug!(pid, "metadata service: {}", line),
            Err(_) => break,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
