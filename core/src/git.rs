//! Invocation layer over the external `git` engine.
//!
//! Every maintenance step in this crate is an engine subprocess. The
//! builder below separates launching from waiting: independent commands
//! started back to back overlap at the OS level, and callers join them in
//! the order their output is consumed.

use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::process::Command;
use tracing::debug;

use crate::error::FleetErr;
use crate::error::Result;

/// Pairs "started"/"finished" trace lines for overlapped commands. Scoped
/// to one process run; never persisted or shared across processes.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A fully described engine command that has not been launched yet.
#[derive(Debug, Clone)]
pub struct GitInvocation {
    gitdir: PathBuf,
    args: Vec<String>,
    capture_stdout: bool,
    capture_stderr: bool,
    stdin: Option<Vec<u8>>,
    verify: bool,
}

impl GitInvocation {
    pub fn new<I, S>(gitdir: &Path, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gitdir: gitdir.to_path_buf(),
            args: args.into_iter().map(Into::into).collect(),
            capture_stdout: false,
            capture_stderr: false,
            stdin: None,
            verify: false,
        }
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    pub fn capture_stderr(mut self) -> Self {
        self.capture_stderr = true;
        self
    }

    /// Bytes written to the child's stdin after launch. The pipe is closed
    /// once the payload is flushed.
    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Treat a non-zero exit as fatal when the command is joined.
    pub fn verify(mut self) -> Self {
        self.verify = true;
        self
    }

    /// Launch the engine process without waiting for it.
    pub fn start(self) -> Result<RunningGit> {
        let id = NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed);
        let rendered = self.args.join(" ");
        let mut command = Command::new("git");
        command
            .args(&self.args)
            .current_dir(&self.gitdir)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(if self.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(if self.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });
        let mut child = command.spawn().map_err(|source| FleetErr::GitSpawn {
            args: rendered.clone(),
            source,
        })?;
        debug!(id, gitdir = %self.gitdir.display(), "git {rendered} started");

        if let Some(input) = self.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            // Feed stdin from a detached task so an object list larger
            // than the pipe buffer cannot deadlock against the child.
            tokio::spawn(async move {
                let _ = pipe.write_all(&input).await;
                let _ = pipe.shutdown().await;
            });
        }

        Ok(RunningGit {
            child,
            id,
            rendered,
            gitdir: self.gitdir,
            verify: self.verify,
        })
    }

    /// Launch and immediately join; for steps with no overlap to exploit.
    pub async fn run(self) -> Result<GitOutput> {
        self.start()?.join().await
    }
}

/// A launched engine process. Joining consumes it and yields the collected
/// output.
pub struct RunningGit {
    child: Child,
    id: u64,
    rendered: String,
    gitdir: PathBuf,
    verify: bool,
}

impl RunningGit {
    pub async fn join(self) -> Result<GitOutput> {
        let RunningGit {
            child,
            id,
            rendered,
            gitdir,
            verify,
        } = self;
        let output = child.wait_with_output().await?;
        let status = output.status.code().unwrap_or(-1);
        debug!(id, status, "git {rendered} finished");
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if verify && !output.status.success() {
            return Err(FleetErr::GitCommand {
                args: rendered,
                gitdir,
                status,
                stderr,
            });
        }
        Ok(GitOutput {
            status,
            stdout: output.stdout,
            stderr,
        })
    }
}

#[derive(Debug)]
pub struct GitOutput {
    pub status: i32,
    /// Raw bytes; rev-list output is piped verbatim into pack-objects.
    pub stdout: Vec<u8>,
    pub stderr: String,
}
