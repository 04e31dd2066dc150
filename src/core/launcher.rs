//! Status query subprocesses.
//!
//! A rescan runs up to four git plumbing commands. [`QueryKind`] names them and
//! builds their arguments; a [`Launcher`] turns a query into a [`QueryStream`]
//! that yields raw stdout bytes as they arrive. Closing a stream reaps the
//! process and reports a non-zero exit as [`RescanError::QueryFailed`].
//!
//! Every child is spawned with `kill_on_drop`, so dropping a stream (or the
//! task pumping it) terminates a query that is still running.

use crate::core::{
    error::{RescanError, Result},
    parser::RecordFormat,
};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// `update-index --refresh` pre-pass; output is discarded
    RefreshIndex,
    /// Tree-vs-index diff against the parent commit or the empty tree
    DiffIndex { parent: String },
    /// Index-vs-worktree diff
    DiffFiles,
    /// Untracked file listing
    ListOthers { exclude_args: Vec<String> },
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::RefreshIndex => "update-index",
            QueryKind::DiffIndex { .. } => "diff-index",
            QueryKind::DiffFiles => "diff-files",
            QueryKind::ListOthers { .. } => "ls-files",
        }
    }

    pub fn args(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            QueryKind::RefreshIndex => &[
                "update-index",
                "-q",
                "--unmerged",
                "--ignore-missing",
                "--refresh",
            ],
            QueryKind::DiffIndex { .. } => {
                &["diff-index", "--cached", "--ignore-submodules=dirty", "-z"]
            }
            QueryKind::DiffFiles => &["diff-files", "-z"],
            QueryKind::ListOthers { .. } => &["ls-files", "--others", "-z"],
        };

        let mut args: Vec<String> = fixed.iter().map(|s| s.to_string()).collect();
        match self {
            QueryKind::DiffIndex { parent } => args.push(parent.clone()),
            QueryKind::ListOthers { exclude_args } => args.extend(exclude_args.iter().cloned()),
            _ => {}
        }
        args
    }

    /// Record layout of the query's output, `None` for the refresh pre-pass
    pub fn record_format(&self) -> Option<RecordFormat> {
        match self {
            QueryKind::RefreshIndex => None,
            QueryKind::DiffIndex { .. } => Some(RecordFormat::DiffIndex),
            QueryKind::DiffFiles => Some(RecordFormat::DiffFiles),
            QueryKind::ListOthers { .. } => Some(RecordFormat::Others),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.name())
    }
}

/// Non-blocking byte source backed by a query's stdout
pub struct QueryStream {
    name: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<Child>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl QueryStream {
    /// Stream over any reader, with no process behind it
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
            child: None,
            stderr: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next chunk of output, `None` at end of stream
    pub async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        let n = self.reader.read_buf(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }

    /// Reap the process; a non-zero exit becomes an error carrying its stderr
    pub async fn close(mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().await?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            log::debug!("{} finished", self.name);
            Ok(())
        } else {
            Err(RescanError::query_failed(&self.name, status, &stderr))
        }
    }
}

impl fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("name", &self.name)
            .field("pid", &self.child.as_ref().and_then(Child::id))
            .finish()
    }
}

/// Starts status queries
pub trait Launcher {
    fn spawn(&self, query: &QueryKind) -> Result<QueryStream>;
}

/// Runs queries as `git` subprocesses in a work tree
#[derive(Debug, Clone)]
pub struct GitLauncher {
    git_dir: PathBuf,
    workdir: PathBuf,
}

impl GitLauncher {
    pub fn new(git_dir: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            workdir: workdir.into(),
        }
    }
}

impl Launcher for GitLauncher {
    fn spawn(&self, query: &QueryKind) -> Result<QueryStream> {
        let args = query.args();
        log::debug!("spawning git {}", args.join(" "));

        let mut child = Command::new("git")
            .args(&args)
            .current_dir(&self.workdir)
            .env("GIT_DIR", &self.git_dir)
            .env("GIT_WORK_TREE", &self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RescanError::spawn_failed(query.to_string(), e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            RescanError::spawn_failed(
                query.to_string(),
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout not captured"),
            )
        })?;

        // drained concurrently so a chatty stderr cannot stall stdout
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut collected = Vec::new();
                let _ = pipe.read_to_end(&mut collected).await;
                collected
            })
        });

        Ok(QueryStream {
            name: query.to_string(),
            reader: Box::new(stdout),
            child: Some(child),
            stderr,
        })
    }
}
