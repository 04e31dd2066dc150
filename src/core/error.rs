//! Domain-specific error types for the status-synchronization core.
//!
//! This module defines [`RescanError`] which covers every failure mode a rescan
//! cycle can surface. It uses `thiserror` for ergonomic error definitions and
//! includes small constructors for the variants that carry context.
//!
//! # Public API
//! - [`RescanError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, RescanError>`
//!
//! # Error Categories
//! - **Repository**: Not in a repository, git2 library errors
//! - **Subprocess**: Spawn failures and non-zero exits of status queries
//! - **Cycle control**: Rescan rejected, or events for a stream that is not running
//! - **Output**: I/O and JSON serialization errors

use std::process::ExitStatus;
use thiserror::Error;

/// Domain-specific error types for git-rescan
#[derive(Error, Debug)]
pub enum RescanError {
    // Repository errors
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("Repository has no working directory")]
    BareRepository,

    // Subprocess errors
    #[error("Failed to start {query}: {source}")]
    SpawnFailed {
        query: String,
        source: std::io::Error,
    },

    #[error("{query} exited with {status}: {stderr}")]
    QueryFailed {
        query: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Stream {0} is not part of the active rescan")]
    UnknownStream(usize),

    #[error("Status streams closed before every query finished")]
    StreamsInterrupted,

    // Cycle control errors
    #[error("A rescan is already in progress")]
    RescanInProgress,

    #[error("No rescan is in progress")]
    NoActiveRescan,

    // Output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using RescanError
pub type Result<T> = std::result::Result<T, RescanError>;

impl RescanError {
    /// Create a spawn failure for the named query
    pub fn spawn_failed(query: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            query: query.into(),
            source,
        }
    }

    /// Create a non-zero exit failure for the named query
    pub fn query_failed(query: impl Into<String>, status: ExitStatus, stderr: &[u8]) -> Self {
        Self::QueryFailed {
            query: query.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
