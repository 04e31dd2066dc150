//! git-rescan - keeps an in-memory picture of a git working copy's status.
//!
//! A rescan runs git's plumbing queries as subprocesses, parses their
//! NUL-delimited output incrementally and merges every record into a
//! path-ordered status table with a stable identity per path. When the last
//! query ends the cycle releases the index lock, prunes stale selections and
//! picks the path to display next.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - The status model (codes, records, table, selection)
//! - The rescan orchestrator and its async driver
//! - Repository access and subprocess launching
//! - Error handling and result types

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    // Error handling
    RescanError,
    Result,

    // Status model
    FileInfo,
    SelectionSet,
    SlotStatus,
    StatusCode,
    StatusFragment,
    StatusRecord,
    StatusTable,

    // Rescan cycle
    run_cycle,
    CycleOutcome,
    RescanRequest,
    StatusSync,

    // Collaborators
    GitLauncher,
    GitRepo,
    Launcher,
    LockKind,
    LockManager,
    LogObserver,
    NullObserver,
    QueryKind,
    QueryStream,
    RepositoryProbe,
    RepositoryState,
    StatusConfig,
    StatusObserver,
};
