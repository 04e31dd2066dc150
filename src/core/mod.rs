//! Core functionality for git-rescan.
//!
//! This module provides the status-synchronization core: status codes and
//! records, the merge engine, the index lock, query launching and parsing,
//! the rescan state machine and its async driver.

pub mod config;
pub mod driver;
pub mod error;
pub mod git;
pub mod launcher;
pub mod lock;
pub mod merge;
pub mod observer;
pub mod output;
pub mod parser;
pub mod reconcile;
pub mod rescan;
pub mod state;
pub mod status_code;

// === Error handling ===
// Core error types and result type used throughout the application
pub use error::{RescanError, Result};

// === Status model ===
// Two-slot status codes and the per-path records built from them
pub use state::{FileInfo, SelectionSet, StatusRecord, StatusTable};
pub use status_code::{SlotStatus, SlotUpdate, StatusCode, StatusFragment};

// === Rescan cycle ===
// Orchestrator state machine, its async driver and the completion reconciler
pub use driver::{run_cycle, CycleOutcome};
pub use reconcile::{build_listing, resolve_display, DisplayListing};
pub use rescan::{RescanPhase, RescanRequest, RescanStep, StatusSync};

// === Collaborators ===
// Repository access, subprocess launching, stream parsing, locking and callbacks
pub use config::StatusConfig;
pub use git::{GitRepo, RepositoryProbe, RepositoryState};
pub use launcher::{GitLauncher, Launcher, QueryKind, QueryStream};
pub use lock::{LockKind, LockManager, LockState};
pub use observer::{LogObserver, NullObserver, StatusObserver};
pub use parser::{ParsedRecord, RecordFormat, StreamParser};

// === Output formatting ===
// Unified output formatting for consistent CLI presentation
pub use output::{print_error, print_info, print_section_header};
