//! Presentation callback surface.
//!
//! The orchestrator reports everything a front end needs through
//! [`StatusObserver`]; every method has an empty default so a front end only
//! implements what it draws.

use crate::core::status_code::StatusCode;
use bstr::BStr;

pub trait StatusObserver {
    /// A merge changed (or re-confirmed) the code of `path`
    fn on_status_changed(&mut self, _path: &BStr, _previous: StatusCode, _current: StatusCode) {}

    /// `path` was selected but has left the status table
    fn on_selection_invalidated(&mut self, _path: &BStr) {}

    fn on_progress(&mut self, _message: &str) {}

    /// The path shown in the diff view changed; `None` clears the view
    fn on_display_changed(&mut self, _path: Option<&BStr>) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StatusObserver for NullObserver {}

/// Observer that forwards progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn on_selection_invalidated(&mut self, path: &BStr) {
        log::debug!("selection dropped: {path}");
    }

    fn on_progress(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn on_display_changed(&mut self, path: Option<&BStr>) {
        match path {
            Some(path) => log::debug!("displaying {path}"),
            None => log::debug!("display cleared"),
        }
    }
}
