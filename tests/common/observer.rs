//! Observer that records every notification for later assertions

#![allow(dead_code)]

use bstr::{BStr, BString};
use git_rescan::core::{status_code::StatusCode, StatusObserver};

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub changes: Vec<(BString, StatusCode, StatusCode)>,
    pub invalidated: Vec<BString>,
    pub progress: Vec<String>,
    pub displayed: Vec<Option<BString>>,
}

impl StatusObserver for RecordingObserver {
    fn on_status_changed(&mut self, path: &BStr, previous: StatusCode, current: StatusCode) {
        self.changes.push((path.to_owned(), previous, current));
    }

    fn on_selection_invalidated(&mut self, path: &BStr) {
        self.invalidated.push(path.to_owned());
    }

    fn on_progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
    }

    fn on_display_changed(&mut self, path: Option<&BStr>) {
        self.displayed.push(path.map(|p| p.to_owned()));
    }
}
