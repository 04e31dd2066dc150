//! Per-path status records and the tables that hold them.
//!
//! This module defines the data the rescan cycle maintains: one
//! [`StatusRecord`] per path with an active status, the [`StatusTable`] that
//! owns them, and the [`SelectionSet`] the presentation layer keeps in sync
//! with the table.
//!
//! # Public API
//! - [`FileInfo`]: A (mode, object id) snapshot of one side of a comparison
//! - [`StatusRecord`]: Status of a single path
//! - [`StatusTable`]: Path-ordered table of records with icon id allocation
//! - [`SelectionSet`]: Paths currently selected by the user

use crate::core::status_code::StatusCode;
use bstr::{BStr, BString, ByteSlice};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Object id written for a side that does not exist
pub const NULL_OID: &str = "0000000000000000000000000000000000000000";

/// File mode and object id of one side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    pub mode: u32,
    pub oid: String,
}

impl FileInfo {
    pub fn new(mode: u32, oid: impl Into<String>) -> Self {
        Self {
            mode,
            oid: oid.into(),
        }
    }

    /// Snapshot of a path that is absent on this side (mode 0, null id)
    pub fn absent() -> Self {
        Self::new(0, NULL_OID)
    }

    /// Parse the octal mode and hex id fields of a raw diff record
    pub fn parse(mode: &str, oid: &str) -> Option<Self> {
        let mode = u32::from_str_radix(mode, 8).ok()?;
        if oid.is_empty() || !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self::new(mode, oid))
    }

    pub fn is_absent(&self) -> bool {
        self.mode == 0 && self.oid.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o} {}", self.mode, self.oid)
    }
}

/// Status of one repository-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub path: BString,
    pub code: StatusCode,
    /// Stable identity for the lifetime of the record
    pub icon_id: u64,
    /// Tree-side snapshot
    pub baseline_info: Option<FileInfo>,
    /// Index-side snapshot
    pub staged_info: Option<FileInfo>,
}

impl StatusRecord {
    pub fn path_lossy(&self) -> String {
        self.path.to_str_lossy().into_owned()
    }
}

/// All records with an active status, ordered by path bytes
#[derive(Debug, Default)]
pub struct StatusTable {
    pub(crate) records: BTreeMap<BString, StatusRecord>,
    pub(crate) next_icon_id: u64,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<[u8]>) -> Option<&StatusRecord> {
        self.records.get(path.as_ref().as_bstr())
    }

    pub fn contains(&self, path: impl AsRef<[u8]>) -> bool {
        self.records.contains_key(path.as_ref().as_bstr())
    }

    /// Records in ascending path order
    pub fn iter(&self) -> impl Iterator<Item = &StatusRecord> {
        self.records.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &BStr> {
        self.records.keys().map(|p| p.as_bstr())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record; icon ids keep counting so identities never repeat
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn allocate_icon_id(&mut self) -> u64 {
        self.next_icon_id += 1;
        self.next_icon_id
    }
}

/// Paths the user has selected; pruned whenever a path leaves the table
#[derive(Debug, Default, Clone)]
pub struct SelectionSet {
    paths: BTreeSet<BString>,
    invalidated: Vec<BString>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, path: impl Into<BString>) {
        self.paths.insert(path.into());
    }

    pub fn contains(&self, path: impl AsRef<[u8]>) -> bool {
        self.paths.contains(path.as_ref().as_bstr())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BStr> {
        self.paths.iter().map(|p| p.as_bstr())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove a selection because its path is gone; returns whether it was selected
    pub fn invalidate(&mut self, path: &BStr) -> bool {
        if self.paths.remove(path) {
            self.invalidated.push(path.to_owned());
            true
        } else {
            false
        }
    }

    /// Invalidate every selection whose path is missing from `table`
    pub fn prune(&mut self, table: &StatusTable) {
        let stale: Vec<BString> = self
            .paths
            .iter()
            .filter(|p| !table.contains(p))
            .cloned()
            .collect();
        for path in stale {
            self.invalidate(path.as_bstr());
        }
    }

    /// Paths invalidated since the last call
    pub fn take_invalidated(&mut self) -> Vec<BString> {
        std::mem::take(&mut self.invalidated)
    }
}
