//! Completion reconciler.
//!
//! Runs once per cycle, when the last status stream has ended. It releases
//! the index lock, rebuilds the display listing, prunes the selection and
//! decides which path the diff view shows next.
//!
//! # Display resolution
//! A displayed path that is still in the table stays displayed. Otherwise the
//! worktree list is searched from where the old path would sort, forward then
//! backward, first for a conflict (`U?` or `_U`) and then for any tracked
//! change. A forced first diff additionally moves away from an untracked path
//! and always jumps to a conflict when one exists.

use crate::core::{
    observer::StatusObserver,
    rescan::{RescanPhase, StatusSync},
    state::StatusTable,
    status_code::{SlotStatus, StatusCode},
};
use bstr::{BStr, BString, ByteSlice};
use serde::Serialize;

/// Sorted path lists the presentation layer draws
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayListing {
    /// Paths with a change between the baseline and the index
    pub staged: Vec<BString>,
    /// Paths with a change between the index and the worktree, or a conflict
    pub worktree: Vec<BString>,
    /// Untracked paths left out once the display limit was passed
    pub hidden: usize,
}

impl DisplayListing {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.worktree.is_empty()
    }
}

/// Build both lists in ascending path order; untracked entries past `limit`
/// listed worktree entries are counted in `hidden` instead
pub fn build_listing(table: &StatusTable, limit: usize) -> DisplayListing {
    let mut listing = DisplayListing::default();
    let mut displayed = 0usize;

    for record in table.iter() {
        let code = record.code;
        if displayed > limit && code.staged == SlotStatus::Untracked {
            listing.hidden += 1;
            continue;
        }

        if !code.staged_column().is_unmodified() {
            listing.staged.push(record.path.clone());
        }
        if !code.worktree_column().is_unmodified() {
            listing.worktree.push(record.path.clone());
            displayed += 1;
        }
    }

    listing
}

fn is_conflict(code: StatusCode) -> bool {
    code.is_worktree_conflict()
}

fn is_change(code: StatusCode) -> bool {
    code.staged != SlotStatus::Untracked
}

/// Search `list` forward from where `anchor` sorts, then backward from just
/// before it, for a path other than `anchor` whose code satisfies `wanted`
fn find_next(
    list: &[BString],
    table: &StatusTable,
    anchor: Option<&BStr>,
    wanted: fn(StatusCode) -> bool,
) -> Option<BString> {
    let start = match anchor {
        Some(anchor) => list.partition_point(|p| p.as_bstr() < anchor),
        None => 0,
    };
    let matches = |path: &&BString| {
        Some(path.as_bstr()) != anchor
            && table.get(path).is_some_and(|record| wanted(record.code))
    };

    list[start..]
        .iter()
        .find(matches)
        .or_else(|| list[..start].iter().rev().find(matches))
        .cloned()
}

fn first_diff(
    table: &StatusTable,
    listing: &DisplayListing,
    anchor: Option<&BStr>,
) -> Option<BString> {
    find_next(&listing.worktree, table, anchor, is_conflict)
        .or_else(|| find_next(&listing.worktree, table, anchor, is_change))
}

/// Where a forced first diff moves the display, or `current` when it stays
fn force_first_target(
    table: &StatusTable,
    listing: &DisplayListing,
    current: Option<&BStr>,
) -> Option<BString> {
    // a missing display counts as untracked on both sides
    let code = current
        .and_then(|path| table.get(path))
        .map(|record| record.code)
        .unwrap_or(StatusCode::new(SlotStatus::Untracked, SlotStatus::Untracked));
    let keep = || current.map(|path| path.to_owned());

    if code.has_conflict() {
        return keep();
    }
    if let Some(conflict) = find_next(&listing.worktree, table, current, is_conflict) {
        return Some(conflict);
    }
    if code.staged != SlotStatus::Untracked {
        return keep();
    }
    find_next(&listing.worktree, table, current, is_change).or_else(keep)
}

/// Path the diff view should show once a cycle completes
pub fn resolve_display(
    table: &StatusTable,
    listing: &DisplayListing,
    current: Option<&BStr>,
    force_first: bool,
) -> Option<BString> {
    let resolved = match current {
        Some(path) if table.contains(path) => Some(path.to_owned()),
        _ => first_diff(table, listing, current),
    };

    if force_first {
        force_first_target(table, listing, resolved.as_ref().map(|p| p.as_bstr()))
    } else {
        resolved
    }
}

impl<O: StatusObserver> StatusSync<O> {
    /// Finish the cycle once every stream has ended
    pub(crate) fn reconcile(&mut self, force_first: bool) {
        self.phase = RescanPhase::Reconciling;
        self.lock.release();

        let limit = self.config.max_files_displayed;
        self.listing = build_listing(&self.table, limit);
        if self.listing.hidden > 0 {
            log::warn!(
                "display limit {limit} reached, {} untracked files hidden",
                self.listing.hidden
            );
            if !self.files_warning {
                self.files_warning = true;
                self.observer.on_progress(&format!(
                    "Display limit (gui.maxfilesdisplayed = {limit}) reached, not showing all {} files.",
                    self.table.len()
                ));
            }
        }

        self.selection.prune(&self.table);
        self.flush_invalidated();

        let next = resolve_display(
            &self.table,
            &self.listing,
            self.display_path(),
            force_first,
        );
        if next != self.display {
            self.show(next);
        }

        self.phase = RescanPhase::Idle;
        log::info!("rescan finished with {} paths", self.table.len());
        self.observer.on_progress("Ready.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StatusConfig;
    use crate::core::state::SelectionSet;
    use crate::core::status_code::StatusFragment;

    fn table_of(entries: &[(&str, &str)]) -> StatusTable {
        let mut table = StatusTable::new();
        let mut selection = SelectionSet::new();
        for (path, code) in entries {
            let fragment = StatusFragment::parse(code).unwrap();
            table.merge_path(path, fragment, &mut selection);
        }
        table
    }

    fn paths(list: &[BString]) -> Vec<&str> {
        list.iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn test_listing_splits_staged_and_worktree() {
        let table = table_of(&[("a", "M_"), ("b", "_M"), ("c", "MM"), ("d", "UM"), ("e", "_O")]);
        let listing = build_listing(&table, 5000);

        assert_eq!(paths(&listing.staged), vec!["a", "c"]);
        assert_eq!(paths(&listing.worktree), vec!["b", "c", "d", "e"]);
        assert_eq!(listing.hidden, 0);
    }

    #[test]
    fn test_listing_limit_hides_untracked_only() {
        let table = table_of(&[("a", "_M"), ("b", "_M"), ("c", "_O"), ("d", "_M"), ("e", "_O")]);
        let listing = build_listing(&table, 1);

        assert_eq!(paths(&listing.worktree), vec!["a", "b", "d"]);
        assert_eq!(listing.hidden, 2);
    }

    #[test]
    fn test_current_path_kept_while_present() {
        let table = table_of(&[("a", "_U"), ("b", "_M")]);
        let listing = build_listing(&table, 5000);

        let next = resolve_display(&table, &listing, Some(b"b".as_bstr()), false);
        assert_eq!(next, Some(BString::from("b")));
    }

    #[test]
    fn test_vanished_path_prefers_conflict_with_wrap() {
        let table = table_of(&[("a", "_U"), ("m", "_M"), ("z", "_M")]);
        let listing = build_listing(&table, 5000);

        // searching forward from "n" finds no conflict, wrapping back finds "a"
        let next = resolve_display(&table, &listing, Some(b"n".as_bstr()), false);
        assert_eq!(next, Some(BString::from("a")));
    }

    #[test]
    fn test_vanished_path_falls_back_to_change() {
        let table = table_of(&[("a", "_O"), ("m", "_M"), ("z", "_O")]);
        let listing = build_listing(&table, 5000);

        let next = resolve_display(&table, &listing, Some(b"q".as_bstr()), false);
        assert_eq!(next, Some(BString::from("m")));
    }

    #[test]
    fn test_display_cleared_when_nothing_left() {
        let table = table_of(&[("a", "_O")]);
        let listing = build_listing(&table, 5000);

        assert_eq!(resolve_display(&table, &listing, Some(b"gone".as_bstr()), false), None);
        assert_eq!(resolve_display(&table, &listing, None, false), None);
    }

    #[test]
    fn test_force_first_moves_off_untracked() {
        let table = table_of(&[("a", "_M"), ("b", "_O")]);
        let listing = build_listing(&table, 5000);

        assert_eq!(
            resolve_display(&table, &listing, Some(b"b".as_bstr()), false),
            Some(BString::from("b"))
        );
        assert_eq!(
            resolve_display(&table, &listing, Some(b"b".as_bstr()), true),
            Some(BString::from("a"))
        );
    }

    #[test]
    fn test_force_first_jumps_to_conflict() {
        let table = table_of(&[("a", "_M"), ("b", "U_")]);
        let listing = build_listing(&table, 5000);

        assert_eq!(
            resolve_display(&table, &listing, Some(b"a".as_bstr()), true),
            Some(BString::from("b"))
        );
    }

    #[test]
    fn test_reconcile_releases_lock_and_prunes_selection() {
        let mut sync = StatusSync::new(StatusConfig::default());
        sync.table = table_of(&[("kept", "_M")]);
        sync.selection.select("kept");
        sync.selection.select("gone");
        sync.lock.acquire(crate::core::lock::LockKind::Read);

        sync.reconcile(false);

        assert!(!sync.lock().is_locked());
        assert!(sync.selection().contains("kept"));
        assert!(!sync.selection().contains("gone"));
        assert_eq!(sync.display_path(), Some(b"kept".as_bstr()));
        assert_eq!(sync.phase(), RescanPhase::Idle);
    }
}
