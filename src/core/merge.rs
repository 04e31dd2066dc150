//! State merge engine.
//!
//! Folds one parsed record into the [`StatusTable`]. Each slot of the incoming
//! [`StatusFragment`] either keeps or overwrites the stored slot; afterwards a
//! fixed sequence of bookkeeping rules reconciles the baseline and staged
//! snapshots. The rules are evaluated in order and only the first that
//! matches applies:
//!
//! 1. baseline slot `A`, staged slot `_`, no baseline snapshot: the baseline
//!    snapshot becomes mode 0 with the null id.
//! 2. baseline slot set while the previous baseline slot was `_`, no baseline
//!    snapshot: the staged snapshot is used as the baseline snapshot.
//! 3. baseline slot `_` while the previous baseline slot was set: the
//!    baseline snapshot moves to the staged side and the baseline is cleared.
//!
//! A record that ends up `__` is removed and its selection invalidated.

use crate::core::{
    state::{FileInfo, SelectionSet, StatusRecord, StatusTable},
    status_code::{SlotStatus, StatusCode, StatusFragment},
};
use bstr::{BStr, ByteSlice};

impl StatusTable {
    /// Merge one record into the table and return the code the path had before
    ///
    /// Snapshots that are not supplied are inherited from the existing record
    /// before the bookkeeping rules run.
    pub fn merge(
        &mut self,
        path: &BStr,
        fragment: StatusFragment,
        baseline_info: Option<FileInfo>,
        staged_info: Option<FileInfo>,
        selection: &mut SelectionSet,
    ) -> StatusCode {
        let (previous, icon_id, mut baseline_info, mut staged_info) = match self.records.get(path)
        {
            Some(existing) => (
                existing.code,
                Some(existing.icon_id),
                baseline_info.or_else(|| existing.baseline_info.clone()),
                staged_info.or_else(|| existing.staged_info.clone()),
            ),
            None => (StatusCode::UNMODIFIED, None, baseline_info, staged_info),
        };

        let code = StatusCode::new(
            fragment.baseline.apply(previous.baseline),
            fragment.staged.apply(previous.staged),
        );

        if code.baseline == SlotStatus::Added
            && code.staged == SlotStatus::Unmodified
            && baseline_info.is_none()
        {
            baseline_info = Some(FileInfo::absent());
        } else if !code.baseline.is_unmodified()
            && previous.baseline.is_unmodified()
            && baseline_info.is_none()
        {
            baseline_info = staged_info.clone();
        } else if code.baseline.is_unmodified() && !previous.baseline.is_unmodified() {
            staged_info = baseline_info.take();
        }

        if code.is_unmodified() {
            if self.records.remove(path).is_some() {
                log::debug!("{} returned to unmodified, dropping record", path);
            }
            selection.invalidate(path);
        } else {
            log::debug!("{}: {} -> {} ({})", path, previous, code, fragment);
            let icon_id = icon_id.unwrap_or_else(|| self.allocate_icon_id());
            self.records.insert(
                path.to_owned(),
                StatusRecord {
                    path: path.to_owned(),
                    code,
                    icon_id,
                    baseline_info,
                    staged_info,
                },
            );
        }

        previous
    }

    /// Convenience form of [`StatusTable::merge`] for byte-string literals
    pub fn merge_path(
        &mut self,
        path: impl AsRef<[u8]>,
        fragment: StatusFragment,
        selection: &mut SelectionSet,
    ) -> StatusCode {
        self.merge(path.as_ref().as_bstr(), fragment, None, None, selection)
    }
}
