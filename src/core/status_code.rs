//! Type-safe two-slot status codes.
//!
//! Every path the core tracks carries a [`StatusCode`]: one [`SlotStatus`] for the
//! baseline-vs-staged comparison and one for the staged-vs-worktree comparison.
//! Stream parsers describe what they learned about a path with a [`StatusFragment`],
//! where a slot the stream does not cover is [`SlotUpdate::Keep`].
//!
//! # Public API
//! - [`SlotStatus`]: The status alphabet shared by both slots
//! - [`SlotUpdate`]: Either keep the current slot value or set a new one
//! - [`StatusFragment`]: A pair of slot updates produced by one record
//! - [`StatusCode`]: The stored two-slot code of a record
//!
//! # Character Form
//! Codes print as two characters, `_` for unmodified and `O` for untracked,
//! e.g. `M_` (staged for commit) or `_O` (untracked).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One slot of a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// No difference in this slot (_)
    Unmodified,
    /// Newly added (A)
    Added,
    /// Content modified (M)
    Modified,
    /// Deleted (D)
    Deleted,
    /// File type changed (T)
    TypeChanged,
    /// Unmerged, needs conflict resolution (U)
    Unmerged,
    /// Present in the worktree but unknown to the index (O)
    Untracked,
}

impl SlotStatus {
    /// Every member of the alphabet, in declaration order
    pub const ALL: [SlotStatus; 7] = [
        SlotStatus::Unmodified,
        SlotStatus::Added,
        SlotStatus::Modified,
        SlotStatus::Deleted,
        SlotStatus::TypeChanged,
        SlotStatus::Unmerged,
        SlotStatus::Untracked,
    ];

    pub fn as_char(self) -> char {
        match self {
            SlotStatus::Unmodified => '_',
            SlotStatus::Added => 'A',
            SlotStatus::Modified => 'M',
            SlotStatus::Deleted => 'D',
            SlotStatus::TypeChanged => 'T',
            SlotStatus::Unmerged => 'U',
            SlotStatus::Untracked => 'O',
        }
    }

    pub fn from_char(c: char) -> Option<SlotStatus> {
        match c {
            '_' => Some(SlotStatus::Unmodified),
            'A' => Some(SlotStatus::Added),
            'M' => Some(SlotStatus::Modified),
            'D' => Some(SlotStatus::Deleted),
            'T' => Some(SlotStatus::TypeChanged),
            'U' => Some(SlotStatus::Unmerged),
            'O' => Some(SlotStatus::Untracked),
            _ => None,
        }
    }

    pub fn is_unmodified(self) -> bool {
        self == SlotStatus::Unmodified
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// How a fragment affects one slot of an existing code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotUpdate {
    /// Wildcard: retain whatever the slot currently holds
    Keep,
    /// Overwrite the slot; `Set(Unmodified)` force-clears it
    Set(SlotStatus),
}

impl SlotUpdate {
    /// Resolve the update against the slot's current value
    pub fn apply(self, current: SlotStatus) -> SlotStatus {
        match self {
            SlotUpdate::Keep => current,
            SlotUpdate::Set(status) => status,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            SlotUpdate::Keep => '?',
            SlotUpdate::Set(status) => status.as_char(),
        }
    }
}

/// The status information one record contributes for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusFragment {
    pub baseline: SlotUpdate,
    pub staged: SlotUpdate,
}

impl StatusFragment {
    pub fn new(baseline: SlotUpdate, staged: SlotUpdate) -> Self {
        Self { baseline, staged }
    }

    /// Fragment from a tree-vs-index record: explicit baseline slot, staged slot kept
    pub fn baseline(status: SlotStatus) -> Self {
        Self::new(SlotUpdate::Set(status), SlotUpdate::Keep)
    }

    /// Fragment from an index-vs-worktree record: baseline slot kept, explicit staged slot
    pub fn staged(status: SlotStatus) -> Self {
        Self::new(SlotUpdate::Keep, SlotUpdate::Set(status))
    }

    /// Fragment from an untracked listing record
    pub fn untracked() -> Self {
        Self::staged(SlotStatus::Untracked)
    }

    /// Fragment that keeps both slots
    pub fn keep() -> Self {
        Self::new(SlotUpdate::Keep, SlotUpdate::Keep)
    }

    /// Parse the two-character form, `?` being the wildcard (e.g. `"A?"`, `"?O"`)
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let baseline = parse_update(chars.next()?)?;
        let staged = parse_update(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self::new(baseline, staged))
    }
}

fn parse_update(c: char) -> Option<SlotUpdate> {
    if c == '?' {
        Some(SlotUpdate::Keep)
    } else {
        SlotStatus::from_char(c).map(SlotUpdate::Set)
    }
}

impl fmt::Display for StatusFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.baseline.as_char(), self.staged.as_char())
    }
}

/// The stored (baseline-vs-staged, staged-vs-worktree) code of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode {
    pub baseline: SlotStatus,
    pub staged: SlotStatus,
}

impl StatusCode {
    pub const UNMODIFIED: StatusCode = StatusCode {
        baseline: SlotStatus::Unmodified,
        staged: SlotStatus::Unmodified,
    };

    pub fn new(baseline: SlotStatus, staged: SlotStatus) -> Self {
        Self { baseline, staged }
    }

    /// Parse the two-character form (e.g. `"M_"`)
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let baseline = SlotStatus::from_char(chars.next()?)?;
        let staged = SlotStatus::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self::new(baseline, staged))
    }

    pub fn is_unmodified(&self) -> bool {
        *self == Self::UNMODIFIED
    }

    pub fn has_conflict(&self) -> bool {
        self.baseline == SlotStatus::Unmerged || self.staged == SlotStatus::Unmerged
    }

    /// What the worktree list shows for this path: an unmerged baseline slot
    /// overrides the staged-vs-worktree slot
    pub fn worktree_column(&self) -> SlotStatus {
        if self.baseline == SlotStatus::Unmerged {
            SlotStatus::Unmerged
        } else {
            self.staged
        }
    }

    /// What the staged list shows for this path; unmerged entries are listed
    /// with the worktree instead
    pub fn staged_column(&self) -> SlotStatus {
        if self.baseline == SlotStatus::Unmerged {
            SlotStatus::Unmodified
        } else {
            self.baseline
        }
    }

    /// Conflict visible in the worktree list (`U?` or `_U`)
    pub fn is_worktree_conflict(&self) -> bool {
        self.baseline == SlotStatus::Unmerged
            || (self.baseline == SlotStatus::Unmodified && self.staged == SlotStatus::Unmerged)
    }

    /// Human-readable description used by the presentation layer
    pub fn description(&self) -> &'static str {
        use SlotStatus::*;
        match (self.baseline, self.staged) {
            (Unmodified, Unmodified) => "Unmodified",

            (Unmodified, Modified) => "Modified, not staged",
            (Modified, Unmodified) => "Staged for commit",
            (Modified, Modified) => "Portions staged for commit",
            (Modified, Deleted) => "Staged for commit, missing",

            (Unmodified, TypeChanged) => "File type changed, not staged",
            (Modified, TypeChanged) | (Added, TypeChanged) => {
                "File type changed, old type staged for commit"
            }
            (TypeChanged, Unmodified) => "File type changed, staged",
            (TypeChanged, Modified) => "File type change staged, modification not staged",
            (TypeChanged, Deleted) => "File type change staged, file missing",

            (Unmodified, Untracked) => "Untracked, not staged",
            (Added, Unmodified) => "Staged for commit",
            (Added, Modified) => "Portions staged for commit",
            (Added, Deleted) => "Staged for commit, missing",

            (Unmodified, Deleted) => "Missing",
            (Deleted, Unmodified) => "Staged for removal",
            (Deleted, Untracked) => "Staged for removal, still present",

            (Unmerged, _) | (_, Unmerged) => "Requires merge resolution",

            _ => "Unknown status",
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::UNMODIFIED
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.baseline, self.staged)
    }
}
