//! Single-writer advisory lock over the index.
//!
//! At most one lock is held at a time, which is what keeps rescans (and any
//! other index operation) from overlapping. A placeholder `begin-<kind>` state
//! lets a caller reserve the lock before the real work starts; a later
//! [`LockManager::acquire`] of the same kind upgrades it.
//!
//! Registered listeners are told to disable themselves on acquire and to
//! re-enable on release.

use std::fmt;

/// What the lock is held for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Update,
}

impl LockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockKind::Read => "read",
            LockKind::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    None,
    Held(LockKind),
    /// Reserved; only an acquire of the same kind may take it
    Pending(LockKind),
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::None => write!(f, "none"),
            LockState::Held(kind) => write!(f, "{}", kind.as_str()),
            LockState::Pending(kind) => write!(f, "begin-{}", kind.as_str()),
        }
    }
}

/// Callback toggling a UI element; receives `true` when it may be enabled
pub type LockListener = Box<dyn FnMut(bool) + Send>;

pub struct LockManager {
    state: LockState,
    disable_on_lock: Vec<LockListener>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            state: LockState::None,
            disable_on_lock: Vec::new(),
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state != LockState::None
    }

    /// Register an element that must be disabled while the lock is held
    pub fn disable_while_locked(&mut self, listener: LockListener) {
        self.disable_on_lock.push(listener);
    }

    /// Reserve the lock for a later acquire of `kind`
    pub fn begin(&mut self, kind: LockKind) -> bool {
        if self.state == LockState::None {
            self.state = LockState::Pending(kind);
            true
        } else {
            false
        }
    }

    pub fn acquire(&mut self, kind: LockKind) -> bool {
        match self.state {
            LockState::None => {
                self.state = LockState::Held(kind);
                self.notify(false);
                true
            }
            LockState::Pending(pending) if pending == kind => {
                self.state = LockState::Held(kind);
                true
            }
            _ => {
                log::debug!("lock {} refused, held as {}", kind.as_str(), self.state);
                false
            }
        }
    }

    pub fn release(&mut self) {
        self.state = LockState::None;
        self.notify(true);
    }

    fn notify(&mut self, enabled: bool) {
        for listener in &mut self.disable_on_lock {
            listener(enabled);
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("state", &self.state)
            .field("listeners", &self.disable_on_lock.len())
            .finish()
    }
}
