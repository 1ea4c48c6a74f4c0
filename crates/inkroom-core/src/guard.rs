//! Remote-update guard.
//!
//! While the guard is raised no store mutation may publish. The room listener
//! raises it for the duration of applying a peer's snapshot so that state it
//! just received is never echoed back to the room.

use std::cell::Cell;
use std::rc::Rc;

/// Shared flag marking "a remote snapshot is being applied".
///
/// Clones share the same flag. The store and the listener each hold one.
#[derive(Debug, Clone, Default)]
pub struct RemoteGuard {
    active: Rc<Cell<bool>>,
}

impl RemoteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Set the flag directly. Prefer [`RemoteGuard::enter`].
    pub fn set(&self, active: bool) {
        self.active.set(active);
    }

    /// Raise the guard until the returned scope is dropped.
    ///
    /// The previous value is restored on drop, including during unwinding, so
    /// nested scopes and panics cannot leave the flag stuck on.
    #[must_use = "the guard is lowered as soon as the scope is dropped"]
    pub fn enter(&self) -> GuardScope {
        let previous = self.active.replace(true);
        GuardScope {
            active: Rc::clone(&self.active),
            previous,
        }
    }
}

/// Scope returned by [`RemoteGuard::enter`].
#[derive(Debug)]
pub struct GuardScope {
    active: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        self.active.set(self.previous);
    }
}
