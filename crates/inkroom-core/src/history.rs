//! Linear undo/redo history of document snapshots.

use crate::elements::ConsolidatedState;

/// Ordered snapshots plus a cursor marking the current one.
///
/// `entries[0]` is always the empty document (images aside) and `current_step` always points
/// at an existing entry. Pushing after an undo discards the redo future.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Vec<ConsolidatedState>,
    current_step: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// A history holding only the empty initial snapshot.
    pub fn new() -> Self {
        Self {
            entries: vec![ConsolidatedState::new()],
            current_step: 0,
        }
    }

    /// Adopt a history received from elsewhere.
    ///
    /// Returns None when the entries are empty, the first entry is not the
    /// empty document (images aside) or the cursor is out of range.
    pub fn from_parts(entries: Vec<ConsolidatedState>, current_step: usize) -> Option<Self> {
        let starts_empty = entries
            .first()
            .is_some_and(|first| first.without_images().is_empty());
        if !starts_empty || current_step >= entries.len() {
            return None;
        }
        Some(Self {
            entries,
            current_step,
        })
    }

    /// Append a snapshot after the cursor, dropping any redo entries.
    pub fn push(&mut self, state: ConsolidatedState) {
        self.entries.truncate(self.current_step + 1);
        self.entries.push(state);
        self.current_step = self.entries.len() - 1;
    }

    /// Step back one snapshot. Returns the new current snapshot.
    pub fn undo(&mut self) -> Option<&ConsolidatedState> {
        if !self.can_undo() {
            return None;
        }
        self.current_step -= 1;
        Some(&self.entries[self.current_step])
    }

    /// Step forward one snapshot. Returns the new current snapshot.
    pub fn redo(&mut self) -> Option<&ConsolidatedState> {
        if !self.can_redo() {
            return None;
        }
        self.current_step += 1;
        Some(&self.entries[self.current_step])
    }

    pub fn can_undo(&self) -> bool {
        self.current_step > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_step + 1 < self.entries.len()
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> &ConsolidatedState {
        &self.entries[self.current_step]
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn entries(&self) -> &[ConsolidatedState] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything back to the single empty snapshot.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
