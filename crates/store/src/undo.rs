//! Undo sessions across a set of tables

use crate::error::{StoreError, StoreResult};

/// Anything that can open, revert, fold and drop undo sessions
///
/// A composite state implements this by forwarding to every table it owns,
/// so all tables always hold the same number of sessions.
pub trait Undoable {
    fn start_session(&mut self);

    /// Revert and close the innermost session
    fn undo(&mut self) -> StoreResult<()>;

    /// Fold the innermost session into the one below it
    fn merge(&mut self) -> StoreResult<()>;

    /// Forget the outermost session; its changes become permanent
    fn commit_oldest(&mut self);
}

/// Owns the chain state and bounds how many sessions it retains
#[derive(Debug)]
pub struct UndoStack<S: Undoable> {
    state: S,
    depth: usize,
    max_size: usize,
}

impl<S: Undoable> UndoStack<S> {
    pub fn new(state: S, max_size: usize) -> Self {
        Self {
            state,
            depth: 0,
            max_size: max_size.max(1),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Number of open sessions
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn start_session(&mut self) {
        self.state.start_session();
        self.depth += 1;
    }

    pub fn undo(&mut self) -> StoreResult<()> {
        if self.depth == 0 {
            return Err(StoreError::NoSession);
        }
        self.state.undo()?;
        self.depth -= 1;
        Ok(())
    }

    pub fn merge(&mut self) -> StoreResult<()> {
        if self.depth == 0 {
            return Err(StoreError::NoSession);
        }
        self.state.merge()?;
        self.depth -= 1;
        Ok(())
    }

    /// Make every open session permanent
    pub fn commit(&mut self) {
        while self.depth > 0 {
            self.state.commit_oldest();
            self.depth -= 1;
        }
    }

    /// Retain at most `max_size` sessions, committing the oldest beyond that
    ///
    /// Nested sessions opened afterwards may exceed the bound until the next
    /// call; they are always closed again before the enclosing one.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        while self.depth > self.max_size {
            self.state.commit_oldest();
            self.depth -= 1;
            log::debug!("undo history trimmed to {} sessions", self.depth);
        }
    }
}
