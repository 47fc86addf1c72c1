//! Single-instance records (global properties)

use std::collections::VecDeque;

use crate::error::{StoreError, StoreResult};
use crate::undo::Undoable;

/// A record that always exists exactly once
///
/// Each open undo session holds the value as it was before the session's
/// first modification, or `None` if the session has not touched it.
#[derive(Debug)]
pub struct Singleton<T: Clone> {
    value: T,
    undo: VecDeque<Option<T>>,
}

impl<T: Clone> Singleton<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            undo: VecDeque::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn modify(&mut self, mutate: impl FnOnce(&mut T)) {
        if let Some(slot) = self.undo.back_mut() {
            if slot.is_none() {
                *slot = Some(self.value.clone());
            }
        }
        mutate(&mut self.value);
    }
}

impl<T: Clone> Undoable for Singleton<T> {
    fn start_session(&mut self) {
        self.undo.push_back(None);
    }

    fn undo(&mut self) -> StoreResult<()> {
        let slot = self.undo.pop_back().ok_or(StoreError::NoSession)?;
        if let Some(old) = slot {
            self.value = old;
        }
        Ok(())
    }

    fn merge(&mut self) -> StoreResult<()> {
        let slot = self.undo.pop_back().ok_or(StoreError::NoSession)?;
        if let Some(prev) = self.undo.back_mut() {
            if prev.is_none() {
                *prev = slot;
            }
        }
        Ok(())
    }

    fn commit_oldest(&mut self) {
        self.undo.pop_front();
    }
}
