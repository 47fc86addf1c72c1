//! Typed record tables with ordered secondary indexes

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

use crate::error::{StoreError, StoreResult};
use crate::undo::Undoable;

/// A record kind stored in a [`Table`]
pub trait Object: Clone + Debug {
    type Id: Copy + Ord + Debug + From<u64> + Into<u64>;

    /// Secondary indexes maintained for this kind; `()` for none
    type Index: SecondaryIndex<Self>;

    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
}

/// Ordered secondary index over the records of one table
///
/// Keys must end with the record id so iteration is total and identical on
/// every node.
pub trait SecondaryIndex<T>: Default + Debug {
    fn insert(&mut self, object: &T);
    fn remove(&mut self, object: &T);
}

impl<T> SecondaryIndex<T> for () {
    fn insert(&mut self, _object: &T) {}
    fn remove(&mut self, _object: &T) {}
}

/// Pre-images captured by one undo session
#[derive(Debug)]
struct UndoState<T> {
    /// Values of records modified in this session, as they were when it opened
    old_values: BTreeMap<u64, T>,
    /// Records created in this session
    new_ids: BTreeSet<u64>,
    /// Records removed in this session, as they were when it opened
    removed: BTreeMap<u64, T>,
    old_next_id: u64,
}

impl<T> UndoState<T> {
    fn new(old_next_id: u64) -> Self {
        Self {
            old_values: BTreeMap::new(),
            new_ids: BTreeSet::new(),
            removed: BTreeMap::new(),
            old_next_id,
        }
    }
}

#[derive(Debug)]
pub struct Table<T: Object> {
    objects: BTreeMap<u64, T>,
    index: T::Index,
    next_id: u64,
    undo: VecDeque<UndoState<T>>,
}

impl<T: Object> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> Table<T> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            index: T::Index::default(),
            next_id: 0,
            undo: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.objects.get(&id.into())
    }

    pub fn get(&self, id: T::Id) -> StoreResult<&T> {
        let key: u64 = id.into();
        self.objects.get(&key).ok_or(StoreError::NotFound { kind: T::KIND, id: key })
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.objects.contains_key(&id.into())
    }

    /// Records in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.objects.values()
    }

    pub fn indexes(&self) -> &T::Index {
        &self.index
    }

    /// Insert a record built from the next free id
    pub fn create(&mut self, build: impl FnOnce(T::Id) -> T) -> T::Id {
        let key = self.next_id;
        self.next_id += 1;
        let object = build(T::Id::from(key));
        self.index.insert(&object);
        self.objects.insert(key, object);
        if let Some(state) = self.undo.back_mut() {
            state.new_ids.insert(key);
        }
        T::Id::from(key)
    }

    /// Mutate a record in place, capturing its pre-image for undo
    pub fn modify(&mut self, id: T::Id, mutate: impl FnOnce(&mut T)) -> StoreResult<()> {
        let key: u64 = id.into();
        let old = self.get(id)?.clone();
        let mut updated = old.clone();
        mutate(&mut updated);
        if updated.id().into() != key {
            return Err(StoreError::IdChanged { kind: T::KIND, id: key });
        }

        self.index.remove(&old);
        self.index.insert(&updated);
        self.objects.insert(key, updated);

        if let Some(state) = self.undo.back_mut() {
            if !state.new_ids.contains(&key) && !state.old_values.contains_key(&key) {
                state.old_values.insert(key, old);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, id: T::Id) -> StoreResult<T> {
        let key: u64 = id.into();
        let object = self
            .objects
            .remove(&key)
            .ok_or(StoreError::NotFound { kind: T::KIND, id: key })?;
        self.index.remove(&object);

        if let Some(state) = self.undo.back_mut() {
            if state.new_ids.remove(&key) {
                return Ok(object);
            }
            if let Some(original) = state.old_values.remove(&key) {
                state.removed.insert(key, original);
            } else {
                state.removed.insert(key, object.clone());
            }
        }
        Ok(object)
    }
}

impl<T: Object> Undoable for Table<T> {
    fn start_session(&mut self) {
        self.undo.push_back(UndoState::new(self.next_id));
    }

    fn undo(&mut self) -> StoreResult<()> {
        let state = self.undo.pop_back().ok_or(StoreError::NoSession)?;

        for (key, old) in state.old_values {
            if let Some(current) = self.objects.remove(&key) {
                self.index.remove(&current);
            }
            self.index.insert(&old);
            self.objects.insert(key, old);
        }
        for key in state.new_ids {
            if let Some(current) = self.objects.remove(&key) {
                self.index.remove(&current);
            }
        }
        self.next_id = state.old_next_id;
        for (key, object) in state.removed {
            self.index.insert(&object);
            self.objects.insert(key, object);
        }
        Ok(())
    }

    fn merge(&mut self) -> StoreResult<()> {
        let state = self.undo.pop_back().ok_or(StoreError::NoSession)?;
        // merging the outermost session is a commit
        let Some(prev) = self.undo.back_mut() else {
            return Ok(());
        };

        for (key, old) in state.old_values {
            if prev.new_ids.contains(&key) || prev.old_values.contains_key(&key) {
                continue;
            }
            prev.old_values.insert(key, old);
        }
        prev.new_ids.extend(state.new_ids);
        for (key, object) in state.removed {
            if prev.new_ids.remove(&key) {
                continue;
            }
            if let Some(original) = prev.old_values.remove(&key) {
                prev.removed.insert(key, original);
            } else {
                prev.removed.insert(key, object);
            }
        }
        Ok(())
    }

    fn commit_oldest(&mut self) {
        self.undo.pop_front();
    }
}
