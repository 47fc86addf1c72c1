//! In-memory object store with undo sessions
//!
//! Records live in typed [`Table`]s addressed by stable integer ids. Each
//! table keeps its own ordered secondary indexes in sync on every mutation,
//! and records the pre-image of every mutation in the innermost open undo
//! session so a whole block can be rolled back atomically.
//!
//! Storage is pluggable the same way the rest of the stack is: the engine
//! declares its record kinds and indexes, this crate only knows how to keep
//! them consistent and reversible.

#![forbid(unsafe_code)]

pub mod error;
pub mod fork;
pub mod singleton;
pub mod table;
pub mod undo;

pub use error::{StoreError, StoreResult};
pub use fork::ForkDatabase;
pub use singleton::Singleton;
pub use table::{Object, SecondaryIndex, Table};
pub use undo::{UndoStack, Undoable};
