//! Object store errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("no undo session is open")]
    NoSession,

    #[error("modification changed the id of {kind} {id}")]
    IdChanged { kind: &'static str, id: u64 },
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;
