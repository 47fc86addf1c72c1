//! Engine errors
//!
//! Fatal conditions abort the whole block; `push_block` rolls its undo
//! session back and hands the error to the caller. Recoverable conditions
//! are caught by the sweep that raised them and never reach this boundary.

use keeper_common::{AccountId, AssetId, BlockId, LimitOrderId, PriceError, ShareType, TimePointSec, TransactionId};
use keeper_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Retained undo history cannot reach back to the last irreversible block
    #[error(
        "not enough undo history: head {head}, last irreversible {last_irreversible}, \
         max undo {max_undo}; add a checkpoint to continue past this point"
    )]
    UndoHistoryExhausted {
        head: u32,
        last_irreversible: u32,
        max_undo: u32,
    },

    /// A black swan was found where the caller forbade one
    #[error("black swan detected for {asset} where it is not allowed to trigger")]
    BlackSwanDisallowed { asset: AssetId },

    /// A settlement match would take more collateral than the position holds
    #[error("black swan while matching settlement against call of {asset}")]
    BlackSwanMatch { asset: AssetId },

    #[error("{asset} has already been globally settled")]
    AlreadySettled { asset: AssetId },

    #[error("missing authority of {account}")]
    MissingAuthority { account: AccountId },

    #[error("{account} does not own limit order {order}")]
    NotOrderOwner { account: AccountId, order: LimitOrderId },

    #[error("insufficient balance of {asset} for {account}: has {available}, needs {required}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        available: ShareType,
        required: ShareType,
    },

    #[error("block {num} does not link to head {head}")]
    UnlinkableBlock { num: u32, head: BlockId },

    #[error("duplicate transaction {0:?}")]
    DuplicateTransaction(TransactionId),

    #[error("transaction expired at {expiration}, head time is {now}")]
    TransactionExpired { expiration: TimePointSec, now: TimePointSec },

    #[error("operation amount must be positive")]
    NonPositiveAmount,

    #[error("invalid genesis: {0}")]
    Genesis(String),

    /// A condition that indicates a bug if reached
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Price(#[from] PriceError),
}

impl ChainError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        ChainError::Invariant(msg.into())
    }

    /// Conditions after which the block cannot be applied at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainError::UndoHistoryExhausted { .. }
                | ChainError::BlackSwanDisallowed { .. }
                | ChainError::Invariant(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, ChainError>;
