//! Per-block chain maintenance and market settlement
//!
//! [`Database::push_block`] applies one block on top of the head. After the
//! producer bookkeeping (missed slots, witness pay, irreversibility) it runs
//! the maintenance interval if one is due and then sweeps everything whose
//! time has come:
//!
//! - replay-protection records past their expiration
//! - expired proposals, executed all-or-nothing or dropped
//! - expired limit orders, cancelled and refunded
//! - due force settlements, matched against the least collateralized calls
//! - stale price feeds, refreshed, with margin calls and black swan checks
//! - expired withdraw permissions
//!
//! Every block runs in its own undo session. A block that fails at any
//! step is rolled back completely before the error is returned.

#![forbid(unsafe_code)]

pub mod black_swan;
pub mod block;
pub mod config;
pub mod database;
pub mod error;
pub mod evaluator;
pub mod expiry;
pub mod feeds;
pub mod genesis;
pub mod global_state;
pub mod maintenance;
pub mod market;
pub mod objects;
pub mod operations;
pub mod schedule;
pub mod settlement;
pub mod state;

pub use block::{SignedBlock, SignedTransaction};
pub use config::{Checkpoints, NodeProperties, SkipFlags};
pub use database::Database;
pub use error::{ChainError, Result};
pub use evaluator::EvalContext;
pub use genesis::GenesisState;
pub use objects::*;
pub use operations::{Operation, OperationResult};
pub use state::ChainState;
