//! Operations the engine applies on its own behalf or on behalf of proposals

use keeper_common::{AccountId, Asset, LimitOrderId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Cancel an open limit order and refund what is left of it
    LimitOrderCancel {
        fee_paying_account: AccountId,
        order: LimitOrderId,
    },
    /// Move an amount between two accounts
    Transfer { from: AccountId, to: AccountId, amount: Asset },
}

impl Operation {
    /// Account whose authority the operation needs
    pub fn fee_payer(&self) -> AccountId {
        match self {
            Operation::LimitOrderCancel { fee_paying_account, .. } => *fee_paying_account,
            Operation::Transfer { from, .. } => *from,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum OperationResult {
    Void,
    /// Amount returned to the order's seller
    Refunded(Asset),
}
