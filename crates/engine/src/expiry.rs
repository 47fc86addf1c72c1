//! Per-block sweeps of expired records
//!
//! Each sweep works off the front (or, for dedup entries, the back) of an
//! expiration index and stops at the first record still live, so sweeping
//! twice at the same head time is a no-op.

use crate::config::SkipFlags;
use crate::database::Database;
use crate::error::{ChainError, Result};
use crate::evaluator::EvalContext;
use crate::operations::Operation;

impl Database {
    /// Drop replay-protection entries, newest expiration first, while it has passed
    pub fn clear_expired_transactions(&mut self) -> Result<()> {
        let now = self.head_block_time();
        while let Some(&(expiration, id)) = self.state().transactions.indexes().by_expiration.iter().next_back() {
            if now <= expiration {
                break;
            }
            self.state_mut().transactions.remove(id)?;
        }
        Ok(())
    }

    /// Execute or discard every proposal whose time is up
    ///
    /// A proposal that lacks approvals, or whose execution fails, is removed
    /// without effect. Neither is ever retried.
    pub fn clear_expired_proposals(&mut self) -> Result<()> {
        let now = self.head_block_time();
        while let Some(&(expiration, id)) = self.state().proposals.indexes().by_expiration.iter().next() {
            if expiration > now {
                break;
            }
            let authorized = self.state().proposals.get(id)?.is_authorized_to_execute();
            if authorized {
                match self.push_proposal(id) {
                    Ok(_) => continue,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        let proposal = self.state().proposals.get(id)?;
                        log::error!(
                            "failed to apply proposed transaction on its expiration, deleting it: {:?}: {}",
                            proposal,
                            e
                        );
                    }
                }
            } else {
                log::debug!("proposal {} expired without enough approvals", id);
            }
            self.state_mut().proposals.remove(id)?;
        }
        Ok(())
    }

    /// Cancel expired limit orders, then process due force settlements
    pub fn clear_expired_orders(&mut self) -> Result<()> {
        let flags = self.node_properties().skip_flags | SkipFlags::SKIP_AUTHORITY_CHECK;
        self.with_skip_flags(flags, |db| {
            let mut ctx = EvalContext::new(db.node_properties().skip_flags);
            let now = db.head_block_time();
            while let Some(&(expiration, order)) = db.state().limit_orders.indexes().by_expiration.iter().next() {
                if expiration > now {
                    break;
                }
                let seller = db.state().limit_orders.get(order)?.seller;
                let cancel = Operation::LimitOrderCancel {
                    fee_paying_account: seller,
                    order,
                };
                db.apply_operation(&mut ctx, &cancel)?;
            }
            Ok::<(), ChainError>(())
        })?;

        self.clear_expired_settlements()
    }

    pub fn update_withdraw_permissions(&mut self) -> Result<()> {
        let now = self.head_block_time();
        while let Some(&(expiration, id)) = self.state().withdraw_permissions.indexes().by_expiration.iter().next() {
            if expiration > now {
                break;
            }
            self.state_mut().withdraw_permissions.remove(id)?;
        }
        Ok(())
    }
}
