//! Operation evaluation and proposal execution
//!
//! Validation that a caller may suppress is listed in the [`EvalContext`]
//! handed to every call, never read from ambient state, so a sweep and the
//! proposals it triggers each see exactly the checks they asked for.

use std::collections::BTreeSet;

use keeper_common::{AccountId, Asset, LimitOrderId, ProposalId};

use crate::config::SkipFlags;
use crate::database::Database;
use crate::error::{ChainError, Result};
use crate::operations::{Operation, OperationResult};

/// Shared state of one evaluation pass
#[derive(Clone, Debug, Default)]
pub struct EvalContext {
    pub skip: SkipFlags,
    /// Accounts whose authority the evaluated operations carry
    pub approvals: BTreeSet<AccountId>,
    /// Results of every operation applied so far, in order
    pub results: Vec<OperationResult>,
}

impl EvalContext {
    pub fn new(skip: SkipFlags) -> Self {
        Self {
            skip,
            ..Default::default()
        }
    }

    pub fn with_approvals(skip: SkipFlags, approvals: BTreeSet<AccountId>) -> Self {
        Self {
            skip,
            approvals,
            results: Vec::new(),
        }
    }

    pub fn verify_authority(&self, op: &Operation) -> Result<()> {
        if self.skip.contains(SkipFlags::SKIP_AUTHORITY_CHECK) {
            return Ok(());
        }
        let account = op.fee_payer();
        if !self.approvals.contains(&account) {
            return Err(ChainError::MissingAuthority { account });
        }
        Ok(())
    }
}

impl Database {
    pub fn apply_operation(&mut self, ctx: &mut EvalContext, op: &Operation) -> Result<OperationResult> {
        ctx.verify_authority(op)?;
        let result = match op {
            Operation::LimitOrderCancel {
                fee_paying_account,
                order,
            } => self.evaluate_limit_order_cancel(*fee_paying_account, *order)?,
            Operation::Transfer { from, to, amount } => self.evaluate_transfer(*from, *to, *amount)?,
        };
        ctx.results.push(result.clone());
        Ok(result)
    }

    fn evaluate_limit_order_cancel(&mut self, account: AccountId, order: LimitOrderId) -> Result<OperationResult> {
        let existing = self.state().limit_orders.get(order)?;
        if existing.seller != account {
            return Err(ChainError::NotOrderOwner { account, order });
        }
        let base = existing.sell_price.base.asset_id;
        let quote = existing.sell_price.quote.asset_id;

        let refunded = self.cancel_limit_order(order)?;
        // the cancelled order may have been holding off a margin call
        self.check_call_orders(base, true)?;
        self.check_call_orders(quote, true)?;
        Ok(OperationResult::Refunded(refunded))
    }

    fn evaluate_transfer(&mut self, from: AccountId, to: AccountId, amount: Asset) -> Result<OperationResult> {
        if amount.amount <= 0 {
            return Err(ChainError::NonPositiveAmount);
        }
        self.adjust_balance(from, Asset::new(-amount.amount, amount.asset_id))?;
        self.adjust_balance(to, amount)?;
        Ok(OperationResult::Void)
    }

    /// Execute every operation of a proposal, then remove it, all or nothing
    ///
    /// Runs in a nested undo session that is merged into the block's session
    /// on success and reverted on failure.
    pub fn push_proposal(&mut self, id: ProposalId) -> Result<Vec<OperationResult>> {
        let proposal = self.state().proposals.get(id)?.clone();
        let mut ctx = EvalContext::with_approvals(self.node_properties().skip_flags, proposal.available_approvals);

        self.start_undo_session();
        match self.apply_proposed_ops(&mut ctx, id, &proposal.proposed_ops) {
            Ok(()) => {
                self.merge()?;
                Ok(ctx.results)
            }
            Err(e) => {
                self.undo()?;
                Err(e)
            }
        }
    }

    fn apply_proposed_ops(&mut self, ctx: &mut EvalContext, id: ProposalId, ops: &[Operation]) -> Result<()> {
        for op in ops {
            self.apply_operation(ctx, op)?;
        }
        self.state_mut().proposals.remove(id)?;
        Ok(())
    }
}
