//! Expiring records: proposals, withdraw permissions, dedup entries

use std::collections::{BTreeMap, BTreeSet};

use keeper_common::{
    AccountId, Asset, ProposalId, TimePointSec, TransactionId, TransactionRecordId, WithdrawPermissionId,
};
use keeper_store::SecondaryIndex;
use serde::Serialize;

use super::impl_object;
use crate::operations::Operation;

/// Deferred transaction waiting for approvals
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub expiration_time: TimePointSec,
    pub proposed_ops: Vec<Operation>,
    pub required_approvals: BTreeSet<AccountId>,
    pub available_approvals: BTreeSet<AccountId>,
}

impl Proposal {
    /// Every required approval has been given
    pub fn is_authorized_to_execute(&self) -> bool {
        self.required_approvals.is_subset(&self.available_approvals)
    }
}

#[derive(Debug, Default)]
pub struct ProposalIndex {
    pub by_expiration: BTreeSet<(TimePointSec, ProposalId)>,
}

impl SecondaryIndex<Proposal> for ProposalIndex {
    fn insert(&mut self, p: &Proposal) {
        self.by_expiration.insert((p.expiration_time, p.id));
    }

    fn remove(&mut self, p: &Proposal) {
        self.by_expiration.remove(&(p.expiration_time, p.id));
    }
}

impl_object!(Proposal, ProposalId, ProposalIndex, "proposal");

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WithdrawPermission {
    pub id: WithdrawPermissionId,
    pub withdraw_from_account: AccountId,
    pub authorized_account: AccountId,
    pub withdrawal_limit: Asset,
    pub expiration: TimePointSec,
}

#[derive(Debug, Default)]
pub struct WithdrawPermissionIndex {
    pub by_expiration: BTreeSet<(TimePointSec, WithdrawPermissionId)>,
}

impl SecondaryIndex<WithdrawPermission> for WithdrawPermissionIndex {
    fn insert(&mut self, w: &WithdrawPermission) {
        self.by_expiration.insert((w.expiration, w.id));
    }

    fn remove(&mut self, w: &WithdrawPermission) {
        self.by_expiration.remove(&(w.expiration, w.id));
    }
}

impl_object!(WithdrawPermission, WithdrawPermissionId, WithdrawPermissionIndex, "withdraw permission");

/// Replay-protection entry for an applied transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: TransactionRecordId,
    pub trx_id: TransactionId,
    pub expiration: TimePointSec,
}

#[derive(Debug, Default)]
pub struct TransactionIndex {
    pub by_expiration: BTreeSet<(TimePointSec, TransactionRecordId)>,
    pub by_trx_id: BTreeMap<TransactionId, TransactionRecordId>,
}

impl SecondaryIndex<TransactionRecord> for TransactionIndex {
    fn insert(&mut self, t: &TransactionRecord) {
        self.by_expiration.insert((t.expiration, t.id));
        self.by_trx_id.insert(t.trx_id, t.id);
    }

    fn remove(&mut self, t: &TransactionRecord) {
        self.by_expiration.remove(&(t.expiration, t.id));
        self.by_trx_id.remove(&t.trx_id);
    }
}

impl_object!(TransactionRecord, TransactionRecordId, TransactionIndex, "transaction");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_needs_every_approval() {
        let mut p = Proposal {
            id: ProposalId(0),
            proposer: AccountId(1),
            expiration_time: TimePointSec(10),
            proposed_ops: Vec::new(),
            required_approvals: [AccountId(1), AccountId(2)].into_iter().collect(),
            available_approvals: [AccountId(1)].into_iter().collect(),
        };
        assert!(!p.is_authorized_to_execute());
        p.available_approvals.insert(AccountId(2));
        p.available_approvals.insert(AccountId(3));
        assert!(p.is_authorized_to_execute());
    }
}
