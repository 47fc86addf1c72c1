//! Chain database: state, undo history and block application
//!
//! A block is applied inside its own undo session. If any step fails the
//! session is reverted before the error is returned, so a rejected block
//! never leaves a trace. Successful sessions are retained until the
//! irreversibility window moves past them.

use keeper_common::constants::MAX_UNDO_HISTORY;
use keeper_common::{AccountId, Asset, AssetId, ShareType, TimePointSec, WitnessId};
use keeper_store::{ForkDatabase, StoreResult, UndoStack};

use crate::block::{SignedBlock, SignedTransaction};
use crate::config::{Checkpoints, NodeProperties, SkipFlags};
use crate::error::{ChainError, Result};
use crate::genesis::GenesisState;
use crate::objects::{AccountBalance, DynamicGlobalProperties, GlobalProperties, TransactionRecord};
use crate::state::ChainState;

#[derive(Debug)]
pub struct Database {
    undo: UndoStack<ChainState>,
    fork_db: ForkDatabase<SignedBlock>,
    node_properties: NodeProperties,
    checkpoints: Checkpoints,
}

impl Database {
    pub fn new(state: ChainState, node_properties: NodeProperties, checkpoints: Checkpoints) -> Self {
        Self {
            undo: UndoStack::new(state, MAX_UNDO_HISTORY as usize),
            fork_db: ForkDatabase::new(MAX_UNDO_HISTORY),
            node_properties,
            checkpoints,
        }
    }

    pub fn from_genesis(genesis: &GenesisState, node_properties: NodeProperties, checkpoints: Checkpoints) -> Result<Self> {
        let state = genesis.build()?;
        log::info!(
            "genesis at {} with {} witnesses and {} assets",
            genesis.initial_timestamp,
            state.witnesses.len(),
            state.assets.len()
        );
        Ok(Self::new(state, node_properties, checkpoints))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &ChainState {
        self.undo.state()
    }

    pub(crate) fn state_mut(&mut self) -> &mut ChainState {
        self.undo.state_mut()
    }

    pub fn global_properties(&self) -> &GlobalProperties {
        self.state().global.get()
    }

    pub fn dynamic_global_properties(&self) -> &DynamicGlobalProperties {
        self.state().dynamic.get()
    }

    pub fn head_block_time(&self) -> TimePointSec {
        self.dynamic_global_properties().time
    }

    pub fn head_block_num(&self) -> u32 {
        self.dynamic_global_properties().head_block_number
    }

    pub fn node_properties(&self) -> &NodeProperties {
        &self.node_properties
    }

    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    pub fn fork_db(&self) -> &ForkDatabase<SignedBlock> {
        &self.fork_db
    }

    /// Undo sessions currently retained
    pub fn undo_depth(&self) -> usize {
        self.undo.depth()
    }

    pub fn undo_max_size(&self) -> usize {
        self.undo.max_size()
    }

    /// Run `f` with the node's skip flags replaced by `flags`
    pub fn with_skip_flags<R>(&mut self, flags: SkipFlags, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.node_properties.skip_flags;
        self.node_properties.skip_flags = flags;
        let result = f(self);
        self.node_properties.skip_flags = saved;
        result
    }

    // ========================================================================
    // Undo sessions
    // ========================================================================

    pub fn start_undo_session(&mut self) {
        self.undo.start_session();
    }

    pub fn undo(&mut self) -> StoreResult<()> {
        self.undo.undo()
    }

    pub fn merge(&mut self) -> StoreResult<()> {
        self.undo.merge()
    }

    /// Make every retained session permanent
    pub fn commit(&mut self) {
        self.undo.commit();
    }

    pub(crate) fn set_history_size(&mut self, size: u32) {
        self.undo.set_max_size(size as usize);
        self.fork_db.set_max_size(size);
    }

    // ========================================================================
    // Balances
    // ========================================================================

    pub fn get_balance(&self, owner: AccountId, asset: AssetId) -> Asset {
        let state = self.state();
        let amount = state
            .balances
            .indexes()
            .by_owner_asset
            .get(&(owner, asset))
            .and_then(|id| state.balances.find(*id))
            .map_or(0, |b| b.balance);
        Asset::new(amount, asset)
    }

    /// Add `delta` (possibly negative) to an account's balance
    pub fn adjust_balance(&mut self, owner: AccountId, delta: Asset) -> Result<()> {
        if delta.amount == 0 {
            return Ok(());
        }
        let existing = self
            .state()
            .balances
            .indexes()
            .by_owner_asset
            .get(&(owner, delta.asset_id))
            .copied();

        let available = existing
            .and_then(|id| self.state().balances.find(id))
            .map_or(0, |b| b.balance);
        let updated = available.checked_add(delta.amount).ok_or(keeper_common::PriceError::Overflow)?;
        if updated < 0 {
            return Err(ChainError::InsufficientBalance {
                account: owner,
                asset: delta.asset_id,
                available,
                required: -delta.amount,
            });
        }

        let balances = &mut self.state_mut().balances;
        match existing {
            Some(id) => balances.modify(id, |b| b.balance = updated)?,
            None => {
                balances.create(|id| AccountBalance {
                    id,
                    owner,
                    asset_type: delta.asset_id,
                    balance: updated,
                });
            }
        }
        Ok(())
    }

    /// Credit a block producer's pay to its account
    pub fn deposit_witness_pay(&mut self, witness: WitnessId, amount: ShareType) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let account = self.state().witnesses.get(witness)?.witness_account;
        self.adjust_balance(account, Asset::new(amount, AssetId::CORE))
    }

    /// Adjust an asset's supply by `delta`
    pub(crate) fn adjust_supply(&mut self, asset: AssetId, delta: ShareType) -> Result<()> {
        let current = self.state().assets.get(asset)?.current_supply;
        let updated = current.checked_add(delta).ok_or(keeper_common::PriceError::Overflow)?;
        if updated < 0 {
            return Err(ChainError::invariant(format!("supply of {} would go negative", asset)));
        }
        self.state_mut().assets.modify(asset, |a| a.current_supply = updated)?;
        Ok(())
    }

    // ========================================================================
    // Block application
    // ========================================================================

    /// Apply `block` atomically; on failure the state is left as it was
    pub fn push_block(&mut self, block: SignedBlock) -> Result<()> {
        self.start_undo_session();
        match self.apply_block(&block) {
            Ok(()) => {
                self.fork_db.push(block.block_num(), block);
                Ok(())
            }
            Err(e) => {
                log::error!("block {} rejected: {}", block.block_num(), e);
                self.undo()?;
                Err(e)
            }
        }
    }

    fn apply_block(&mut self, block: &SignedBlock) -> Result<()> {
        let head = self.dynamic_global_properties().head_block_id;
        if block.previous != head {
            return Err(ChainError::UnlinkableBlock {
                num: block.block_num(),
                head,
            });
        }
        // the signer must be a registered witness
        self.state().witnesses.get(block.witness)?;

        for trx in &block.transactions {
            self.apply_transaction(trx)?;
        }

        self.update_global_dynamic_data(block)?;
        self.update_signing_witness(block.witness, block)?;
        self.update_last_irreversible_block()?;

        let maintenance_needed = self.dynamic_global_properties().next_maintenance_time <= block.timestamp;
        if maintenance_needed {
            self.perform_chain_maintenance(block)?;
        }

        self.clear_expired_transactions()?;
        self.clear_expired_proposals()?;
        self.clear_expired_orders()?;
        self.update_expired_feeds()?;
        self.update_withdraw_permissions()?;

        // late, because slot times above depend on the previous flag
        self.update_maintenance_flag(maintenance_needed);
        Ok(())
    }

    /// Record a transaction for replay protection
    fn apply_transaction(&mut self, trx: &SignedTransaction) -> Result<()> {
        let now = self.head_block_time();
        if trx.expiration < now {
            return Err(ChainError::TransactionExpired {
                expiration: trx.expiration,
                now,
            });
        }
        if self.state().transactions.indexes().by_trx_id.contains_key(&trx.id) {
            return Err(ChainError::DuplicateTransaction(trx.id));
        }
        self.state_mut().transactions.create(|id| TransactionRecord {
            id,
            trx_id: trx.id,
            expiration: trx.expiration,
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small chains for unit tests

    use super::*;
    use crate::genesis::GenesisState;
    use keeper_common::BlockId;

    pub const GENESIS_TIME: u32 = 1_000;

    pub fn genesis(witnesses: u64) -> GenesisState {
        let mut text = format!("initial_timestamp = {}\nwitness_budget = 1000000\n", GENESIS_TIME);
        for i in 0..witnesses {
            text.push_str(&format!("[[witnesses]]\naccount = {}\n", 100 + i));
        }
        GenesisState::from_toml(&text).unwrap()
    }

    pub fn database(genesis: &GenesisState) -> Database {
        Database::from_genesis(genesis, NodeProperties::default(), Checkpoints::new()).unwrap()
    }

    /// Block filling `slot` slots after the head, signed by `witness`
    pub fn block_at_slot(db: &Database, slot: u32, witness: WitnessId) -> SignedBlock {
        SignedBlock {
            previous: db.dynamic_global_properties().head_block_id,
            timestamp: db.get_slot_time(slot),
            witness,
            transactions: Vec::new(),
        }
    }

    /// Push a block in the next slot signed by whoever is scheduled
    pub fn push_next(db: &mut Database) -> BlockId {
        let witness = db.get_scheduled_witness(1);
        let block = block_at_slot(db, 1, witness);
        let id = block.id();
        db.push_block(block).unwrap();
        id
    }
}
