//! Every table the engine reads or writes

use keeper_store::{Singleton, StoreResult, Table, Undoable};

use crate::objects::{
    AccountBalance, AssetObject, BitassetData, CallOrder, DynamicGlobalProperties, ForceSettlement,
    GlobalProperties, LimitOrder, Proposal, TransactionRecord, Witness, WithdrawPermission,
};

#[derive(Debug)]
pub struct ChainState {
    pub global: Singleton<GlobalProperties>,
    pub dynamic: Singleton<DynamicGlobalProperties>,
    pub witnesses: Table<Witness>,
    pub assets: Table<AssetObject>,
    pub bitassets: Table<BitassetData>,
    pub balances: Table<AccountBalance>,
    pub call_orders: Table<CallOrder>,
    pub limit_orders: Table<LimitOrder>,
    pub settlements: Table<ForceSettlement>,
    pub proposals: Table<Proposal>,
    pub withdraw_permissions: Table<WithdrawPermission>,
    pub transactions: Table<TransactionRecord>,
}

impl ChainState {
    pub fn new(global: GlobalProperties, dynamic: DynamicGlobalProperties) -> Self {
        Self {
            global: Singleton::new(global),
            dynamic: Singleton::new(dynamic),
            witnesses: Table::new(),
            assets: Table::new(),
            bitassets: Table::new(),
            balances: Table::new(),
            call_orders: Table::new(),
            limit_orders: Table::new(),
            settlements: Table::new(),
            proposals: Table::new(),
            withdraw_permissions: Table::new(),
            transactions: Table::new(),
        }
    }

    fn tables(&mut self) -> [&mut dyn Undoable; 12] {
        [
            &mut self.global,
            &mut self.dynamic,
            &mut self.witnesses,
            &mut self.assets,
            &mut self.bitassets,
            &mut self.balances,
            &mut self.call_orders,
            &mut self.limit_orders,
            &mut self.settlements,
            &mut self.proposals,
            &mut self.withdraw_permissions,
            &mut self.transactions,
        ]
    }
}

impl Undoable for ChainState {
    fn start_session(&mut self) {
        for table in self.tables() {
            table.start_session();
        }
    }

    fn undo(&mut self) -> StoreResult<()> {
        self.tables().into_iter().try_for_each(|table| table.undo())
    }

    fn merge(&mut self) -> StoreResult<()> {
        self.tables().into_iter().try_for_each(|table| table.merge())
    }

    fn commit_oldest(&mut self) {
        for table in self.tables() {
            table.commit_oldest();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::genesis;
    use crate::objects::Witness;
    use keeper_common::AccountId;

    fn add_witness(state: &mut ChainState) {
        state.witnesses.create(|id| Witness {
            id,
            witness_account: AccountId(200),
            last_aslot: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
        });
    }

    #[test]
    fn test_sessions_cover_every_table() {
        let mut state = genesis(1).build().unwrap();
        let before = state.witnesses.len();

        state.start_session();
        add_witness(&mut state);
        state.dynamic.modify(|dgp| dgp.witness_budget = 7);
        state.undo().unwrap();
        assert_eq!(state.witnesses.len(), before);
        assert_eq!(state.dynamic.get().witness_budget, 1_000_000);

        // inner merged into outer, then the outer made permanent
        state.start_session();
        state.start_session();
        add_witness(&mut state);
        state.merge().unwrap();
        state.commit_oldest();
        assert_eq!(state.witnesses.len(), before + 1);
        assert!(state.undo().is_err());
    }
}
