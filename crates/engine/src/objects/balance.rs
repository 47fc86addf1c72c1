use std::collections::BTreeMap;

use keeper_common::{AccountBalanceId, AccountId, Asset, AssetId, ShareType};
use keeper_store::SecondaryIndex;
use serde::Serialize;

use super::impl_object;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub id: AccountBalanceId,
    pub owner: AccountId,
    pub asset_type: AssetId,
    pub balance: ShareType,
}

impl AccountBalance {
    pub fn get_balance(&self) -> Asset {
        Asset::new(self.balance, self.asset_type)
    }
}

#[derive(Debug, Default)]
pub struct BalanceIndex {
    pub by_owner_asset: BTreeMap<(AccountId, AssetId), AccountBalanceId>,
}

impl SecondaryIndex<AccountBalance> for BalanceIndex {
    fn insert(&mut self, b: &AccountBalance) {
        self.by_owner_asset.insert((b.owner, b.asset_type), b.id);
    }

    fn remove(&mut self, b: &AccountBalance) {
        self.by_owner_asset.remove(&(b.owner, b.asset_type));
    }
}

impl_object!(AccountBalance, AccountBalanceId, BalanceIndex, "account balance");
