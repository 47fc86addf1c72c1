//! Force settlement of market-issued assets
//!
//! Due requests are matched, asset by asset and oldest first, against the
//! least collateralized call orders at the feed price less the asset's
//! settlement offset. The volume settled per asset between two maintenance
//! blocks is capped.

use keeper_common::math::after_percent_cut;
use keeper_common::{Asset, AssetId, ForceSettlementId};

use crate::database::Database;
use crate::error::{ChainError, Result};

impl Database {
    pub fn clear_expired_settlements(&mut self) -> Result<()> {
        let now = self.head_block_time();
        // volume cap of the asset being worked on, fixed when first reached
        let mut cap: Option<(AssetId, Asset)> = None;

        let mut next = self.state().settlements.indexes().first_from(AssetId(0));
        while let Some((asset, settlement_date, id)) = next {
            let bitasset = self
                .bitasset_of(asset)?
                .cloned()
                .ok_or_else(|| ChainError::invariant(format!("settlement {} is for plain asset {}", id, asset)))?;

            if bitasset.has_settlement() {
                log::info!("canceling force settlement {} of globally settled {}", id, asset);
                self.cancel_settle_order(id)?;
                next = self.state().settlements.indexes().first_from(asset);
                continue;
            }
            if settlement_date > now {
                next = self.state().settlements.indexes().first_after(asset);
                continue;
            }
            let settle_price = bitasset.current_feed.settlement_price;
            if settle_price.is_null() {
                log::info!("canceling force settlement {} of {}: no current feed", id, asset);
                self.cancel_settle_order(id)?;
                next = self.state().settlements.indexes().first_from(asset);
                continue;
            }

            let max_volume = match cap {
                Some((capped, volume)) if capped == asset => volume,
                _ => {
                    let supply = self.state().assets.get(asset)?.current_supply;
                    let volume = Asset::new(bitasset.max_force_settlement_volume(supply), asset);
                    cap = Some((asset, volume));
                    volume
                }
            };
            if bitasset.force_settled_volume >= max_volume.amount {
                log::debug!(
                    "skipping force settlement of {}: settled {} this interval, max is {}",
                    asset,
                    bitasset.force_settled_volume,
                    max_volume.amount
                );
                next = self.state().settlements.indexes().first_after(asset);
                continue;
            }

            let pays = self.state().settlements.get(id)?.balance;
            let unrounded = pays.mul_price(&settle_price)?;
            let offset = bitasset.options.force_settlement_offset_percent;
            let receives_amount = after_percent_cut(unrounded.amount, offset)
                .ok_or_else(|| ChainError::invariant(format!("settlement offset {} out of range", offset)))?;
            if receives_amount > unrounded.amount {
                return Err(ChainError::invariant("settlement offset increased the payout"));
            }
            if receives_amount == 0 {
                log::info!("canceling force settlement {} of {}: too small to receive anything", id, asset);
                self.cancel_settle_order(id)?;
                next = self.state().settlements.indexes().first_from(asset);
                continue;
            }
            let match_price = pays.over(Asset::new(receives_amount, unrounded.asset_id))?;

            let backing = bitasset.options.short_backing_asset;
            let mut settled = bitasset.force_settled_volume;
            while settled < max_volume.amount && self.state().settlements.contains(id) {
                let call = self
                    .state()
                    .call_orders
                    .indexes()
                    .least_collateralized(backing, asset)
                    .ok_or_else(|| ChainError::invariant(format!("no call orders back {}", asset)))?;
                let room = Asset::new(max_volume.amount - settled, asset);
                match self.match_call_settle(call, id, &match_price, room) {
                    Ok(filled) => settled += filled.amount,
                    Err(ChainError::BlackSwanMatch { .. }) => {
                        log::warn!(
                            "canceling force settlement {} of {}: call {} cannot cover it",
                            id,
                            asset,
                            call
                        );
                        self.cancel_settle_order(id)?;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            self.state_mut()
                .bitassets
                .modify(bitasset.id, |b| b.force_settled_volume = settled)?;

            next = self.state().settlements.indexes().first_from(asset);
        }
        Ok(())
    }

    /// Pending requests for `asset`, oldest due first
    pub fn settlements_of(&self, asset: AssetId) -> impl Iterator<Item = ForceSettlementId> + '_ {
        self.state()
            .settlements
            .indexes()
            .by_expiration
            .iter()
            .skip_while(move |(a, _, _)| *a < asset)
            .take_while(move |(a, _, _)| *a == asset)
            .map(|(_, _, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_support::*;
    use crate::database::Database;
    use crate::genesis::GenesisState;
    use keeper_common::{AccountId, AssetId, BitassetDataId, CallOrderId, ForceSettlementId, Price};

    const USD: AssetId = AssetId(1);
    const CORE: AssetId = AssetId::CORE;

    /// USD worth 2 CORE, with 5000 USD lent out against 20000 CORE
    fn market(options: &str, call_collateral: i64, extra: &str) -> Database {
        let text = format!(
            r#"
            initial_timestamp = {GENESIS_TIME}
            [[witnesses]]
            account = 100

            [[assets]]
            symbol = "USD"
            current_supply = 5000
            [assets.bitasset]
            options = {{ {options} }}
            feeds = [{{ publisher = 100, published = {GENESIS_TIME}, debt = 1, collateral = 2 }}]

            [[call_orders]]
            borrower = 7
            asset = "USD"
            debt = 5000
            collateral = {call_collateral}

            {extra}
            "#
        );
        database(&GenesisState::from_toml(&text).unwrap())
    }

    fn settle(owner: u64, amount: i64, date: u32) -> String {
        format!(
            r#"
            [[settlements]]
            owner = {owner}
            amount = {amount}
            asset = "USD"
            settlement_date = {date}
            "#
        )
    }

    #[test]
    fn test_offset_reduces_payout() {
        let mut db = market(
            "force_settlement_offset_percent = 100, maximum_force_settlement_volume = 10000",
            20_000,
            &settle(1, 1000, GENESIS_TIME),
        );
        db.clear_expired_settlements().unwrap();

        // 1000 USD is worth 2000 CORE, less 1%
        assert_eq!(db.get_balance(AccountId(1), CORE).amount, 1980);
        assert!(db.state().settlements.is_empty());
        let call = db.state().call_orders.get(CallOrderId(0)).unwrap();
        assert_eq!(call.debt, 4000);
        assert_eq!(call.collateral, 18_020);
        assert_eq!(db.state().assets.get(USD).unwrap().current_supply, 4000);
        assert_eq!(db.bitasset_of(USD).unwrap().unwrap().force_settled_volume, 1000);
    }

    #[test]
    fn test_volume_capped_per_interval() {
        // default cap: 20% of 5000
        let extra = format!("{}{}", settle(1, 800, GENESIS_TIME), settle(2, 800, GENESIS_TIME));
        let mut db = market("", 20_000, &extra);
        db.clear_expired_settlements().unwrap();

        assert_eq!(db.get_balance(AccountId(1), CORE).amount, 1600);
        assert_eq!(db.get_balance(AccountId(2), CORE).amount, 400);
        let rest = db.state().settlements.get(ForceSettlementId(1)).unwrap();
        assert_eq!(rest.balance.amount, 600);
        assert_eq!(db.bitasset_of(USD).unwrap().unwrap().force_settled_volume, 1000);

        // nothing more until the volume is reset
        db.clear_expired_settlements().unwrap();
        assert_eq!(db.state().settlements.get(ForceSettlementId(1)).unwrap().balance.amount, 600);
        assert_eq!(db.get_balance(AccountId(2), CORE).amount, 400);
    }

    #[test]
    fn test_requests_not_yet_due_are_left() {
        let extra = format!("{}{}", settle(1, 100, GENESIS_TIME + 10), settle(2, 100, GENESIS_TIME));
        let mut db = market("", 20_000, &extra);
        db.clear_expired_settlements().unwrap();

        assert_eq!(db.get_balance(AccountId(1), CORE).amount, 0);
        assert_eq!(db.get_balance(AccountId(2), CORE).amount, 200);
        assert_eq!(db.settlements_of(USD).collect::<Vec<_>>(), vec![ForceSettlementId(0)]);
    }

    #[test]
    fn test_underwater_call_cancels_request() {
        // 1000 USD would take 2000 CORE out of a call holding 1500
        let mut db = market("maximum_force_settlement_volume = 10000", 1500, &settle(1, 1000, GENESIS_TIME));
        db.clear_expired_settlements().unwrap();

        assert!(db.state().settlements.is_empty());
        assert_eq!(db.get_balance(AccountId(1), USD).amount, 1000);
        assert_eq!(db.state().call_orders.get(CallOrderId(0)).unwrap().collateral, 1500);
        assert_eq!(db.bitasset_of(USD).unwrap().unwrap().force_settled_volume, 0);
    }

    #[test]
    fn test_requests_cancelled_without_feed_or_after_swan() {
        let mut db = market("", 20_000, &format!("{}{}", settle(1, 100, GENESIS_TIME), settle(2, 100, 9999)));
        db.state_mut()
            .bitassets
            .modify(BitassetDataId(0), |b| b.current_feed = Default::default())
            .unwrap();
        db.clear_expired_settlements().unwrap();
        // only the due request goes
        assert_eq!(db.get_balance(AccountId(1), USD).amount, 100);
        assert_eq!(db.state().settlements.len(), 1);

        let swan = Price::new(keeper_common::Asset::new(1, USD), keeper_common::Asset::new(3, CORE)).unwrap();
        db.state_mut()
            .bitassets
            .modify(BitassetDataId(0), |b| b.settlement_price = swan)
            .unwrap();
        db.clear_expired_settlements().unwrap();
        // a settled asset refunds even requests that are not due
        assert_eq!(db.get_balance(AccountId(2), USD).amount, 100);
        assert!(db.state().settlements.is_empty());
    }
}
