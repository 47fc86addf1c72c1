//! Open market positions: shorts, limit orders, settlement requests

use std::cmp::Reverse;
use std::collections::BTreeSet;

use keeper_common::{
    AccountId, Asset, AssetId, CallOrderId, ForceSettlementId, LimitOrderId, Price, PriceResult, ShareType,
    TimePointSec,
};
use keeper_store::SecondaryIndex;
use serde::Serialize;

use super::impl_object;

/// Collateralized short position
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallOrder {
    pub id: CallOrderId,
    pub borrower: AccountId,
    /// Backing asset locked
    pub collateral: ShareType,
    /// Market-issued asset owed
    pub debt: ShareType,
    /// Collateral per (debt * maintenance ratio); base is the backing asset
    pub call_price: Price,
}

impl CallOrder {
    pub fn debt_type(&self) -> AssetId {
        self.call_price.quote.asset_id
    }

    pub fn collateral_type(&self) -> AssetId {
        self.call_price.base.asset_id
    }

    pub fn get_debt(&self) -> Asset {
        Asset::new(self.debt, self.debt_type())
    }

    pub fn get_collateral(&self) -> Asset {
        Asset::new(self.collateral, self.collateral_type())
    }

    /// Collateral per debt; the least collateralized position sorts first
    pub fn collateralization(&self) -> PriceResult<Price> {
        Price::new(self.get_collateral(), self.get_debt())
    }

    fn collateralization_key(&self) -> Price {
        Price {
            base: self.get_collateral(),
            quote: self.get_debt(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CallOrderIndex {
    pub by_collateral: BTreeSet<(Price, CallOrderId)>,
    pub by_price: BTreeSet<(Price, CallOrderId)>,
}

impl SecondaryIndex<CallOrder> for CallOrderIndex {
    fn insert(&mut self, c: &CallOrder) {
        self.by_collateral.insert((c.collateralization_key(), c.id));
        self.by_price.insert((c.call_price, c.id));
    }

    fn remove(&mut self, c: &CallOrder) {
        self.by_collateral.remove(&(c.collateralization_key(), c.id));
        self.by_price.remove(&(c.call_price, c.id));
    }
}

impl CallOrderIndex {
    /// Least collateralized position borrowing `debt` against `backing`
    pub fn least_collateralized(&self, backing: AssetId, debt: AssetId) -> Option<CallOrderId> {
        let lo = (Price::min(backing, debt), CallOrderId(0));
        let hi = (Price::max(backing, debt), CallOrderId(u64::MAX));
        self.by_collateral.range(lo..=hi).next().map(|(_, id)| *id)
    }

    /// Positions in ascending call price for the pair
    pub fn by_call_price(&self, backing: AssetId, debt: AssetId) -> impl Iterator<Item = CallOrderId> + '_ {
        let lo = (Price::min(backing, debt), CallOrderId(0));
        let hi = (Price::max(backing, debt), CallOrderId(u64::MAX));
        self.by_price.range(lo..=hi).map(|(_, id)| *id)
    }
}

impl_object!(CallOrder, CallOrderId, CallOrderIndex, "call order");

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LimitOrder {
    pub id: LimitOrderId,
    pub seller: AccountId,
    /// Remaining amount of `sell_price.base` offered
    pub for_sale: ShareType,
    pub sell_price: Price,
    pub expiration: TimePointSec,
}

impl LimitOrder {
    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.asset_id)
    }

    pub fn amount_to_receive(&self) -> PriceResult<Asset> {
        self.amount_for_sale().mul_price(&self.sell_price)
    }
}

#[derive(Debug, Default)]
pub struct LimitOrderIndex {
    pub by_expiration: BTreeSet<(TimePointSec, LimitOrderId)>,
    /// Best (highest) price first within each pair
    pub by_price: BTreeSet<(Reverse<Price>, LimitOrderId)>,
}

impl SecondaryIndex<LimitOrder> for LimitOrderIndex {
    fn insert(&mut self, o: &LimitOrder) {
        self.by_expiration.insert((o.expiration, o.id));
        self.by_price.insert((Reverse(o.sell_price), o.id));
    }

    fn remove(&mut self, o: &LimitOrder) {
        self.by_expiration.remove(&(o.expiration, o.id));
        self.by_price.remove(&(Reverse(o.sell_price), o.id));
    }
}

impl LimitOrderIndex {
    /// Orders selling `sell` for `receive` with price in `[floor, max]`, best first
    pub fn offers(&self, sell: AssetId, receive: AssetId, floor: Price) -> impl Iterator<Item = LimitOrderId> + '_ {
        let max = Price::max(sell, receive);
        let floor = floor.clamp(Price::min(sell, receive), max);
        let lo = (Reverse(max), LimitOrderId(0));
        let hi = (Reverse(floor), LimitOrderId(u64::MAX));
        self.by_price.range(lo..=hi).map(|(_, id)| *id)
    }

    /// Orders selling `sell` for `receive`, best first
    pub fn all_offers(&self, sell: AssetId, receive: AssetId) -> impl Iterator<Item = LimitOrderId> + '_ {
        self.offers(sell, receive, Price::min(sell, receive))
    }
}

impl_object!(LimitOrder, LimitOrderId, LimitOrderIndex, "limit order");

/// Request to redeem a market-issued asset for collateral at the feed price
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForceSettlement {
    pub id: ForceSettlementId,
    pub owner: AccountId,
    /// Amount still to be settled, held by the request
    pub balance: Asset,
    pub settlement_date: TimePointSec,
}

impl ForceSettlement {
    pub fn settlement_asset_id(&self) -> AssetId {
        self.balance.asset_id
    }
}

#[derive(Debug, Default)]
pub struct ForceSettlementIndex {
    /// (asset, settlement date, id): grouped by asset, oldest due first
    pub by_expiration: BTreeSet<(AssetId, TimePointSec, ForceSettlementId)>,
}

impl SecondaryIndex<ForceSettlement> for ForceSettlementIndex {
    fn insert(&mut self, s: &ForceSettlement) {
        self.by_expiration.insert((s.settlement_asset_id(), s.settlement_date, s.id));
    }

    fn remove(&mut self, s: &ForceSettlement) {
        self.by_expiration.remove(&(s.settlement_asset_id(), s.settlement_date, s.id));
    }
}

impl ForceSettlementIndex {
    /// First request for `asset` or any later asset
    pub fn first_from(&self, asset: AssetId) -> Option<(AssetId, TimePointSec, ForceSettlementId)> {
        self.by_expiration
            .range((asset, TimePointSec::default(), ForceSettlementId(0))..)
            .next()
            .copied()
    }

    /// First request of the asset after `asset`
    pub fn first_after(&self, asset: AssetId) -> Option<(AssetId, TimePointSec, ForceSettlementId)> {
        let next = AssetId(asset.0.checked_add(1)?);
        self.first_from(next)
    }
}

impl_object!(ForceSettlement, ForceSettlementId, ForceSettlementIndex, "force settlement");
