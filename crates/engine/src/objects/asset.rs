//! Assets and market-issued asset data

use std::collections::{BTreeMap, BTreeSet};

use keeper_common::constants::{
    COLLATERAL_RATIO_DENOM, DEFAULT_FORCE_SETTLEMENT_DELAY, DEFAULT_FORCE_SETTLEMENT_MAX_VOLUME,
    DEFAULT_FORCE_SETTLEMENT_OFFSET, DEFAULT_MAINTENANCE_COLLATERAL_RATIO, DEFAULT_MAX_SHORT_SQUEEZE_RATIO,
    DEFAULT_PRICE_FEED_LIFETIME, PERCENT_100,
};
use keeper_common::math::mul_u64;
use keeper_common::{AccountId, Asset, AssetId, BitassetDataId, Price, PriceResult, ShareType, TimePointSec};
use keeper_store::SecondaryIndex;
use serde::{Deserialize, Serialize};

use super::impl_object;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetObject {
    pub id: AssetId,
    pub symbol: String,
    pub issuer: AccountId,
    pub current_supply: ShareType,
    /// Cached copy of the feed's core exchange rate
    pub core_exchange_rate: Price,
    /// Present iff the asset is market-issued
    pub bitasset_data_id: Option<BitassetDataId>,
}

impl AssetObject {
    pub fn is_market_issued(&self) -> bool {
        self.bitasset_data_id.is_some()
    }

    pub fn amount(&self, amount: ShareType) -> Asset {
        Asset::new(amount, self.id)
    }
}

#[derive(Debug, Default)]
pub struct AssetIndex {
    /// (is market issued, id)
    pub by_type: BTreeSet<(bool, AssetId)>,
    pub by_symbol: BTreeMap<String, AssetId>,
}

impl SecondaryIndex<AssetObject> for AssetIndex {
    fn insert(&mut self, a: &AssetObject) {
        self.by_type.insert((a.is_market_issued(), a.id));
        self.by_symbol.insert(a.symbol.clone(), a.id);
    }

    fn remove(&mut self, a: &AssetObject) {
        self.by_type.remove(&(a.is_market_issued(), a.id));
        self.by_symbol.remove(&a.symbol);
    }
}

impl_object!(AssetObject, AssetId, AssetIndex, "asset");

/// One publisher's view of a market-issued asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFeed {
    /// Debt asset per backing asset
    pub settlement_price: Price,
    /// Asset per core, used for fee conversion
    pub core_exchange_rate: Price,
    pub maintenance_collateral_ratio: u16,
    pub maximum_short_squeeze_ratio: u16,
}

impl Default for PriceFeed {
    fn default() -> Self {
        Self {
            settlement_price: Price::default(),
            core_exchange_rate: Price::default(),
            maintenance_collateral_ratio: DEFAULT_MAINTENANCE_COLLATERAL_RATIO,
            maximum_short_squeeze_ratio: DEFAULT_MAX_SHORT_SQUEEZE_RATIO,
        }
    }
}

impl PriceFeed {
    /// Lowest price margin calls may be filled at: `settlement_price * 1000 / mssr`
    pub fn max_short_squeeze_price(&self) -> PriceResult<Price> {
        let sp = &self.settlement_price;
        Price::from_wide(
            mul_u64(sp.base.amount.max(0) as u64, COLLATERAL_RATIO_DENOM as u64),
            sp.base.asset_id,
            mul_u64(sp.quote.amount.max(0) as u64, self.maximum_short_squeeze_ratio as u64),
            sp.quote.asset_id,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitassetOptions {
    pub feed_lifetime_sec: u32,
    pub minimum_feeds: u8,
    pub force_settlement_delay_sec: u32,
    /// Discount applied to force settlement proceeds, in `PERCENT_100` units
    pub force_settlement_offset_percent: u16,
    /// Share of supply that may be force settled per maintenance interval
    pub maximum_force_settlement_volume: u16,
    pub short_backing_asset: AssetId,
}

impl Default for BitassetOptions {
    fn default() -> Self {
        Self {
            feed_lifetime_sec: DEFAULT_PRICE_FEED_LIFETIME,
            minimum_feeds: 1,
            force_settlement_delay_sec: DEFAULT_FORCE_SETTLEMENT_DELAY,
            force_settlement_offset_percent: DEFAULT_FORCE_SETTLEMENT_OFFSET,
            maximum_force_settlement_volume: DEFAULT_FORCE_SETTLEMENT_MAX_VOLUME,
            short_backing_asset: AssetId::CORE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BitassetData {
    pub id: BitassetDataId,
    pub asset_id: AssetId,
    pub options: BitassetOptions,
    /// Publisher -> (published at, feed)
    pub feeds: BTreeMap<AccountId, (TimePointSec, PriceFeed)>,
    pub current_feed: PriceFeed,
    pub current_feed_publication_time: TimePointSec,
    /// Volume force settled since the last maintenance
    pub force_settled_volume: ShareType,
    /// Non-null once the asset has been globally settled
    pub settlement_price: Price,
    /// Collateral gathered by global settlement
    pub settlement_fund: ShareType,
}

impl BitassetData {
    pub fn has_settlement(&self) -> bool {
        !self.settlement_price.is_null()
    }

    pub fn feed_expiration_time(&self) -> TimePointSec {
        self.current_feed_publication_time + self.options.feed_lifetime_sec
    }

    pub fn feed_is_expired(&self, now: TimePointSec) -> bool {
        self.feed_expiration_time() <= now
    }

    /// Cap on force settlement volume for the current interval
    pub fn max_force_settlement_volume(&self, current_supply: ShareType) -> ShareType {
        let pct = self.options.maximum_force_settlement_volume;
        if pct == 0 {
            return 0;
        }
        let base = current_supply.saturating_add(self.force_settled_volume);
        if pct == PERCENT_100 {
            return base;
        }
        let volume = mul_u64(base.max(0) as u64, pct as u64) / PERCENT_100 as u128;
        volume as ShareType
    }

    /// Recompute `current_feed` from the feeds still within their lifetime
    ///
    /// Each field's median is taken independently. Publishers are visited in
    /// id order and the sort is stable, so ties resolve identically everywhere.
    pub fn update_median_feeds(&mut self, now: TimePointSec) {
        self.current_feed_publication_time = now;
        let lifetime = self.options.feed_lifetime_sec as i64;

        let mut current: Vec<PriceFeed> = Vec::new();
        for (published, feed) in self.feeds.values() {
            if now - *published < lifetime && *published != TimePointSec::default() {
                current.push(*feed);
                self.current_feed_publication_time = self.current_feed_publication_time.min(*published);
            }
        }

        if current.len() < (self.options.minimum_feeds as usize).max(1) {
            self.current_feed_publication_time = now;
            self.current_feed = PriceFeed::default();
            return;
        }
        if current.len() == 1 {
            self.current_feed = current[0];
            return;
        }

        self.current_feed = PriceFeed {
            settlement_price: median_by(&current, |f| f.settlement_price),
            core_exchange_rate: median_by(&current, |f| f.core_exchange_rate),
            maintenance_collateral_ratio: median_by(&current, |f| f.maintenance_collateral_ratio),
            maximum_short_squeeze_ratio: median_by(&current, |f| f.maximum_short_squeeze_ratio),
        };
    }
}

fn median_by<K: Ord + Copy>(feeds: &[PriceFeed], key: impl Fn(&PriceFeed) -> K) -> K {
    let mut keys: Vec<K> = feeds.iter().map(key).collect();
    keys.sort();
    keys[keys.len() / 2]
}

impl_object!(BitassetData, BitassetDataId, (), "bitasset data");
