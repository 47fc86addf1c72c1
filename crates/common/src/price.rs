//! Directed exchange ratios between two assets
//!
//! A price is `base / quote`: `base.amount` units of the base asset buy
//! `quote.amount` units of the quote asset. Prices over different asset pairs
//! order by (base id, quote id) first, so one ordered index can hold every
//! market and a pair's prices form a contiguous range bounded by
//! [`Price::min`] and [`Price::max`].

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::constants::{COLLATERAL_RATIO_DENOM, MAX_SHARE_SUPPLY};
use crate::error::{PriceError, PriceResult};
use crate::ids::AssetId;
use crate::math::{gcd_u128, mul_u64};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> PriceResult<Self> {
        if base.asset_id == quote.asset_id {
            return Err(PriceError::SameAsset(base.asset_id));
        }
        Ok(Self { base, quote })
    }

    /// Build a price from wide amounts, reducing the ratio until both sides fit
    pub fn from_wide(base: u128, base_id: AssetId, quote: u128, quote_id: AssetId) -> PriceResult<Self> {
        let g = gcd_u128(base, quote).max(1);
        let (base, quote) = (base / g, quote / g);
        let base = i64::try_from(base).map_err(|_| PriceError::Overflow)?;
        let quote = i64::try_from(quote).map_err(|_| PriceError::Overflow)?;
        Price::new(Asset::new(base, base_id), Asset::new(quote, quote_id))
    }

    /// Highest representable price of `base` in `quote`
    pub fn max(base: AssetId, quote: AssetId) -> Self {
        Self {
            base: Asset::new(MAX_SHARE_SUPPLY, base),
            quote: Asset::new(1, quote),
        }
    }

    /// Lowest representable non-zero price of `base` in `quote`
    pub fn min(base: AssetId, quote: AssetId) -> Self {
        Self {
            base: Asset::new(1, base),
            quote: Asset::new(MAX_SHARE_SUPPLY, quote),
        }
    }

    /// Price at which a position with `debt` and `collateral` is margin called
    ///
    /// Expressed as collateral per (debt * ratio).
    pub fn call_price(debt: Asset, collateral: Asset, collateral_ratio: u16) -> PriceResult<Self> {
        if debt.amount < 0 {
            return Err(PriceError::Overflow);
        }
        let swan = mul_u64(debt.amount as u64, collateral_ratio as u64) / COLLATERAL_RATIO_DENOM as u128;
        let swan = i64::try_from(swan).map_err(|_| PriceError::Overflow)?;
        Price::new(collateral, Asset::new(swan, debt.asset_id))
    }

    /// The same ratio seen from the other side of the market
    pub fn inverse(self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    /// A price with a zero side carries no information
    pub fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    pub fn same_pair(&self, other: &Price) -> bool {
        self.base.asset_id == other.base.asset_id && self.quote.asset_id == other.quote.asset_id
    }

    /// Ratio as a float, for log output only
    pub fn to_real(&self) -> f64 {
        if self.quote.amount == 0 {
            return 0.0;
        }
        self.base.amount as f64 / self.quote.amount as f64
    }

    /// Cross products compared in u128: `self.base * other.quote` vs `other.base * self.quote`
    fn cross(&self, other: &Price) -> (u128, u128) {
        let lhs = mul_u64(self.base.amount.max(0) as u64, other.quote.amount.max(0) as u64);
        let rhs = mul_u64(other.base.amount.max(0) as u64, self.quote.amount.max(0) as u64);
        (lhs, rhs)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .asset_id
            .cmp(&other.base.asset_id)
            .then(self.quote.asset_id.cmp(&other.quote.asset_id))
            .then_with(|| {
                let (lhs, rhs) = self.cross(other);
                lhs.cmp(&rhs)
            })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}
