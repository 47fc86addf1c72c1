//! Amounts of a specific asset

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PriceError, PriceResult};
use crate::ids::AssetId;
use crate::price::Price;

/// Share amount in the asset's smallest unit
pub type ShareType = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: ShareType,
    pub asset_id: AssetId,
}

impl Asset {
    pub const fn new(amount: ShareType, asset_id: AssetId) -> Self {
        Self { amount, asset_id }
    }

    pub const fn zero(asset_id: AssetId) -> Self {
        Self { amount: 0, asset_id }
    }

    pub fn checked_add(self, other: Asset) -> PriceResult<Asset> {
        self.same_asset(&other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(PriceError::Overflow)?;
        Ok(Asset::new(amount, self.asset_id))
    }

    pub fn checked_sub(self, other: Asset) -> PriceResult<Asset> {
        self.same_asset(&other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(PriceError::Overflow)?;
        Ok(Asset::new(amount, self.asset_id))
    }

    /// Smaller of two amounts of the same asset
    pub fn min(self, other: Asset) -> PriceResult<Asset> {
        self.same_asset(&other)?;
        Ok(if other.amount < self.amount { other } else { self })
    }

    /// Convert through `price`, rounding down
    ///
    /// An amount of the price's base asset converts into its quote asset and
    /// vice versa.
    pub fn mul_price(self, price: &Price) -> PriceResult<Asset> {
        if self.asset_id == price.base.asset_id {
            if price.base.amount <= 0 {
                return Err(PriceError::ZeroPrice);
            }
            let amount = crate::math::mul_div_floor(self.amount, price.quote.amount, price.base.amount)
                .ok_or(PriceError::Overflow)?;
            Ok(Asset::new(amount, price.quote.asset_id))
        } else if self.asset_id == price.quote.asset_id {
            if price.quote.amount <= 0 {
                return Err(PriceError::ZeroPrice);
            }
            let amount = crate::math::mul_div_floor(self.amount, price.base.amount, price.quote.amount)
                .ok_or(PriceError::Overflow)?;
            Ok(Asset::new(amount, price.base.asset_id))
        } else {
            Err(PriceError::AssetMismatch {
                asset: self.asset_id,
                base: price.base.asset_id,
                quote: price.quote.asset_id,
            })
        }
    }

    /// Price with `self` as base and `quote` as quote
    pub fn over(self, quote: Asset) -> PriceResult<Price> {
        Price::new(self, quote)
    }

    fn same_asset(&self, other: &Asset) -> PriceResult<()> {
        if self.asset_id != other.asset_id {
            return Err(PriceError::Incompatible {
                lhs: self.asset_id,
                rhs: other.asset_id,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.asset_id)
    }
}
