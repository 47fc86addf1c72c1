//! Insolvency detection for market-issued assets
//!
//! With `HB` the best bid for the backing asset, `SP` the feed's settlement
//! price and `LC` the collateralization (collateral per debt) of the least
//! collateralized call, a black swan occurs when `~LC >= max(HB, SP)`. All
//! three are compared as debt asset per backing asset; equality triggers.

use keeper_common::AssetId;

use crate::database::Database;
use crate::error::{ChainError, Result};

impl Database {
    /// Returns true if `asset` is (now) globally settled
    ///
    /// When a black swan is found and `enable_black_swan` is false, fails with
    /// [`ChainError::BlackSwanDisallowed`] before touching any state.
    pub fn check_for_blackswan(&mut self, asset: AssetId, enable_black_swan: bool) -> Result<bool> {
        let Some(bitasset) = self.bitasset_of(asset)? else {
            return Ok(false);
        };
        if bitasset.has_settlement() {
            return Ok(true);
        }
        let settle_price = bitasset.current_feed.settlement_price;
        if settle_price.is_null() {
            return Ok(false);
        }
        let backing = bitasset.options.short_backing_asset;

        let state = self.state();
        let Some(call_id) = state.call_orders.indexes().least_collateralized(backing, asset) else {
            return Ok(false);
        };

        let highest = match state.limit_orders.indexes().all_offers(asset, backing).next() {
            Some(bid) => state.limit_orders.get(bid)?.sell_price.max(settle_price),
            None => settle_price,
        };

        let least_collateral = state.call_orders.get(call_id)?.collateralization()?;
        let swan_price = least_collateral.inverse();
        if swan_price < highest {
            return Ok(false);
        }

        log::error!(
            "black swan detected for {}: least collateralized call {} ({}), settle price {}, max {}",
            asset,
            call_id,
            swan_price.to_real(),
            settle_price.to_real(),
            highest.to_real()
        );
        if !enable_black_swan {
            return Err(ChainError::BlackSwanDisallowed { asset });
        }
        self.globally_settle_asset(asset, swan_price)?;
        Ok(true)
    }
}
