//! Refresh of stale price feeds

use keeper_common::AssetId;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Recompute the median feed of every market-issued asset whose feed has run out
    ///
    /// A new median can leave calls undercollateralized, so each refreshed
    /// asset goes through margin calls (and, if need be, global settlement).
    pub fn update_expired_feeds(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let market_issued: Vec<AssetId> = self
            .state()
            .assets
            .indexes()
            .by_type
            .range((true, AssetId(0))..)
            .map(|(_, id)| *id)
            .collect();

        for asset in market_issued {
            let Some(bitasset) = self.bitasset_of(asset)? else {
                continue;
            };
            let bitasset_id = bitasset.id;
            if bitasset.feed_is_expired(now) {
                log::debug!("feed of {} expired at {}", asset, bitasset.feed_expiration_time());
                self.state_mut()
                    .bitassets
                    .modify(bitasset_id, |b| b.update_median_feeds(now))?;
                self.check_call_orders(asset, true)?;
            }

            let rate = self.state().bitassets.get(bitasset_id)?.current_feed.core_exchange_rate;
            if !rate.is_null() && self.state().assets.get(asset)?.core_exchange_rate != rate {
                self.state_mut().assets.modify(asset, |a| a.core_exchange_rate = rate)?;
            }
        }
        Ok(())
    }
}
