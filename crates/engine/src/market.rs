//! Order fills, cancellations, margin calls and global settlement
//!
//! Every fill moves value between an order and an account balance; nothing
//! is minted except by burning debt, which reduces the debt asset's supply.

use keeper_common::{Asset, AssetId, CallOrderId, ForceSettlementId, LimitOrderId, Price};

use crate::database::Database;
use crate::error::{ChainError, Result};
use crate::objects::BitassetData;

impl Database {
    /// Market-issued data of `asset`, or `None` for a plain asset
    pub fn bitasset_of(&self, asset: AssetId) -> Result<Option<&BitassetData>> {
        let state = self.state();
        match state.assets.get(asset)?.bitasset_data_id {
            Some(id) => Ok(Some(state.bitassets.get(id)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Remove a limit order and refund what is left of it to the seller
    pub fn cancel_limit_order(&mut self, id: LimitOrderId) -> Result<Asset> {
        let order = self.state_mut().limit_orders.remove(id)?;
        let refunded = order.amount_for_sale();
        self.adjust_balance(order.seller, refunded)?;
        Ok(refunded)
    }

    /// Remove a settlement request and return its balance to the owner
    pub fn cancel_settle_order(&mut self, id: ForceSettlementId) -> Result<Asset> {
        let order = self.state_mut().settlements.remove(id)?;
        self.adjust_balance(order.owner, order.balance)?;
        Ok(order.balance)
    }

    // ========================================================================
    // Fills
    // ========================================================================

    /// Burn `receives` of debt and release `pays` of collateral from a call
    ///
    /// A call whose debt reaches zero is closed and its remaining collateral
    /// returned to the borrower. Returns whether the call was closed.
    pub fn fill_call_order(&mut self, id: CallOrderId, pays: Asset, receives: Asset) -> Result<bool> {
        let call = self.state().call_orders.get(id)?.clone();
        if receives.asset_id != call.debt_type() || pays.asset_id != call.collateral_type() {
            return Err(ChainError::invariant(format!("call {} filled with the wrong assets", id)));
        }
        if pays.amount > call.collateral || receives.amount > call.debt {
            return Err(ChainError::invariant(format!("call {} overfilled", id)));
        }

        let debt = call.debt - receives.amount;
        let collateral = call.collateral - pays.amount;
        self.adjust_supply(receives.asset_id, -receives.amount)?;

        if debt == 0 {
            self.state_mut().call_orders.remove(id)?;
            self.adjust_balance(call.borrower, Asset::new(collateral, call.collateral_type()))?;
            return Ok(true);
        }
        self.state_mut().call_orders.modify(id, |c| {
            c.debt = debt;
            c.collateral = collateral;
        })?;
        Ok(false)
    }

    /// Sell `pays` out of a limit order for `receives`; returns whether the order is gone
    pub fn fill_limit_order(&mut self, id: LimitOrderId, pays: Asset, receives: Asset) -> Result<bool> {
        let order = self.state().limit_orders.get(id)?.clone();
        let for_sale = order.amount_for_sale();
        if pays.asset_id != for_sale.asset_id || pays.amount > for_sale.amount {
            return Err(ChainError::invariant(format!("limit order {} overfilled", id)));
        }
        self.adjust_balance(order.seller, receives)?;

        if pays == for_sale {
            self.state_mut().limit_orders.remove(id)?;
            return Ok(true);
        }
        self.state_mut().limit_orders.modify(id, |o| o.for_sale -= pays.amount)?;

        // too little left to buy anything at its price
        let left = self.state().limit_orders.get(id)?.amount_to_receive()?;
        if left.amount == 0 {
            self.cancel_limit_order(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Settle `pays` of a request for `receives` of collateral; returns whether it is gone
    pub fn fill_settle_order(&mut self, id: ForceSettlementId, pays: Asset, receives: Asset) -> Result<bool> {
        let order = self.state().settlements.get(id)?.clone();
        let filled = pays.amount >= order.balance.amount;
        if !filled {
            self.state_mut().settlements.modify(id, |s| s.balance.amount -= pays.amount)?;
        }
        self.adjust_balance(order.owner, receives)?;
        if filled {
            self.state_mut().settlements.remove(id)?;
        }
        Ok(filled)
    }

    /// Settle up to `max_settlement` of a request against one call at `match_price`
    ///
    /// Fails with [`ChainError::BlackSwanMatch`] when the call cannot cover
    /// the collateral owed. Returns the amount of debt settled.
    pub fn match_call_settle(
        &mut self,
        call_id: CallOrderId,
        settle_id: ForceSettlementId,
        match_price: &Price,
        max_settlement: Asset,
    ) -> Result<Asset> {
        let call = self.state().call_orders.get(call_id)?.clone();
        let settle = self.state().settlements.get(settle_id)?.clone();
        if call.debt_type() != settle.settlement_asset_id() {
            return Err(ChainError::invariant(format!(
                "call {} does not back settlement {}",
                call_id, settle_id
            )));
        }
        if call.debt <= 0 || call.collateral <= 0 || settle.balance.amount <= 0 {
            return Err(ChainError::invariant("empty order in settlement match"));
        }

        let settle_for_sale = settle.balance.min(max_settlement)?;
        let call_receives = settle_for_sale.min(call.get_debt())?;
        let call_pays = call_receives.mul_price(match_price)?;

        if call_pays.amount >= call.collateral {
            return Err(ChainError::BlackSwanMatch {
                asset: call.debt_type(),
            });
        }

        self.fill_call_order(call_id, call_pays, call_receives)?;
        self.fill_settle_order(settle_id, call_receives, call_pays)?;
        Ok(call_receives)
    }

    // ========================================================================
    // Global settlement
    // ========================================================================

    /// Close every position in `asset` at `settlement_price` (debt per collateral)
    ///
    /// Each call pays what its debt is worth at that price, capped at its
    /// collateral, into a settlement fund. Holders later redeem against the
    /// fund at `supply / fund`, so the supply is left as it was.
    pub fn globally_settle_asset(&mut self, asset: AssetId, settlement_price: Price) -> Result<()> {
        let bitasset = self
            .bitasset_of(asset)?
            .ok_or_else(|| ChainError::invariant(format!("{} is not market issued", asset)))?;
        if bitasset.has_settlement() {
            return Err(ChainError::AlreadySettled { asset });
        }
        let bitasset_id = bitasset.id;
        let backing = bitasset.options.short_backing_asset;
        let original_supply = self.state().assets.get(asset)?.current_supply;

        let calls: Vec<CallOrderId> = self
            .state()
            .call_orders
            .indexes()
            .by_call_price(backing, asset)
            .collect();

        let mut gathered = Asset::zero(backing);
        for call_id in calls {
            let call = self.state().call_orders.get(call_id)?.clone();
            let pays = call.get_debt().mul_price(&settlement_price)?.min(call.get_collateral())?;
            gathered = gathered.checked_add(pays)?;
            if !self.fill_call_order(call_id, pays, call.get_debt())? {
                return Err(ChainError::invariant(format!("call {} survived global settlement", call_id)));
            }
        }
        if gathered.amount <= 0 {
            return Err(ChainError::invariant(format!("global settlement of {} gathered nothing", asset)));
        }

        let price = Price::new(Asset::new(original_supply, asset), gathered)?;
        self.state_mut().bitassets.modify(bitasset_id, |b| {
            b.settlement_price = price;
            b.settlement_fund = gathered.amount;
        })?;
        self.state_mut().assets.modify(asset, |a| a.current_supply = original_supply)?;

        log::error!(
            "{} globally settled at {} with a fund of {}",
            asset,
            settlement_price.to_real(),
            gathered
        );
        Ok(())
    }

    // ========================================================================
    // Margin calls
    // ========================================================================

    /// Fill calls below their call price against bids at or above the short
    /// squeeze price; returns whether any call was margin called
    pub fn check_call_orders(&mut self, asset: AssetId, allow_black_swan: bool) -> Result<bool> {
        if self.bitasset_of(asset)?.is_none() {
            return Ok(false);
        }
        if self.check_for_blackswan(asset, allow_black_swan)? {
            return Ok(false);
        }

        let Some(bitasset) = self.bitasset_of(asset)? else {
            return Ok(false);
        };
        let feed = bitasset.current_feed;
        let backing = bitasset.options.short_backing_asset;
        if feed.settlement_price.is_null() {
            return Ok(false);
        }
        let min_price = feed.max_short_squeeze_price()?;

        let first_bid = |db: &Database| db.state().limit_orders.indexes().offers(asset, backing, min_price).next();
        let first_call = |db: &Database| db.state().call_orders.indexes().by_call_price(backing, asset).next();

        if first_bid(self).is_none() {
            return Ok(false);
        }

        let mut margin_called = false;
        while !self.check_for_blackswan(asset, allow_black_swan)? {
            let Some(call_id) = first_call(self) else {
                break;
            };
            let Some(bid_id) = first_bid(self) else {
                return Ok(margin_called);
            };
            let call = self.state().call_orders.get(call_id)?.clone();
            let bid = self.state().limit_orders.get(bid_id)?.clone();
            let match_price = bid.sell_price;
            let usd_for_sale = bid.amount_for_sale();

            let call_limit = call.call_price.inverse();
            if feed.settlement_price > call_limit {
                return Ok(margin_called);
            }
            if match_price > call_limit {
                return Ok(margin_called);
            }
            margin_called = true;

            let usd_to_buy = call.get_debt();
            if usd_to_buy.mul_price(&match_price)?.amount > call.collateral {
                log::error!("black swan detected while margin calling {}", asset);
                if !allow_black_swan {
                    return Err(ChainError::BlackSwanDisallowed { asset });
                }
                self.globally_settle_asset(asset, feed.settlement_price)?;
                return Ok(true);
            }

            let call_receives = if usd_to_buy.amount >= usd_for_sale.amount {
                usd_for_sale
            } else {
                usd_to_buy
            };
            let order_receives = call_receives.mul_price(&match_price)?;

            self.fill_call_order(call_id, order_receives, call_receives)?;
            self.fill_limit_order(bid_id, call_receives, order_receives)?;
        }
        Ok(margin_called)
    }
}
