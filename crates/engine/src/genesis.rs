//! Initial chain state, loaded from TOML
//!
//! Assets, accounts and orders are referenced by symbol and account number so
//! a genesis file can be written by hand. The core asset is always asset 0;
//! listed assets follow in file order. Every witness is active.

use std::collections::{BTreeMap, BTreeSet};

use keeper_common::constants::{MAX_SHARE_SUPPLY, PERCENT_100};
use keeper_common::{
    AccountId, Asset, AssetId, BitassetDataId, Price, ShareType, TimePointSec, TransactionId,
};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::objects::{
    AccountBalance, AssetObject, BitassetData, BitassetOptions, CallOrder, ChainParameters,
    DynamicGlobalProperties, ForceSettlement, GlobalProperties, LimitOrder, PriceFeed, Proposal,
    TransactionRecord, Witness, WithdrawPermission,
};
use crate::operations::Operation;
use crate::state::ChainState;

fn default_core_symbol() -> String {
    "CORE".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub initial_timestamp: TimePointSec,
    #[serde(default = "default_core_symbol")]
    pub core_symbol: String,
    #[serde(default)]
    pub parameters: ChainParameters,
    #[serde(default)]
    pub witness_budget: ShareType,
    pub witnesses: Vec<GenesisWitness>,
    #[serde(default)]
    pub assets: Vec<GenesisAsset>,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    #[serde(default)]
    pub call_orders: Vec<GenesisCallOrder>,
    #[serde(default)]
    pub limit_orders: Vec<GenesisLimitOrder>,
    #[serde(default)]
    pub settlements: Vec<GenesisSettlement>,
    #[serde(default)]
    pub proposals: Vec<GenesisProposal>,
    #[serde(default)]
    pub withdraw_permissions: Vec<GenesisWithdrawPermission>,
    #[serde(default)]
    pub transactions: Vec<GenesisTransaction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisWitness {
    pub account: AccountId,
}

/// Amount of an asset named by symbol
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAmount {
    pub amount: ShareType,
    pub asset: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAsset {
    pub symbol: String,
    #[serde(default)]
    pub issuer: AccountId,
    /// Defaults to everything held in balances, orders and settlements
    #[serde(default)]
    pub current_supply: Option<ShareType>,
    #[serde(default)]
    pub bitasset: Option<GenesisBitasset>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBitasset {
    #[serde(default = "default_core_symbol")]
    pub backing: String,
    #[serde(default)]
    pub options: BitassetOptions,
    #[serde(default)]
    pub feeds: Vec<GenesisFeed>,
    #[serde(default)]
    pub force_settled_volume: ShareType,
}

/// A published feed; the settlement price is `debt` units per `collateral` units
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisFeed {
    pub publisher: AccountId,
    pub published: TimePointSec,
    pub debt: ShareType,
    pub collateral: ShareType,
    #[serde(default)]
    pub maintenance_collateral_ratio: Option<u16>,
    #[serde(default)]
    pub maximum_short_squeeze_ratio: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub owner: AccountId,
    pub amount: ShareType,
    pub asset: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisCallOrder {
    pub borrower: AccountId,
    /// Symbol of the market-issued asset borrowed
    pub asset: String,
    pub debt: ShareType,
    pub collateral: ShareType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisLimitOrder {
    pub seller: AccountId,
    pub sell: GenesisAmount,
    pub receive: GenesisAmount,
    pub expiration: TimePointSec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisSettlement {
    pub owner: AccountId,
    pub amount: ShareType,
    pub asset: String,
    pub settlement_date: TimePointSec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisProposal {
    pub proposer: AccountId,
    pub expiration: TimePointSec,
    #[serde(default)]
    pub ops: Vec<Operation>,
    #[serde(default)]
    pub required: BTreeSet<AccountId>,
    #[serde(default)]
    pub approvals: BTreeSet<AccountId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisWithdrawPermission {
    pub from: AccountId,
    pub to: AccountId,
    pub limit: GenesisAmount,
    pub expiration: TimePointSec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisTransaction {
    pub seed: u64,
    pub expiration: TimePointSec,
}

fn invalid(msg: impl Into<String>) -> ChainError {
    ChainError::Genesis(msg.into())
}

impl GenesisState {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| invalid(e.to_string()))
    }

    /// Asset ids by symbol, core first
    fn symbols(&self) -> Result<BTreeMap<String, AssetId>> {
        let mut symbols = BTreeMap::new();
        symbols.insert(self.core_symbol.clone(), AssetId::CORE);
        for (i, asset) in self.assets.iter().enumerate() {
            let id = AssetId(i as u64 + 1);
            if symbols.insert(asset.symbol.clone(), id).is_some() {
                return Err(invalid(format!("duplicate asset symbol {}", asset.symbol)));
            }
        }
        Ok(symbols)
    }

    /// Check everything `build` relies on, without building
    pub fn validate(&self) -> Result<()> {
        if self.witnesses.is_empty() {
            return Err(invalid("at least one witness is required"));
        }
        if self.parameters.block_interval == 0 {
            return Err(invalid("block_interval must be positive"));
        }
        if self.parameters.maintenance_interval == 0 {
            return Err(invalid("maintenance_interval must be positive"));
        }
        if self.witness_budget < 0 {
            return Err(invalid("witness_budget must not be negative"));
        }
        let symbols = self.symbols()?;
        let lookup = |symbol: &str| {
            symbols
                .get(symbol)
                .copied()
                .ok_or_else(|| invalid(format!("unknown asset {}", symbol)))
        };

        for asset in &self.assets {
            if let Some(bitasset) = &asset.bitasset {
                let backing = lookup(&bitasset.backing)?;
                if backing == lookup(&asset.symbol)? {
                    return Err(invalid(format!("{} cannot back itself", asset.symbol)));
                }
                let options = &bitasset.options;
                if options.force_settlement_offset_percent > PERCENT_100 {
                    return Err(invalid(format!(
                        "force_settlement_offset_percent of {} exceeds {}",
                        asset.symbol, PERCENT_100
                    )));
                }
                if options.maximum_force_settlement_volume > PERCENT_100 {
                    return Err(invalid(format!(
                        "maximum_force_settlement_volume of {} exceeds {}",
                        asset.symbol, PERCENT_100
                    )));
                }
                for feed in &bitasset.feeds {
                    if feed.debt <= 0 || feed.collateral <= 0 {
                        return Err(invalid(format!("feed for {} must be positive", asset.symbol)));
                    }
                }
            }
        }
        for balance in &self.balances {
            lookup(&balance.asset)?;
            if balance.amount < 0 {
                return Err(invalid("balances must not be negative"));
            }
        }
        for call in &self.call_orders {
            let id = lookup(&call.asset)?;
            let asset = self.asset(id)?;
            if asset.bitasset.is_none() {
                return Err(invalid(format!("{} is not market issued", call.asset)));
            }
            if call.debt <= 0 || call.collateral <= 0 {
                return Err(invalid("call orders need positive debt and collateral"));
            }
        }
        for order in &self.limit_orders {
            let sell = lookup(&order.sell.asset)?;
            let receive = lookup(&order.receive.asset)?;
            if sell == receive {
                return Err(invalid("limit order must trade two different assets"));
            }
            if order.sell.amount <= 0 || order.receive.amount <= 0 {
                return Err(invalid("limit order amounts must be positive"));
            }
        }
        for settle in &self.settlements {
            let id = lookup(&settle.asset)?;
            if self.asset(id)?.bitasset.is_none() {
                return Err(invalid(format!("{} is not market issued", settle.asset)));
            }
            if settle.amount <= 0 {
                return Err(invalid("settlement amounts must be positive"));
            }
        }
        for permission in &self.withdraw_permissions {
            lookup(&permission.limit.asset)?;
        }
        for symbol in symbols.keys() {
            self.holdings(symbol)?;
        }
        Ok(())
    }

    fn asset(&self, id: AssetId) -> Result<&GenesisAsset> {
        let index = id.0.checked_sub(1).ok_or_else(|| invalid("the core asset cannot be market issued"))?;
        self.assets
            .get(index as usize)
            .ok_or_else(|| invalid(format!("unknown asset {}", id)))
    }

    /// Everything held of `asset` across balances, open orders and pending settlements
    fn holdings(&self, asset: &str) -> Result<ShareType> {
        let balances = self.balances.iter().filter(|b| b.asset == asset).map(|b| b.amount);
        let orders = self
            .limit_orders
            .iter()
            .filter(|o| o.sell.asset == asset)
            .map(|o| o.sell.amount);
        let settling = self.settlements.iter().filter(|s| s.asset == asset).map(|s| s.amount);
        balances
            .chain(orders)
            .chain(settling)
            .try_fold(0 as ShareType, |total, amount| total.checked_add(amount))
            .ok_or_else(|| invalid(format!("holdings of {} overflow", asset)))
    }

    pub fn build(&self) -> Result<ChainState> {
        self.validate()?;
        let symbols = self.symbols()?;
        let id_of = |symbol: &str| {
            symbols
                .get(symbol)
                .copied()
                .ok_or_else(|| invalid(format!("unknown asset {}", symbol)))
        };
        let now = self.initial_timestamp;

        let global = GlobalProperties {
            parameters: self.parameters.clone(),
            active_witnesses: BTreeSet::new(),
        };
        let dynamic = DynamicGlobalProperties {
            time: now,
            next_maintenance_time: now + self.parameters.maintenance_interval,
            last_budget_time: now,
            witness_budget: self.witness_budget,
            recent_slots_filled: u128::MAX,
            ..Default::default()
        };
        let mut state = ChainState::new(global, dynamic);

        let mut active = BTreeSet::new();
        for w in &self.witnesses {
            let id = state.witnesses.create(|id| Witness {
                id,
                witness_account: w.account,
                last_aslot: 0,
                total_missed: 0,
                last_confirmed_block_num: 0,
            });
            active.insert(id);
        }
        state.global.modify(|g| g.active_witnesses = active);

        let core_supply = self.holdings(&self.core_symbol)?;
        state.assets.create(|id| AssetObject {
            id,
            symbol: self.core_symbol.clone(),
            issuer: AccountId::default(),
            current_supply: core_supply,
            core_exchange_rate: Price {
                base: Asset::new(1, AssetId::CORE),
                quote: Asset::new(1, AssetId::CORE),
            },
            bitasset_data_id: None,
        });

        for asset in &self.assets {
            let asset_id = id_of(&asset.symbol)?;
            let bitasset_data_id = match &asset.bitasset {
                Some(b) => Some(self.create_bitasset(&mut state, asset_id, b, id_of(&b.backing)?)?),
                None => None,
            };
            let core_exchange_rate = match bitasset_data_id {
                Some(bid) => state.bitassets.get(bid)?.current_feed.core_exchange_rate,
                None => Price::default(),
            };
            let current_supply = match asset.current_supply {
                Some(supply) => supply,
                None => self.holdings(&asset.symbol)?,
            };
            let created = state.assets.create(|id| AssetObject {
                id,
                symbol: asset.symbol.clone(),
                issuer: asset.issuer,
                current_supply,
                core_exchange_rate,
                bitasset_data_id,
            });
            if created != asset_id {
                return Err(ChainError::invariant("asset ids out of order at genesis"));
            }
        }

        for b in &self.balances {
            let asset_type = id_of(&b.asset)?;
            let existing = state.balances.indexes().by_owner_asset.get(&(b.owner, asset_type)).copied();
            match existing {
                Some(id) => state.balances.modify(id, |row| row.balance += b.amount)?,
                None => {
                    state.balances.create(|id| AccountBalance {
                        id,
                        owner: b.owner,
                        asset_type,
                        balance: b.amount,
                    });
                }
            }
        }

        for c in &self.call_orders {
            let debt_id = id_of(&c.asset)?;
            let bitasset_id = state
                .assets
                .get(debt_id)?
                .bitasset_data_id
                .ok_or_else(|| invalid(format!("{} is not market issued", c.asset)))?;
            let bitasset = state.bitassets.get(bitasset_id)?;
            let backing = bitasset.options.short_backing_asset;
            let call_price = Price::call_price(
                Asset::new(c.debt, debt_id),
                Asset::new(c.collateral, backing),
                bitasset.current_feed.maintenance_collateral_ratio,
            )?;
            state.call_orders.create(|id| CallOrder {
                id,
                borrower: c.borrower,
                collateral: c.collateral,
                debt: c.debt,
                call_price,
            });
        }

        for o in &self.limit_orders {
            let sell_price = Price::new(
                Asset::new(o.sell.amount, id_of(&o.sell.asset)?),
                Asset::new(o.receive.amount, id_of(&o.receive.asset)?),
            )?;
            state.limit_orders.create(|id| LimitOrder {
                id,
                seller: o.seller,
                for_sale: o.sell.amount,
                sell_price,
                expiration: o.expiration,
            });
        }

        for s in &self.settlements {
            let balance = Asset::new(s.amount, id_of(&s.asset)?);
            state.settlements.create(|id| ForceSettlement {
                id,
                owner: s.owner,
                balance,
                settlement_date: s.settlement_date,
            });
        }

        for p in &self.proposals {
            state.proposals.create(|id| Proposal {
                id,
                proposer: p.proposer,
                expiration_time: p.expiration,
                proposed_ops: p.ops.clone(),
                required_approvals: p.required.clone(),
                available_approvals: p.approvals.clone(),
            });
        }

        for w in &self.withdraw_permissions {
            let withdrawal_limit = Asset::new(w.limit.amount, id_of(&w.limit.asset)?);
            state.withdraw_permissions.create(|id| WithdrawPermission {
                id,
                withdraw_from_account: w.from,
                authorized_account: w.to,
                withdrawal_limit,
                expiration: w.expiration,
            });
        }

        for t in &self.transactions {
            let trx_id = TransactionId::from_seed(t.seed);
            if state.transactions.indexes().by_trx_id.contains_key(&trx_id) {
                return Err(invalid(format!("duplicate transaction seed {}", t.seed)));
            }
            state.transactions.create(|id| TransactionRecord {
                id,
                trx_id,
                expiration: t.expiration,
            });
        }

        Ok(state)
    }

    fn create_bitasset(
        &self,
        state: &mut ChainState,
        asset_id: AssetId,
        genesis: &GenesisBitasset,
        backing: AssetId,
    ) -> Result<BitassetDataId> {
        let mut feeds = BTreeMap::new();
        for f in &genesis.feeds {
            let settlement_price = Price::new(Asset::new(f.debt, asset_id), Asset::new(f.collateral, backing))?;
            let core_exchange_rate = if backing == AssetId::CORE {
                settlement_price
            } else {
                Price::default()
            };
            let defaults = PriceFeed::default();
            let feed = PriceFeed {
                settlement_price,
                core_exchange_rate,
                maintenance_collateral_ratio: f
                    .maintenance_collateral_ratio
                    .unwrap_or(defaults.maintenance_collateral_ratio),
                maximum_short_squeeze_ratio: f
                    .maximum_short_squeeze_ratio
                    .unwrap_or(defaults.maximum_short_squeeze_ratio),
            };
            feeds.insert(f.publisher, (f.published, feed));
        }

        let mut data = BitassetData {
            id: BitassetDataId::default(),
            asset_id,
            options: BitassetOptions {
                short_backing_asset: backing,
                ..genesis.options.clone()
            },
            feeds,
            current_feed: PriceFeed::default(),
            current_feed_publication_time: self.initial_timestamp,
            force_settled_volume: genesis.force_settled_volume.clamp(0, MAX_SHARE_SUPPLY),
            settlement_price: Price::default(),
            settlement_fund: 0,
        };
        data.update_median_feeds(self.initial_timestamp);
        Ok(state.bitassets.create(move |id| BitassetData { id, ..data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = r#"
        initial_timestamp = 1000
        witness_budget = 50

        [parameters]
        block_interval = 5

        [[witnesses]]
        account = 10
        [[witnesses]]
        account = 11

        [[assets]]
        symbol = "USD"
        [assets.bitasset]
        options = { feed_lifetime_sec = 3600, force_settlement_offset_percent = 100 }
        feeds = [{ publisher = 10, published = 990, debt = 10, collateral = 1 }]

        [[balances]]
        owner = 1
        amount = 500
        asset = "USD"

        [[call_orders]]
        borrower = 2
        asset = "USD"
        debt = 1000
        collateral = 300

        [[settlements]]
        owner = 1
        amount = 500
        asset = "USD"
        settlement_date = 2000
    "#;

    #[test]
    fn test_build_from_toml() {
        let genesis = GenesisState::from_toml(GENESIS).unwrap();
        let state = genesis.build().unwrap();

        assert_eq!(state.global.get().active_witnesses.len(), 2);
        assert_eq!(state.dynamic.get().witness_budget, 50);
        assert_eq!(state.dynamic.get().recent_slots_filled, u128::MAX);

        let usd = state.assets.get(AssetId(1)).unwrap();
        assert_eq!(usd.symbol, "USD");
        assert_eq!(usd.current_supply, 1000);
        let bitasset = state.bitassets.get(usd.bitasset_data_id.unwrap()).unwrap();
        assert_eq!(bitasset.options.force_settlement_offset_percent, 100);
        assert_eq!(bitasset.options.short_backing_asset, AssetId::CORE);
        assert!(!bitasset.current_feed.settlement_price.is_null());
        assert_eq!(usd.core_exchange_rate, bitasset.current_feed.core_exchange_rate);

        let call = state.call_orders.iter().next().unwrap();
        assert_eq!(call.debt_type(), AssetId(1));
        assert_eq!(call.collateral_type(), AssetId::CORE);
        assert_eq!(state.settlements.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_asset() {
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        genesis.balances[0].asset = "EUR".into();
        assert!(matches!(genesis.build(), Err(ChainError::Genesis(_))));
    }

    #[test]
    fn test_rejects_call_on_plain_asset() {
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        genesis.call_orders[0].asset = "CORE".into();
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_rejects_settlement_options_above_full_percent() {
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        let options = &mut genesis.assets[0].bitasset.as_mut().unwrap().options;
        options.force_settlement_offset_percent = 20_000;
        assert!(matches!(genesis.validate(), Err(ChainError::Genesis(_))));

        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        let options = &mut genesis.assets[0].bitasset.as_mut().unwrap().options;
        options.maximum_force_settlement_volume = PERCENT_100 + 1;
        assert!(matches!(genesis.build(), Err(ChainError::Genesis(_))));

        // the full percentage is still allowed
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        let options = &mut genesis.assets[0].bitasset.as_mut().unwrap().options;
        options.force_settlement_offset_percent = PERCENT_100;
        options.maximum_force_settlement_volume = PERCENT_100;
        assert!(genesis.validate().is_ok());
    }

    #[test]
    fn test_rejects_overflowing_holdings() {
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        genesis.balances.push(GenesisBalance {
            owner: AccountId(3),
            amount: ShareType::MAX,
            asset: "USD".into(),
        });
        assert!(matches!(genesis.validate(), Err(ChainError::Genesis(_))));
        assert!(matches!(genesis.build(), Err(ChainError::Genesis(_))));
    }

    #[test]
    fn test_requires_witness() {
        let mut genesis = GenesisState::from_toml(GENESIS).unwrap();
        genesis.witnesses.clear();
        assert!(genesis.validate().is_err());
    }
}
