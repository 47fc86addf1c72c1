//! Consensus constants
//!
//! These values are part of the consensus rules. Changing any of them on a
//! single node forks that node off the network.

/// Denominator for every percentage parameter ("100%")
pub const PERCENT_100: u16 = 10_000;

/// One percent in `PERCENT_100` units
pub const PERCENT_1: u16 = PERCENT_100 / 100;

/// Share of active witnesses that must confirm a block for it to become irreversible
pub const IRREVERSIBLE_THRESHOLD: u16 = 70 * PERCENT_1;

/// Penalty added to `recently_missed_count` per missed slot
pub const RECENTLY_MISSED_COUNT_INCREMENT: u32 = 4;

/// Penalty removed per filled slot while the count is above the increment
pub const RECENTLY_MISSED_COUNT_DECREMENT: u32 = 3;

/// Maximum number of blocks the undo history may retain
pub const MAX_UNDO_HISTORY: u32 = 10_000;

/// Upper bound on the supply of any asset
pub const MAX_SHARE_SUPPLY: i64 = 1_000_000_000_000_000;

/// Denominator for collateral ratios (1750 = 175%)
pub const COLLATERAL_RATIO_DENOM: u16 = 1_000;

pub const DEFAULT_BLOCK_INTERVAL: u8 = 5;
pub const DEFAULT_MAINTENANCE_INTERVAL: u32 = 60 * 60 * 24;
pub const DEFAULT_MAINTENANCE_SKIP_SLOTS: u8 = 3;

pub const DEFAULT_PRICE_FEED_LIFETIME: u32 = 60 * 60 * 24;
pub const DEFAULT_FORCE_SETTLEMENT_DELAY: u32 = 60 * 60 * 24;
pub const DEFAULT_FORCE_SETTLEMENT_OFFSET: u16 = 0;
pub const DEFAULT_FORCE_SETTLEMENT_MAX_VOLUME: u16 = 20 * PERCENT_1;
pub const DEFAULT_MAINTENANCE_COLLATERAL_RATIO: u16 = 1_750;
pub const DEFAULT_MAX_SHORT_SQUEEZE_RATIO: u16 = 1_500;

/// Bit in `dynamic_flags` set while the chain is in its maintenance block
pub const MAINTENANCE_FLAG: u32 = 0x01;
