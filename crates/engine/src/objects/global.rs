//! Chain-wide singletons

use std::collections::BTreeSet;

use keeper_common::constants::{
    DEFAULT_BLOCK_INTERVAL, DEFAULT_MAINTENANCE_INTERVAL, DEFAULT_MAINTENANCE_SKIP_SLOTS, MAINTENANCE_FLAG,
};
use keeper_common::{BlockId, ShareType, TimePointSec, WitnessId};
use serde::{Deserialize, Serialize};

/// Consensus parameters, changed only at maintenance boundaries
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParameters {
    /// Seconds per slot
    pub block_interval: u8,
    /// Seconds between maintenance blocks
    pub maintenance_interval: u32,
    /// Slots skipped after a maintenance block
    pub maintenance_skip_slots: u8,
    /// Core paid to the signer of every block, while the budget lasts
    pub witness_pay_per_block: ShareType,
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self {
            block_interval: DEFAULT_BLOCK_INTERVAL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            maintenance_skip_slots: DEFAULT_MAINTENANCE_SKIP_SLOTS,
            witness_pay_per_block: 1_000_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GlobalProperties {
    pub parameters: ChainParameters,
    /// Producers in the current schedule, in id order
    pub active_witnesses: BTreeSet<WitnessId>,
}

/// Mutated by every block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: BlockId,
    pub time: TimePointSec,
    pub current_witness: WitnessId,
    pub next_maintenance_time: TimePointSec,
    pub last_budget_time: TimePointSec,
    /// Remaining pool witness pay is drawn from
    pub witness_budget: ShareType,
    /// Rises fast on missed slots, decays slowly on filled ones
    pub recently_missed_count: u32,
    /// Absolute slot of the head block
    pub current_aslot: u64,
    /// Filled (1) / missed (0) history, most recent slot in the low bit
    pub recent_slots_filled: u128,
    pub dynamic_flags: u32,
    pub last_irreversible_block_num: u32,
}

impl DynamicGlobalProperties {
    pub fn in_maintenance(&self) -> bool {
        self.dynamic_flags & MAINTENANCE_FLAG != 0
    }

    /// Filled-slot share of the last 128 slots in `PERCENT_100` units
    pub fn participation(&self) -> u16 {
        let filled = self.recent_slots_filled.count_ones() as u64;
        (filled * keeper_common::constants::PERCENT_100 as u64 / 128) as u16
    }
}
