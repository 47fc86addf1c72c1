//! Producer performance, irreversibility and history bounds
//!
//! Runs first for every block. The missed-slot penalty is recomputed by a
//! ranked rule list: the first rule whose condition holds decides the new
//! value, so reordering the list changes consensus.

use keeper_common::constants::{
    IRREVERSIBLE_THRESHOLD, MAINTENANCE_FLAG, MAX_UNDO_HISTORY, PERCENT_100, RECENTLY_MISSED_COUNT_DECREMENT,
    RECENTLY_MISSED_COUNT_INCREMENT,
};
use keeper_common::WitnessId;

use crate::block::SignedBlock;
use crate::config::SkipFlags;
use crate::database::Database;
use crate::error::{ChainError, Result};

// ============================================================================
// Missed-slot penalty
// ============================================================================

/// Inputs the penalty rules look at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissedCountInput {
    pub block_num: u32,
    pub newest_checkpoint: Option<u32>,
    pub missed_blocks: u32,
    pub count: u32,
}

/// One ranked rule: applies when `when` holds, producing `then`
pub struct MissedCountRule {
    pub name: &'static str,
    pub when: fn(&MissedCountInput) -> bool,
    pub then: fn(&MissedCountInput) -> u32,
}

/// Evaluated top to bottom; the last rule always matches
pub const MISSED_COUNT_RULES: &[MissedCountRule] = &[
    MissedCountRule {
        name: "first block",
        when: |i| i.block_num == 1,
        then: |_| 0,
    },
    MissedCountRule {
        name: "checkpointed",
        when: |i| i.newest_checkpoint.is_some_and(|c| c >= i.block_num),
        then: |_| 0,
    },
    MissedCountRule {
        name: "missed slots",
        when: |i| i.missed_blocks > 0,
        then: |i| {
            i.count
                .saturating_add(RECENTLY_MISSED_COUNT_INCREMENT.saturating_mul(i.missed_blocks))
        },
    },
    MissedCountRule {
        name: "fast decay",
        when: |i| i.count > RECENTLY_MISSED_COUNT_INCREMENT,
        then: |i| i.count - RECENTLY_MISSED_COUNT_DECREMENT,
    },
    MissedCountRule {
        name: "slow decay",
        when: |i| i.count > 0,
        then: |i| i.count - 1,
    },
    MissedCountRule {
        name: "floor",
        when: |_| true,
        then: |i| i.count,
    },
];

pub fn next_recently_missed_count(input: &MissedCountInput) -> u32 {
    MISSED_COUNT_RULES
        .iter()
        .find(|rule| (rule.when)(input))
        .map_or(input.count, |rule| (rule.then)(input))
}

impl Database {
    // ========================================================================
    // Per-block bookkeeping
    // ========================================================================

    /// Advance the head to `block`, charging missed slots to their producers
    pub fn update_global_dynamic_data(&mut self, block: &SignedBlock) -> Result<()> {
        let block_num = block.block_num();
        let slot = self.get_slot_at_time(block.timestamp);
        if slot == 0 {
            return Err(ChainError::invariant(format!(
                "block {} at {} does not fill a slot after the head",
                block_num, block.timestamp
            )));
        }
        let missed_blocks = slot - 1;

        for i in 1..=missed_blocks {
            let missed: WitnessId = self.get_scheduled_witness(i);
            if missed != block.witness {
                self.state_mut().witnesses.modify(missed, |w| w.total_missed += 1)?;
            }
        }

        let input = MissedCountInput {
            block_num,
            newest_checkpoint: self.checkpoints().keys().next_back().copied(),
            missed_blocks,
            count: self.dynamic_global_properties().recently_missed_count,
        };
        let recently_missed_count = next_recently_missed_count(&input);
        let block_id = block.id();

        self.state_mut().dynamic.modify(|dgp| {
            dgp.recently_missed_count = recently_missed_count;
            dgp.head_block_number = block_num;
            dgp.head_block_id = block_id;
            dgp.time = block.timestamp;
            dgp.current_witness = block.witness;
            dgp.recent_slots_filled = dgp
                .recent_slots_filled
                .wrapping_shl(1)
                .wrapping_add(1)
                .checked_shl(missed_blocks)
                .unwrap_or(0);
            dgp.current_aslot += missed_blocks as u64 + 1;
        });

        let dgp = self.dynamic_global_properties();
        let head = dgp.head_block_number;
        let last_irreversible = dgp.last_irreversible_block_num;
        if !self.node_properties().skip_flags.contains(SkipFlags::SKIP_UNDO_HISTORY_CHECK)
            && head - last_irreversible >= MAX_UNDO_HISTORY
        {
            return Err(ChainError::UndoHistoryExhausted {
                head,
                last_irreversible,
                max_undo: MAX_UNDO_HISTORY,
            });
        }

        if missed_blocks > 0 {
            log::debug!(
                "block {} missed {} slots, recently missed {}",
                block_num,
                missed_blocks,
                recently_missed_count
            );
        }
        self.set_history_size(head - last_irreversible + 1);
        Ok(())
    }

    /// Pay the signer and record the slot it filled
    pub fn update_signing_witness(&mut self, signer: WitnessId, block: &SignedBlock) -> Result<()> {
        let dgp = self.dynamic_global_properties();
        let new_block_aslot = dgp.current_aslot + self.get_slot_at_time(block.timestamp) as u64;
        let pay = self
            .global_properties()
            .parameters
            .witness_pay_per_block
            .min(dgp.witness_budget)
            .max(0);

        self.state_mut().dynamic.modify(|dgp| dgp.witness_budget -= pay);
        self.deposit_witness_pay(signer, pay)?;

        let block_num = block.block_num();
        self.state_mut().witnesses.modify(signer, |w| {
            w.last_aslot = new_block_aslot;
            w.last_confirmed_block_num = block_num;
        })?;
        Ok(())
    }

    /// Raise the irreversible height to what enough active producers have confirmed
    pub fn update_last_irreversible_block(&mut self) -> Result<()> {
        let state = self.state();
        let mut confirmed = Vec::with_capacity(state.global.get().active_witnesses.len());
        for id in &state.global.get().active_witnesses {
            confirmed.push(state.witnesses.get(*id)?.last_confirmed_block_num);
        }
        if confirmed.is_empty() {
            return Ok(());
        }

        let offset = (PERCENT_100 - IRREVERSIBLE_THRESHOLD) as usize * confirmed.len() / PERCENT_100 as usize;
        let (_, candidate, _) = confirmed.select_nth_unstable(offset);
        let candidate = *candidate;

        if candidate > self.dynamic_global_properties().last_irreversible_block_num {
            self.state_mut()
                .dynamic
                .modify(|dgp| dgp.last_irreversible_block_num = candidate);
        }
        Ok(())
    }

    pub fn update_maintenance_flag(&mut self, in_maintenance: bool) {
        self.state_mut().dynamic.modify(|dgp| {
            dgp.dynamic_flags = (dgp.dynamic_flags & !MAINTENANCE_FLAG) | if in_maintenance { MAINTENANCE_FLAG } else { 0 };
        });
    }
}
