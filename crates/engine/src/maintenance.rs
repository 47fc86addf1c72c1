//! Maintenance interval bookkeeping

use keeper_common::{BitassetDataId, TimePointSec};

use crate::block::SignedBlock;
use crate::database::Database;
use crate::error::Result;

/// First maintenance boundary strictly after the head, given the scheduled one
///
/// Block 1 aligns the schedule to multiples of the interval. Later blocks
/// step the scheduled boundary forward by whole intervals, skipping every
/// boundary the chain slept through.
pub fn next_maintenance_time(
    block_num: u32,
    block_time: TimePointSec,
    scheduled: TimePointSec,
    interval: u32,
) -> TimePointSec {
    let interval = interval.max(1);
    if block_num == 1 {
        let periods = block_time.secs() / interval + 1;
        return TimePointSec(periods.saturating_mul(interval));
    }
    let behind = (block_time - scheduled).max(0) as u32;
    let periods = behind / interval + 1;
    scheduled.saturating_add(periods.saturating_mul(interval))
}

impl Database {
    /// Start a new maintenance interval
    ///
    /// Clears every asset's force settlement volume, so settlement caps
    /// restart, and schedules the next boundary.
    pub fn perform_chain_maintenance(&mut self, block: &SignedBlock) -> Result<()> {
        let bitassets: Vec<BitassetDataId> = self.state().bitassets.iter().map(|b| b.id).collect();
        for id in bitassets {
            self.state_mut().bitassets.modify(id, |b| b.force_settled_volume = 0)?;
        }

        let dgp = self.dynamic_global_properties();
        let next = next_maintenance_time(
            block.block_num(),
            dgp.time,
            dgp.next_maintenance_time,
            self.global_properties().parameters.maintenance_interval,
        );
        let now = dgp.time;
        self.state_mut().dynamic.modify(|dgp| {
            dgp.next_maintenance_time = next;
            dgp.last_budget_time = now;
        });

        log::info!("maintenance at block {} ({}), next at {}", block.block_num(), now, next);
        Ok(())
    }
}
