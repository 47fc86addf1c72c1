//! Slot clock and round-robin producer schedule

use keeper_common::{TimePointSec, WitnessId};

use crate::database::Database;

impl Database {
    pub fn block_interval(&self) -> u32 {
        self.global_properties().parameters.block_interval as u32
    }

    /// Start time of the `slot_num`-th slot after the head block
    ///
    /// Slot 0 has no time. Before the first block, slots count from the
    /// genesis time; afterwards from the head time aligned down to the block
    /// interval, skipping the configured slots after a maintenance block.
    pub fn get_slot_time(&self, slot_num: u32) -> TimePointSec {
        if slot_num == 0 {
            return TimePointSec::default();
        }
        let interval = self.block_interval();
        let dgp = self.dynamic_global_properties();

        if dgp.head_block_number == 0 {
            return dgp.time + slot_num.saturating_mul(interval);
        }

        let head_slot_time = TimePointSec(dgp.time.secs() / interval * interval);
        let mut slot_num = slot_num;
        if dgp.in_maintenance() {
            slot_num = slot_num.saturating_add(self.global_properties().parameters.maintenance_skip_slots as u32);
        }
        head_slot_time + slot_num.saturating_mul(interval)
    }

    /// Number of the slot `when` falls into, counting from the head; 0 if
    /// `when` precedes the next slot
    pub fn get_slot_at_time(&self, when: TimePointSec) -> u32 {
        let first_slot_time = self.get_slot_time(1);
        if when < first_slot_time {
            return 0;
        }
        (when.secs() - first_slot_time.secs()) / self.block_interval() + 1
    }

    /// Producer of the `slot_num`-th slot after the head
    pub fn get_scheduled_witness(&self, slot_num: u32) -> WitnessId {
        let active = &self.global_properties().active_witnesses;
        if active.is_empty() {
            return WitnessId::default();
        }
        let aslot = self.dynamic_global_properties().current_aslot + slot_num as u64;
        let index = (aslot % active.len() as u64) as usize;
        active.iter().nth(index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_support::*;
    use keeper_common::{TimePointSec, WitnessId};

    #[test]
    fn test_slots_from_genesis() {
        let db = database(&genesis(3));
        assert_eq!(db.get_slot_time(0), TimePointSec(0));
        assert_eq!(db.get_slot_time(1), TimePointSec(GENESIS_TIME + 5));
        assert_eq!(db.get_slot_at_time(TimePointSec(GENESIS_TIME + 4)), 0);
        assert_eq!(db.get_slot_at_time(TimePointSec(GENESIS_TIME + 5)), 1);
        assert_eq!(db.get_slot_at_time(TimePointSec(GENESIS_TIME + 19)), 3);
    }

    #[test]
    fn test_round_robin() {
        let mut db = database(&genesis(3));
        assert_eq!(db.get_scheduled_witness(1), WitnessId(1));
        assert_eq!(db.get_scheduled_witness(3), WitnessId(0));
        push_next(&mut db);
        // the head moved one slot, so the rotation did too
        assert_eq!(db.get_scheduled_witness(1), WitnessId(2));
    }

    #[test]
    fn test_slots_after_head_align_to_interval() {
        let mut db = database(&genesis(1));
        push_next(&mut db);
        let head = db.head_block_time();
        assert_eq!(db.get_slot_time(1), head + 5);
        assert_eq!(db.get_slot_at_time(head + 12), 2);
    }
}
