//! Producer bookkeeping across block sequences

use keeper_common::constants::MAX_UNDO_HISTORY;
use keeper_common::{AccountId, AssetId, BlockId, WitnessId};
use keeper_engine::{Checkpoints, NodeProperties};
use keeper_integration_tests::*;
use proptest::prelude::*;

fn missed(db: &keeper_engine::Database, w: u64) -> u32 {
    db.state().witnesses.get(WitnessId(w)).unwrap().total_missed
}

#[test]
fn test_missed_slots_charged_to_others() {
    let mut db = chain(3, "");
    push_slot(&mut db, 1);

    // w0 fills the third slot from the head; w1 and w2 had the two before it
    let signer = db.get_scheduled_witness(3);
    let skipped = [db.get_scheduled_witness(1), db.get_scheduled_witness(2)];
    assert!(!skipped.contains(&signer));
    db.push_block(signed_by(&db, 3, signer)).unwrap();

    for w in skipped {
        assert_eq!(missed(&db, w.0), 1);
    }
    assert_eq!(missed(&db, signer.0), 0);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 8);
}

#[test]
fn test_signer_not_charged_for_own_slot() {
    let mut db = chain(2, "");
    push_slot(&mut db, 1);

    // with two producers, slots 1 and 3 belong to the same one
    let signer = db.get_scheduled_witness(3);
    assert_eq!(db.get_scheduled_witness(1), signer);
    let other = db.get_scheduled_witness(2);
    db.push_block(signed_by(&db, 3, signer)).unwrap();

    assert_eq!(missed(&db, signer.0), 0);
    assert_eq!(missed(&db, other.0), 1);
}

#[test]
fn test_checkpoint_resets_missed_count() {
    let mut checkpoints = Checkpoints::new();
    checkpoints.insert(50, BlockId::default());
    let mut db = chain_with(3, "", NodeProperties::default(), checkpoints);
    push_slot(&mut db, 1);
    push_slot(&mut db, 3);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 0);

    let mut db = chain(3, "");
    push_slot(&mut db, 1);
    push_slot(&mut db, 3);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 8);
    // filled slots pay it back, fast then slow
    push_slot(&mut db, 1);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 5);
    push_slot(&mut db, 1);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 2);
    push_slot(&mut db, 1);
    assert_eq!(db.dynamic_global_properties().recently_missed_count, 1);
}

#[test]
fn test_maintenance_block_skips_slots() {
    let mut db = chain(1, "[parameters]\nmaintenance_interval = 10\nmaintenance_skip_slots = 3\n");
    push_slot(&mut db, 1);
    assert!(!db.dynamic_global_properties().in_maintenance());

    // 1010 reaches the boundary at genesis + 10
    push_slot(&mut db, 1);
    let dgp = db.dynamic_global_properties();
    assert!(dgp.in_maintenance());
    assert_eq!(dgp.time.secs(), 1010);
    assert_eq!(dgp.next_maintenance_time.secs(), 1020);
    assert_eq!(db.get_slot_time(1).secs(), 1010 + 5 + 3 * 5);

    // the skipped slots are not missed slots
    push_slot(&mut db, 1);
    assert_eq!(missed(&db, 0), 0);
    assert_eq!(db.dynamic_global_properties().time.secs(), 1030);
    // 1030 is past 1020 as well, so this is a maintenance block too
    assert!(db.dynamic_global_properties().in_maintenance());
    assert_eq!(db.dynamic_global_properties().next_maintenance_time.secs(), 1040);
}

#[test]
fn test_budget_exhaustion_stops_pay() {
    let mut db = chain(2, "[parameters]\nwitness_pay_per_block = 400000\n");
    for _ in 0..4 {
        push_slot(&mut db, 1);
    }
    assert_eq!(db.dynamic_global_properties().witness_budget, 0);
    let paid: i64 = [100, 101]
        .iter()
        .map(|a| db.get_balance(AccountId(*a), AssetId::CORE).amount)
        .sum();
    assert_eq!(paid, 1_000_000);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_irreversibility_and_pay(
        witnesses in 1u64..8,
        gaps in prop::collection::vec(0u32..4, 1..40),
        pay in 0i64..400_000,
    ) {
        let body = format!("[parameters]\nwitness_pay_per_block = {}\n", pay);
        let mut db = chain(witnesses, &body);
        let mut last_irreversible = 0;

        for gap in gaps {
            let budget = db.dynamic_global_properties().witness_budget;
            let block = block_at(&db, gap + 1);
            let account = AccountId(100 + block.witness.0);
            let before = db.get_balance(account, AssetId::CORE).amount;
            db.push_block(block).unwrap();

            let dgp = db.dynamic_global_properties();
            prop_assert!(dgp.last_irreversible_block_num >= last_irreversible);
            prop_assert!(dgp.last_irreversible_block_num <= dgp.head_block_number);
            prop_assert!(dgp.head_block_number - dgp.last_irreversible_block_num < MAX_UNDO_HISTORY);
            prop_assert!(dgp.witness_budget >= 0);

            let earned = db.get_balance(account, AssetId::CORE).amount - before;
            prop_assert_eq!(earned, pay.min(budget));
            prop_assert_eq!(budget - dgp.witness_budget, earned);
            last_irreversible = dgp.last_irreversible_block_num;
        }
    }
}
