//! Chain builders shared by the integration suites

use keeper_common::{BlockId, WitnessId};
use keeper_engine::{Checkpoints, Database, GenesisState, NodeProperties, SignedBlock};

pub const GENESIS_TIME: u32 = 1_000;

/// Genesis header with `witnesses` producers (accounts 100, 101, ...) and a
/// 5 second block interval; `body` is appended verbatim
pub fn genesis_toml(witnesses: u64, body: &str) -> String {
    let mut text = format!("initial_timestamp = {}\nwitness_budget = 1000000\n", GENESIS_TIME);
    for i in 0..witnesses {
        text.push_str(&format!("[[witnesses]]\naccount = {}\n", 100 + i));
    }
    text.push_str(body);
    text
}

pub fn chain(witnesses: u64, body: &str) -> Database {
    chain_with(witnesses, body, NodeProperties::default(), Checkpoints::new())
}

pub fn chain_with(witnesses: u64, body: &str, node: NodeProperties, checkpoints: Checkpoints) -> Database {
    let genesis = GenesisState::from_toml(&genesis_toml(witnesses, body)).unwrap();
    Database::from_genesis(&genesis, node, checkpoints).unwrap()
}

/// Empty block in the `slot`-th slot after the head, signed by its scheduled producer
pub fn block_at(db: &Database, slot: u32) -> SignedBlock {
    SignedBlock {
        previous: db.dynamic_global_properties().head_block_id,
        timestamp: db.get_slot_time(slot),
        witness: db.get_scheduled_witness(slot),
        transactions: Vec::new(),
    }
}

pub fn signed_by(db: &Database, slot: u32, witness: WitnessId) -> SignedBlock {
    SignedBlock {
        witness,
        ..block_at(db, slot)
    }
}

pub fn push_slot(db: &mut Database, slot: u32) -> BlockId {
    let block = block_at(db, slot);
    let id = block.id();
    db.push_block(block).unwrap();
    id
}
