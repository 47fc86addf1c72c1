//! Block atomicity, replay protection and the expiration sweeps

use keeper_common::{AccountId, AssetId, LimitOrderId, TimePointSec, TransactionId};
use keeper_engine::{ChainError, Database, SignedTransaction};
use keeper_integration_tests::*;

const CORE: AssetId = AssetId::CORE;

fn trx(seed: u64, expiration: u32) -> SignedTransaction {
    SignedTransaction {
        id: TransactionId::from_seed(seed),
        expiration: TimePointSec(expiration),
    }
}

/// Counts of every table plus the head, enough to tell whether a block left a trace
fn fingerprint(db: &Database) -> Vec<i64> {
    let state = db.state();
    let dgp = db.dynamic_global_properties();
    vec![
        dgp.head_block_number as i64,
        dgp.witness_budget,
        dgp.time.secs() as i64,
        state.balances.len() as i64,
        state.limit_orders.len() as i64,
        state.settlements.len() as i64,
        state.transactions.len() as i64,
        state.proposals.len() as i64,
        db.undo_depth() as i64,
    ]
}

#[test]
fn test_failed_block_leaves_no_trace() {
    // the limit order expires first, then the due settlement finds nothing to match
    let mut db = chain(
        1,
        r#"
        [[assets]]
        symbol = "USD"
        current_supply = 100
        [assets.bitasset]
        feeds = [{ publisher = 100, published = 1000, debt = 1, collateral = 1 }]

        [[limit_orders]]
        seller = 5
        sell = { amount = 30, asset = "CORE" }
        receive = { amount = 3, asset = "USD" }
        expiration = 1005

        [[settlements]]
        owner = 1
        amount = 100
        asset = "USD"
        settlement_date = 1005
        "#,
    );
    let before = fingerprint(&db);

    let mut block = block_at(&db, 1);
    block.transactions.push(trx(1, 2000));
    let err = db.push_block(block).unwrap_err();
    assert!(matches!(err, ChainError::Invariant(_)));

    assert_eq!(fingerprint(&db), before);
    assert!(db.state().limit_orders.contains(LimitOrderId(0)));
    assert_eq!(db.get_balance(AccountId(5), CORE).amount, 0);
    assert_eq!(db.get_balance(AccountId(100), CORE).amount, 0);
}

#[test]
fn test_duplicate_transaction_rejects_block() {
    let mut db = chain(1, "");
    let mut block = block_at(&db, 1);
    block.transactions.push(trx(1, 2000));
    db.push_block(block).unwrap();
    assert_eq!(db.state().transactions.len(), 1);

    let before = fingerprint(&db);
    let mut block = block_at(&db, 1);
    block.transactions.push(trx(2, 2000));
    block.transactions.push(trx(1, 2000));
    let err = db.push_block(block).unwrap_err();
    assert_eq!(err, ChainError::DuplicateTransaction(TransactionId::from_seed(1)));
    assert_eq!(fingerprint(&db), before);
}

#[test]
fn test_replay_protection_expires() {
    let mut db = chain(1, "");
    let mut block = block_at(&db, 1);
    block.transactions.push(trx(1, 1007));
    db.push_block(block).unwrap();

    // still held at 1005 (its own block) and dropped once the head passes 1007
    assert_eq!(db.state().transactions.len(), 1);
    push_slot(&mut db, 1);
    assert!(db.state().transactions.is_empty());

    // so the same id is accepted again
    let mut block = block_at(&db, 1);
    block.transactions.push(trx(1, 1030));
    db.push_block(block).unwrap();
    assert_eq!(db.state().transactions.len(), 1);
}

#[test]
fn test_proposals_resolved_inside_block() {
    let mut db = chain(
        1,
        r#"
        [[balances]]
        owner = 1
        amount = 100
        asset = "CORE"

        [[proposals]]
        proposer = 1
        expiration = 1005
        required = [1]
        approvals = [1]
        ops = [
            { type = "transfer", from = 1, to = 2, amount = { amount = 70, asset_id = 0 } },
            { type = "transfer", from = 1, to = 3, amount = { amount = 70, asset_id = 0 } },
        ]

        [[proposals]]
        proposer = 1
        expiration = 1010
        required = [1]
        approvals = [1]
        ops = [{ type = "transfer", from = 1, to = 2, amount = { amount = 70, asset_id = 0 } }]
        "#,
    );

    // the first proposal overdraws and is dropped, the block goes through
    push_slot(&mut db, 1);
    assert_eq!(db.head_block_num(), 1);
    assert_eq!(db.state().proposals.len(), 1);
    assert_eq!(db.get_balance(AccountId(1), CORE).amount, 100);
    assert_eq!(db.get_balance(AccountId(2), CORE).amount, 0);

    push_slot(&mut db, 1);
    assert!(db.state().proposals.is_empty());
    assert_eq!(db.get_balance(AccountId(1), CORE).amount, 30);
    assert_eq!(db.get_balance(AccountId(2), CORE).amount, 70);
}

#[test]
fn test_quiet_blocks_change_nothing_but_the_head() {
    let body = r#"
        [[limit_orders]]
        seller = 5
        sell = { amount = 30, asset = "CORE" }
        receive = { amount = 3, asset = "USD" }
        expiration = 9000

        [[assets]]
        symbol = "USD"

        [[withdraw_permissions]]
        from = 1
        to = 2
        limit = { amount = 5, asset = "CORE" }
        expiration = 9000
        "#;
    let mut db = chain(1, body);
    for _ in 0..5 {
        push_slot(&mut db, 1);
    }
    assert_eq!(db.state().limit_orders.len(), 1);
    assert_eq!(db.state().withdraw_permissions.len(), 1);
    assert_eq!(db.state().assets.get(AssetId(1)).unwrap().current_supply, 0);
}
