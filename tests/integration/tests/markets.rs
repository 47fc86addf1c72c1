//! Force settlement and insolvency handling driven through whole blocks

use keeper_common::{AccountId, AssetId, BitassetDataId, CallOrderId, ForceSettlementId};
use keeper_engine::{ChainError, Database};
use keeper_integration_tests::*;

const USD: AssetId = AssetId(1);
const CORE: AssetId = AssetId::CORE;

fn volume(db: &Database) -> i64 {
    db.state().bitassets.get(BitassetDataId(0)).unwrap().force_settled_volume
}

#[test]
fn test_settlement_pays_feed_less_offset() {
    let mut db = chain(
        1,
        r#"
        [[assets]]
        symbol = "USD"
        current_supply = 5000
        [assets.bitasset]
        options = { force_settlement_offset_percent = 100, maximum_force_settlement_volume = 10000 }
        feeds = [{ publisher = 100, published = 1000, debt = 1, collateral = 2 }]

        [[call_orders]]
        borrower = 7
        asset = "USD"
        debt = 5000
        collateral = 20000

        [[settlements]]
        owner = 1
        amount = 1000
        asset = "USD"
        settlement_date = 1005
        "#,
    );
    push_slot(&mut db, 1);

    assert_eq!(db.get_balance(AccountId(1), CORE).amount, 1980);
    let call = db.state().call_orders.get(CallOrderId(0)).unwrap();
    assert_eq!((call.debt, call.collateral), (4000, 18_020));
    assert_eq!(db.state().assets.get(USD).unwrap().current_supply, 4000);
}

#[test]
fn test_settlement_cap_restarts_each_interval() {
    let mut db = chain(
        1,
        r#"
        [parameters]
        maintenance_interval = 20

        [[assets]]
        symbol = "USD"
        current_supply = 5000
        [assets.bitasset]
        feeds = [{ publisher = 100, published = 1000, debt = 1, collateral = 2 }]

        [[call_orders]]
        borrower = 7
        asset = "USD"
        debt = 5000
        collateral = 20000

        [[settlements]]
        owner = 1
        amount = 800
        asset = "USD"
        settlement_date = 1005
        [[settlements]]
        owner = 2
        amount = 800
        asset = "USD"
        settlement_date = 1005
        [[settlements]]
        owner = 3
        amount = 800
        asset = "USD"
        settlement_date = 1005
        "#,
    );

    // 20% of 5000
    push_slot(&mut db, 1);
    assert_eq!(volume(&db), 1000);
    assert_eq!(db.get_balance(AccountId(1), CORE).amount, 1600);
    assert_eq!(db.get_balance(AccountId(2), CORE).amount, 400);

    for _ in 0..2 {
        push_slot(&mut db, 1);
        assert_eq!(volume(&db), 1000);
        assert_eq!(db.get_balance(AccountId(2), CORE).amount, 400);
    }

    // the block at 1020 opens a new interval; the cap is now 20% of 4000
    push_slot(&mut db, 1);
    assert!(db.dynamic_global_properties().in_maintenance());
    assert_eq!(volume(&db), 800);
    assert_eq!(db.get_balance(AccountId(2), CORE).amount, 1600);
    assert_eq!(db.get_balance(AccountId(3), CORE).amount, 400);
    let rest = db.state().settlements.get(ForceSettlementId(2)).unwrap();
    assert_eq!(rest.balance.amount, 600);
}

#[test]
fn test_swan_at_exact_feed_price() {
    let body = r#"
        [[assets]]
        symbol = "USD"
        current_supply = 1000
        [assets.bitasset]
        feeds = [{ publisher = 100, published = 1000, debt = 10, collateral = 1 }]

        [[call_orders]]
        borrower = 7
        asset = "USD"
        debt = 1000
        collateral = 100
        "#;

    let mut db = chain(1, body);
    let err = db.check_for_blackswan(USD, false).unwrap_err();
    assert_eq!(err, ChainError::BlackSwanDisallowed { asset: USD });
    assert_eq!(db.state().call_orders.len(), 1);
    assert!(!db.bitasset_of(USD).unwrap().unwrap().has_settlement());

    assert!(db.check_for_blackswan(USD, true).unwrap());
    let bitasset = db.bitasset_of(USD).unwrap().unwrap();
    assert!(bitasset.has_settlement());
    assert_eq!(bitasset.settlement_fund, 100);
    assert!(db.state().call_orders.is_empty());
    assert_eq!(db.state().assets.get(USD).unwrap().current_supply, 1000);
}

#[test]
fn test_feed_expiry_swan_cancels_pending_settlements() {
    let mut db = chain(
        1,
        r#"
        [[assets]]
        symbol = "USD"
        current_supply = 1100
        [assets.bitasset]
        options = { feed_lifetime_sec = 20 }
        feeds = [
            { publisher = 100, published = 1000, debt = 20, collateral = 1 },
            { publisher = 101, published = 1010, debt = 5, collateral = 1 },
        ]

        [[call_orders]]
        borrower = 7
        asset = "USD"
        debt = 1000
        collateral = 100

        [[settlements]]
        owner = 1
        amount = 100
        asset = "USD"
        settlement_date = 5000
        "#,
    );
    for _ in 0..3 {
        push_slot(&mut db, 1);
    }
    assert!(!db.bitasset_of(USD).unwrap().unwrap().has_settlement());

    // at 1020 the older feed lapses and the median drops to 5 USD per CORE
    push_slot(&mut db, 1);
    assert!(db.bitasset_of(USD).unwrap().unwrap().has_settlement());
    assert_eq!(db.state().settlements.len(), 1);

    // the next sweep refunds the request
    push_slot(&mut db, 1);
    assert!(db.state().settlements.is_empty());
    assert_eq!(db.get_balance(AccountId(1), USD).amount, 100);
}
