//! Entitlement evaluator tests: strict limits, the unlimited sentinel, and
//! self-healing of dangling plan references.

mod common;

use common::*;
use vitrine::entitlements::{can_create, resolve_plan, ResourceKind};

fn add_products(conn: &rusqlite::Connection, user: &User, n: usize) {
    for i in 0..n {
        queries::create_product(
            conn,
            &user.id,
            &CreateProduct {
                name: format!("Product {}", i),
                description: None,
                price_cents: 1000,
                collection_id: None,
                image_url: None,
            },
        )
        .unwrap();
    }
}

#[test]
fn under_limit_is_allowed() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");
    add_products(&conn, &user, 9); // free plan allows 10

    let e = can_create(&conn, &user, ResourceKind::Product).unwrap();
    assert!(e.allowed);
    assert_eq!(e.current_count, 9);
    assert_eq!(e.limit, 10);
}

#[test]
fn at_limit_is_denied() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");
    add_products(&conn, &user, 10);

    let e = can_create(&conn, &user, ResourceKind::Product).unwrap();
    assert!(!e.allowed);
    assert_eq!(e.current_count, 10);
}

#[test]
fn deleting_frees_a_slot_immediately() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");
    add_products(&conn, &user, 10);
    assert!(!can_create(&conn, &user, ResourceKind::Product).unwrap().allowed);

    let products = queries::list_products_by_owner(&conn, &user.id).unwrap();
    queries::delete_product(&conn, &products[0].id, &user.id).unwrap();

    assert!(can_create(&conn, &user, ResourceKind::Product).unwrap().allowed);
}

#[test]
fn unlimited_plan_allows_and_reports_live_count() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");
    let enterprise = queries::get_plan_by_name(&conn, "enterprise").unwrap().unwrap();
    queries::set_user_plan(&conn, &user.id, &enterprise.id).unwrap();
    let user = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();

    add_products(&conn, &user, 50);

    let e = can_create(&conn, &user, ResourceKind::Product).unwrap();
    assert!(e.allowed);
    assert_eq!(e.limit, UNLIMITED);
    assert_eq!(e.current_count, 50);
}

#[test]
fn collection_limit_is_independent_of_products() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");

    // free plan allows 2 collections
    for i in 0..2 {
        queries::create_collection(
            &conn,
            &user.id,
            &CreateCollection {
                name: format!("Catalog {}", i),
                description: None,
            },
        )
        .unwrap();
    }

    assert!(!can_create(&conn, &user, ResourceKind::Collection).unwrap().allowed);
    assert!(can_create(&conn, &user, ResourceKind::Product).unwrap().allowed);
}

#[test]
fn dangling_plan_reference_heals_to_free() {
    let conn = setup_test_db();
    let mut user = create_test_user(&conn, "a@example.com", "Store A");

    // Point at a plan that doesn't exist (simulates a removed tier)
    conn.execute(
        "UPDATE users SET plan_id = 'gone' WHERE id = ?1",
        rusqlite::params![user.id],
    )
    .unwrap();
    user.plan_id = "gone".to_string();

    let plan = resolve_plan(&conn, &user).unwrap();
    assert_eq!(plan.name, "free");

    // The reassignment was persisted
    let reloaded = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(reloaded.plan_id, plan.id);
}
