//! Plan catalog seeding and lookup tests

mod common;

use common::*;

#[test]
fn seeding_creates_all_recognized_plans() {
    let conn = setup_test_db();
    let plans = queries::list_active_plans(&conn).unwrap();
    assert_eq!(plans.len(), 3);

    // Cheapest first
    let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["free", "basic", "enterprise"]);
}

#[test]
fn seeding_is_idempotent() {
    let conn = setup_test_db();
    let before = queries::get_plan_by_name(&conn, "basic").unwrap().unwrap();

    queries::seed_plans(&conn, &test_plan_seeds()).unwrap();
    queries::seed_plans(&conn, &test_plan_seeds()).unwrap();

    let after = queries::get_plan_by_name(&conn, "basic").unwrap().unwrap();
    assert_eq!(queries::list_active_plans(&conn).unwrap().len(), 3);
    assert_eq!(before.id, after.id);
}

#[test]
fn reseeding_preserves_row_identity_and_user_references() {
    let conn = setup_test_db();
    let user = create_test_user(&conn, "a@example.com", "Store A");
    let free_before = queries::get_free_plan(&conn).unwrap();
    assert_eq!(user.plan_id, free_before.id);

    // Change a quota and reseed
    let mut seeds = test_plan_seeds();
    seeds[0].max_products = 15;
    queries::seed_plans(&conn, &seeds).unwrap();

    let free_after = queries::get_free_plan(&conn).unwrap();
    assert_eq!(free_before.id, free_after.id);
    assert_eq!(free_after.max_products, 15);

    // The user still points at a valid plan
    let user = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(user.plan_id, free_after.id);
}

#[test]
fn unrecognized_plans_are_deleted_on_seed() {
    let conn = setup_test_db();

    // Reseed with a smaller recognized set
    let seeds: Vec<PlanSeed> = test_plan_seeds()
        .into_iter()
        .filter(|s| s.name != "enterprise")
        .collect();
    queries::seed_plans(&conn, &seeds).unwrap();

    assert!(queries::get_plan_by_name(&conn, "enterprise").unwrap().is_none());
    assert_eq!(queries::list_active_plans(&conn).unwrap().len(), 2);
}

#[test]
fn seeding_handles_quoted_plan_names() {
    let conn = setup_test_db();

    let mut seeds = test_plan_seeds();
    seeds.push(PlanSeed {
        name: "five o'clock",
        display_name: "Five O'Clock",
        description: "A name with a quote in it",
        price_cents: 500,
        stripe_price_id: Some("price_test_quote".to_string()),
        max_products: 5,
        max_collections: 1,
        features: "[]",
        is_active: true,
    });
    queries::seed_plans(&conn, &seeds).unwrap();

    // The quoted name seeds cleanly and the rest of the catalog survives
    assert!(queries::get_plan_by_name(&conn, "five o'clock")
        .unwrap()
        .is_some());
    assert_eq!(queries::list_active_plans(&conn).unwrap().len(), 4);

    // And it is removed again once it drops out of the recognized set
    queries::seed_plans(&conn, &test_plan_seeds()).unwrap();
    assert!(queries::get_plan_by_name(&conn, "five o'clock")
        .unwrap()
        .is_none());
}

#[test]
fn free_plan_is_not_subscribable() {
    let conn = setup_test_db();
    let free = queries::get_free_plan(&conn).unwrap();
    let basic = queries::get_plan_by_name(&conn, "basic").unwrap().unwrap();

    assert!(!free.is_subscribable());
    assert!(basic.is_subscribable());
}
