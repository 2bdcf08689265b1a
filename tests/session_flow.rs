use std::fs;

use recipe_margin_scanner::{
    app::Session,
    domain::{
        compare_drift, rank, rank_drift, Membership, PricingError, RankedRow, SortDirection,
        Weights,
    },
    infra::{
        cache::{load_snapshot, save_snapshot, PriceSnapshot},
        prices::{ItemMapping, LatestPrices},
        recipe_file::load_recipe_definitions,
    },
    logging,
    util::persistence::{load_settings, save_settings, Settings},
};

const MAPPING: &str = r#"[
    {"id": 1, "name": "Steel bar", "members": false},
    {"id": 2, "name": "Cannonball", "members": true},
    {"id": 3, "name": "Ammo mould", "members": true},
    {"id": 4, "name": "Feather", "members": false},
    {"id": 5, "name": "Arrow shaft", "members": false},
    {"id": 6, "name": "Dragon bones", "members": true}
]"#;

const LATEST: &str = r#"{
    "1": {"high": 500, "highTime": 1700000000, "low": 480, "lowTime": 1700000000},
    "2": {"high": 160, "highTime": 1700000000, "low": 150, "lowTime": 1700000000},
    "3": {"high": 5, "highTime": 1700000000, "low": 4, "lowTime": 1700000000},
    "4": {"high": 3, "highTime": 1700000000, "low": 2, "lowTime": 1700000000},
    "5": {"high": null, "highTime": null, "low": 9, "lowTime": 1700000000}
}"#;

const RECIPES: &str = r#"{
    "Template": {"inputs": {"Item": 1}, "outputs": {"Item": 1}, "time": 1},
    "Cannonballs": {
        "members": true,
        "inputs": {"Steel bar": 1, "Ammo mould": 1},
        "outputs": {"Cannonball": 4, "Ammo mould": 1},
        "time": 1800
    },
    "Steel flip": {"inputs": {"Steel bar": 1}, "outputs": {"Cannonball": 4}, "time": 3600},
    "Smelting": {"inputs": {"Coins": 400}, "outputs": {"Steel bar": 1}},
    "Feather flip": {"inputs": {"Coins": 3}, "outputs": {"Feather": 1}, "time": 60},
    "Headless arrows": {"inputs": {"Arrow shaft": 1}, "outputs": {"Feather": 1}, "time": 60},
    "Bone burying": {"members": true, "inputs": {"Dragon bones": 1}, "outputs": {"Coins": 1}}
}"#;

fn snapshot() -> PriceSnapshot {
    let mapping: Vec<ItemMapping> = serde_json::from_str(MAPPING).unwrap();
    let prices: LatestPrices = serde_json::from_str(LATEST).unwrap();
    PriceSnapshot::new(mapping, prices)
}

fn session() -> Session {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recipes.json");
    fs::write(&path, RECIPES).unwrap();
    let definitions = load_recipe_definitions(&path).unwrap();
    Session::from_snapshot(&snapshot(), definitions, &[] as &[&str])
}

fn settings() -> Settings {
    Settings {
        coins: 10_000,
        ..Settings::default()
    }
}

fn names(rows: &[RankedRow]) -> Vec<&str> {
    rows.iter().map(|row| row.name.as_str()).collect()
}

#[test]
fn catalog_skips_template_and_unpriced_items() {
    let session = session();
    let loaded: Vec<&str> = session.recipes().all_names().collect();
    assert_eq!(
        loaded,
        vec!["Cannonballs", "Feather flip", "Headless arrows", "Smelting", "Steel flip"]
    );
    let rejected: Vec<&str> = session
        .recipes()
        .rejected()
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(rejected, vec!["Bone burying"]);
}

#[test]
fn evaluation_matches_hand_computed_outcome() {
    let evaluation = session().evaluate("Cannonballs", &settings()).unwrap();
    let basic = &evaluation.basic;
    assert_eq!(basic.cost, 505);
    assert_eq!(basic.gross_revenue, 604);
    assert_eq!(basic.revenue, 598);
    assert_eq!(basic.margin, 93);
    assert_eq!(basic.amount, 19);
    assert_eq!(basic.total_margin, 1767);
    assert_eq!(basic.total_time_hours, Some(9.5));
    assert_eq!(basic.throughput_per_hour, Some(186));
    assert!(evaluation.adjusted.margin < basic.margin);
}

#[test]
fn ranking_separates_unprofitable_from_unresolvable() {
    let report = session().rank(&settings()).unwrap();

    assert_eq!(names(&report.rows), vec!["Steel flip", "Cannonballs", "Smelting"]);
    assert!(!report.rows[2].is_complete());
    assert_eq!(report.hidden, vec!["Feather flip".to_string()]);
    assert_eq!(report.unresolvable.len(), 1);
    assert_eq!(report.unresolvable[0].0, "Headless arrows");
    assert!(matches!(
        report.unresolvable[0].1,
        PricingError::Unresolvable { item: 5, .. }
    ));
    assert_eq!(names(report.top(1)), vec!["Steel flip"]);
}

#[test]
fn not_applicable_rows_follow_longer_names_first() {
    let mut settings = settings();
    settings.display.show_hidden = true;
    settings.display.include_unresolvable = true;

    let report = session().rank(&settings).unwrap();
    assert_eq!(
        names(&report.rows),
        vec!["Steel flip", "Cannonballs", "Headless arrows", "Feather flip", "Smelting"]
    );
}

#[test]
fn membership_filter_limits_rows() {
    let mut settings = settings();
    settings.display.membership = Membership::MembersOnly;

    let report = session().rank(&settings).unwrap();
    assert_eq!(names(&report.rows), vec!["Cannonballs"]);
    // the unpriced recipe is free-to-play, so it is outside this tier
    assert!(report.unresolvable.is_empty());

    settings.display.membership = Membership::FreeOnly;
    settings.display.include_unresolvable = true;
    let report = session().rank(&settings).unwrap();
    assert_eq!(names(&report.rows), vec!["Steel flip", "Headless arrows", "Smelting"]);
    assert_eq!(report.unresolvable.len(), 1);
}

#[test]
fn drift_exposes_weight_sensitivity() {
    let report = session().rank(&settings()).unwrap();
    let baseline = report.rows;

    let by_throughput = rank(
        baseline.clone(),
        &Weights::new(0.0, 0.0, 0.0, 1.0),
        SortDirection::Descending,
    )
    .unwrap();
    let by_margin = rank(
        baseline.clone(),
        &Weights::new(1.0, 0.0, 0.0, 0.0),
        SortDirection::Descending,
    )
    .unwrap();
    assert_eq!(names(&by_throughput), vec!["Cannonballs", "Steel flip", "Smelting"]);

    let first = rank_drift(&baseline, &by_throughput).unwrap();
    assert_eq!(first["Steel flip"], 1);
    assert_eq!(first["Cannonballs"], -1);
    assert_eq!(first["Smelting"], 0);

    let second = rank_drift(&baseline, &by_margin).unwrap();
    assert!(second.values().all(|moved| *moved == 0));

    let delta = compare_drift(&first, &second).unwrap();
    assert_eq!(delta["Steel flip"], -1);
    assert_eq!(delta["Cannonballs"], 1);
    assert_eq!(delta["Smelting"], 0);

    let same = rank_drift(&baseline, &baseline).unwrap();
    assert!(same.values().all(|moved| *moved == 0));
}

#[test]
fn margin_drift_covers_every_evaluated_recipe() {
    let drift = session().margin_drift(&settings()).unwrap();
    assert_eq!(drift.len(), 5);
}

#[test]
fn settings_and_snapshot_survive_disk() {
    let dir = tempfile::tempdir().unwrap();

    let settings_path = dir.path().join("settings.json");
    let mut settings = settings();
    settings.ignore_items = vec!["Ammo mould".to_string()];
    save_settings(Some(&settings_path), &settings).unwrap();
    let restored = load_settings(Some(&settings_path)).unwrap();
    assert_eq!(restored, settings);

    let snapshot_path = dir.path().join("cache").join("price_snapshot.json");
    save_snapshot(&snapshot_path, &snapshot()).unwrap();
    let snapshot = load_snapshot(&snapshot_path).unwrap();
    assert!(!snapshot.is_expired());

    let recipes_path = dir.path().join("recipes.json");
    fs::write(&recipes_path, RECIPES).unwrap();
    let definitions = load_recipe_definitions(&recipes_path).unwrap();

    let session = Session::from_snapshot(&snapshot, definitions, &restored.ignore_items);
    assert!(session.recipes().get("Cannonballs").is_none());
    assert!(session.recipes().get("Steel flip").is_some());
}
