//! Recipe ids across successive builds.
//!
//! Each test builds a chain of arenas, feeding every build the bytes of the
//! one before, and checks which historical ids still resolve.

use craftbook_core::build::build;
use craftbook_core::config::BuildConfig;
use craftbook_core::model::Model;
use craftbook_core::remap::RemapPolicy;
use craftbook_core::test_utils::*;

/// Macerator pack with a single recipe `id`: ore x1 -> dust x`dust`.
fn macerator(id: &str, dust: i32) -> Model {
    let mut m = macerator_v1();
    m.recipes = vec![recipe(
        id,
        "Macerator",
        vec![input("i:gt:ore_iron", 1), output("i:gt:dust_iron", dust)],
    )];
    m
}

// ===========================================================================
// Scenario: regenerated ids with a rebalanced output
// ===========================================================================

#[test]
fn rebalanced_recipe_maps_through_loose_fingerprint() {
    let v1 = build_default(macerator_v1());
    let v2 = build_after(macerator_v2(), &v1.bytes);
    assert_eq!(v2.report.remap.remapped, 1);
    assert_eq!(v2.report.remap.unresolved, 0);
    assert!(!v2.report.remap.previous_skipped);

    let ds = load(&v2);
    let old = ds.get_by_id("r:1").unwrap();
    assert_eq!(old.id(), "r:1b");
    assert!(old.same_instance(&ds.get_by_id("r:1b").unwrap()));
    assert!(!ds.is_live("r:1"));
    assert!(ds.is_live("r:1b"));
    assert_eq!(ds.remap_count(), 1);

    let remaps: Vec<_> = ds
        .remaps()
        .map(|r| (r.from_id().to_string(), r.target()))
        .collect();
    assert_eq!(remaps.len(), 1);
    assert_eq!(remaps[0].0, "r:1");
    assert_eq!(remaps[0].1, ds.recipe("r:1b").unwrap().pointer());
}

#[test]
fn identical_content_maps_through_strict_fingerprint() {
    let v1 = build_default(macerator("r:old", 2));
    let mut model = macerator("r:new", 2);
    // A rebalanced sibling shares the loose print; the strict match wins.
    model.recipes.insert(
        0,
        recipe(
            "r:sibling",
            "Macerator",
            vec![input("i:gt:ore_iron", 1), output("i:gt:dust_iron", 5)],
        ),
    );
    let v2 = build_after(model, &v1.bytes);
    assert_eq!(v2.report.remap.ambiguous_loose, 0);
    let ds = load(&v2);
    assert_eq!(ds.recipe("r:old").unwrap().id(), "r:new");
}

#[test]
fn kept_ids_are_not_remapped() {
    let v1 = build_default(macerator("r:1", 2));
    let v2 = build_after(macerator("r:1", 3), &v1.bytes);
    assert_eq!(v2.report.remap.remapped, 0);
    let ds = load(&v2);
    assert_eq!(ds.remap_count(), 0);
    assert_eq!(ds.get_by_id("r:1").unwrap().id(), "r:1");
}

// ===========================================================================
// Carry-forward
// ===========================================================================

#[test]
fn remaps_stay_single_hop_across_builds() {
    let v1 = build_default(macerator("r:a", 2));
    let v2 = build_after(macerator("r:b", 3), &v1.bytes);
    let v3 = build_after(macerator("r:c", 4), &v2.bytes);
    let v4 = build_after(macerator("r:d", 5), &v3.bytes);

    assert_eq!(v4.report.remap.remapped, 1);
    assert_eq!(v4.report.remap.carried, 2);

    let ds = load(&v4);
    let target = ds.recipe("r:d").unwrap().pointer();
    for old in ["r:a", "r:b", "r:c"] {
        assert_eq!(ds.get_by_id(old).unwrap().id(), "r:d", "{old}");
    }
    // Every stored entry points straight at a live recipe.
    assert_eq!(ds.remaps().count(), 3);
    assert!(ds.remaps().all(|r| r.target() == target));
}

#[test]
fn carried_entries_survive_an_unchanged_build() {
    let v1 = build_default(macerator_v1());
    let v2 = build_after(macerator_v2(), &v1.bytes);
    let v3 = build_after(macerator_v2(), &v2.bytes);
    assert_eq!(v3.report.remap.remapped, 0);
    assert_eq!(v3.report.remap.carried, 1);
    let ds = load(&v3);
    assert_eq!(ds.get_by_id("r:1").unwrap().id(), "r:1b");
}

#[test]
fn carried_entry_is_dropped_with_its_target() {
    let v1 = build_default(macerator_v1());
    let v2 = build_after(macerator_v2(), &v1.bytes);
    let mut gone = macerator_v2();
    gone.recipes.clear();
    let v3 = build_after(gone, &v2.bytes);
    assert_eq!(v3.report.remap.unresolved, 1);
    assert_eq!(v3.report.remap.dropped_carried, 1);
    let ds = load(&v3);
    assert!(ds.get_by_id("r:1").is_none());
    assert!(ds.get_by_id("r:1b").is_none());
    assert_eq!(ds.remaps().count(), 0);
}

#[test]
fn revived_id_shadows_its_remap() {
    let v1 = build_default(macerator("r:a", 2));
    let v2 = build_after(macerator("r:b", 3), &v1.bytes);
    // r:a comes back as a live recipe of its own.
    let mut model = macerator("r:b", 3);
    model.recipes.push(recipe(
        "r:a",
        "Macerator",
        vec![input("i:gt:dust_iron", 1), output("i:gt:ore_iron", 1)],
    ));
    let v3 = build_after(model, &v2.bytes);
    assert_eq!(v3.report.remap.carried, 0);
    let ds = load(&v3);
    assert!(ds.is_live("r:a"));
    assert_eq!(ds.get_by_id("r:a").unwrap().id(), "r:a");
}

// ===========================================================================
// Unmatched and ambiguous ids
// ===========================================================================

#[test]
fn removed_recipe_stays_unresolved() {
    let v1 = build_default(macerator_v1());
    let mut model = macerator_v1();
    model.recipes = vec![recipe(
        "r:2",
        "Macerator",
        vec![input("i:gt:dust_iron", 1), output("i:gt:ore_iron", 1)],
    )];
    let v2 = build_after(model, &v1.bytes);
    assert_eq!(v2.report.remap.unresolved, 1);
    assert!(load(&v2).get_by_id("r:1").is_none());
}

fn ambiguous_current() -> Model {
    let mut m = macerator_v1();
    m.recipes = vec![
        recipe(
            "r:x",
            "Macerator",
            vec![input("i:gt:ore_iron", 1), output("i:gt:dust_iron", 3)],
        ),
        recipe(
            "r:y",
            "Macerator",
            vec![input("i:gt:ore_iron", 2), output("i:gt:dust_iron", 4)],
        ),
    ];
    m
}

#[test]
fn ambiguous_loose_match_takes_first_by_default() {
    let v1 = build_default(macerator_v1());
    let v2 = build_after(ambiguous_current(), &v1.bytes);
    assert_eq!(v2.report.remap.ambiguous_loose, 1);
    assert_eq!(v2.report.remap.remapped, 1);
    assert_eq!(load(&v2).get_by_id("r:1").unwrap().id(), "r:x");
}

#[test]
fn ambiguous_loose_match_can_be_refused() {
    let v1 = build_default(macerator_v1());
    let config = BuildConfig {
        remap_policy: RemapPolicy::RequireUniqueLoose,
        ..BuildConfig::default()
    };
    let v2 = build(ambiguous_current(), Some(&v1.bytes), &config).unwrap();
    assert_eq!(v2.report.remap.ambiguous_loose, 1);
    assert_eq!(v2.report.remap.unresolved, 1);
    assert!(load(&v2).get_by_id("r:1").is_none());
}

// ===========================================================================
// Unusable previous arenas
// ===========================================================================

#[test]
fn previous_with_other_version_is_skipped() {
    let mut old = build_default(macerator_v1()).bytes;
    old[0..4].copy_from_slice(&1i32.to_le_bytes());
    let v2 = build_after(macerator_v2(), &old);
    assert!(v2.report.remap.previous_skipped);
    assert_eq!(v2.report.remap.remapped, 0);
    let ds = load(&v2);
    assert!(ds.get_by_id("r:1").is_none());
    assert!(ds.is_live("r:1b"));
}

#[test]
fn truncated_previous_is_skipped() {
    let old = build_default(macerator_v1()).bytes;
    let v2 = build_after(macerator_v2(), &old[..old.len() / 2 & !3]);
    assert!(v2.report.remap.previous_skipped);
}
