//! Search over a built dataset: token matching, mod filters, groups,
//! recipes and scopes.

use craftbook_core::dataset::Dataset;
use craftbook_core::graph::Object;
use craftbook_core::search::Scope;
use craftbook_core::test_utils::*;

fn steel() -> Dataset {
    load(&build_default(steel_model()))
}

fn ids(ds: &Dataset, text: &str) -> Vec<String> {
    ds.query(text).iter().map(|o| o.id().to_owned()).collect()
}

#[test]
fn lookup_by_id_returns_the_widget() {
    let ds = steel();
    let widget = ds.get_by_id("i:mod:widget").unwrap();
    assert_eq!(widget.id(), "i:mod:widget");
    assert_eq!(&*widget.as_item().unwrap().name(), "Widget");
}

#[test]
fn all_tokens_must_match_the_name() {
    let ds = steel();
    let hits = ds.query("steel plate").items().iter().collect::<Vec<_>>();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), "i:gregtech:plate_steel");

    let names: Vec<_> = ds
        .query("steel")
        .items()
        .iter()
        .filter_map(|o| o.as_item().map(|i| i.name().to_string()))
        .collect();
    assert_eq!(names, ["Steel Plate", "Steel Ingot"]);
}

#[test]
fn matching_is_case_insensitive_substring() {
    let ds = steel();
    assert_eq!(ids(&ds, "WIDG"), ["i:mod:widget", "r:widget"]);
}

#[test]
fn tooltip_matches_as_a_whole() {
    let ds = steel();
    assert_eq!(
        ds.query("dense flat").items().iter().next().unwrap().id(),
        "i:gregtech:plate_steel"
    );
    // Tokens split across name and tooltip do not match.
    assert_eq!(ds.query("steel dense").items().count(), 0);
}

#[test]
fn mod_filter_restricts_by_source_mod() {
    let ds = steel();
    let ic2: Vec<_> = ds
        .query("@IC2")
        .items()
        .iter()
        .map(|o| o.id().to_owned())
        .collect();
    assert_eq!(ic2, ["i:ic2:cell_empty", "i:ic2:cell_water"]);
    assert_eq!(ds.query("cell @gregtech").count(), 0);
    assert_eq!(ds.query("cell @ic").items().count(), 2);
}

#[test]
fn bare_at_sign_is_ignored() {
    let ds = steel();
    assert_eq!(ids(&ds, "widget @"), ids(&ds, "widget"));
}

#[test]
fn empty_query_matches_everything() {
    let ds = steel();
    let search = ds.query("   ");
    assert!(search.query().is_none());
    assert_eq!(search.count(), 6 + 1 + 1 + 2);
}

#[test]
fn groups_match_through_their_members() {
    let ds = steel();
    let hits: Vec<_> = ds.query("ingot").groups().iter().collect();
    assert_eq!(hits.len(), 1);
    assert!(matches!(&hits[0], Object::Group(g) if g.id() == "g:ingotSteel"));
    // The group's own name is not a match target.
    assert_eq!(ds.query("ingotsteel").groups().count(), 0);
}

#[test]
fn recipes_match_through_their_io() {
    let ds = steel();
    let recipes: Vec<_> = ds
        .query("steel plate")
        .recipes()
        .iter()
        .map(|o| o.id().to_owned())
        .collect();
    assert_eq!(recipes, ["r:bend_steel"]);

    // Water is an input of the widget recipe only.
    let water: Vec<_> = ds
        .query("water")
        .recipes()
        .iter()
        .map(|o| o.id().to_owned())
        .collect();
    assert_eq!(water, ["r:widget"]);

    // Group inputs count: steel ingots feed both recipes.
    assert_eq!(ds.query("steel ingot").recipes().count(), 2);
}

#[test]
fn results_come_in_collection_order() {
    let ds = steel();
    assert_eq!(
        ids(&ds, "steel"),
        [
            "i:gregtech:plate_steel",
            "i:gregtech:ingot_steel",
            "g:ingotSteel",
            "r:bend_steel",
            "r:widget",
        ]
    );
}

#[test]
fn scope_can_be_combined() {
    let ds = steel();
    let scope = Scope {
        items: true,
        fluids: true,
        ..Scope::NONE
    };
    let hits: Vec<_> = ds
        .query("water")
        .with_scope(scope)
        .iter()
        .map(|o| o.kind())
        .collect();
    assert_eq!(hits.len(), 2);
    assert_eq!(ds.query("water").with_scope(Scope::NONE).count(), 0);
}

#[test]
fn search_is_reusable() {
    let ds = steel();
    let search = ds.query("steel");
    assert_eq!(search.count(), search.count());
}

#[test]
fn no_match_for_absent_text() {
    let ds = steel();
    assert_eq!(ds.query("titanium").count(), 0);
}
