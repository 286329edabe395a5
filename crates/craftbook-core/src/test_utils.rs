//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::build::{BuildOutput, build};
use crate::config::BuildConfig;
use crate::dataset::Dataset;
use crate::model::*;

// ===========================================================================
// Definition constructors
// ===========================================================================

pub fn item(id: &str, name: &str) -> ItemDef {
    let (mod_name, internal_name) = split_id(id);
    ItemDef {
        id: id.into(),
        name: name.into(),
        mod_name,
        internal_name: internal_name.clone(),
        unlocalized_name: internal_name,
        stack_size: 64,
        ..Default::default()
    }
}

pub fn fluid(id: &str, name: &str) -> FluidDef {
    let (mod_name, internal_name) = split_id(id);
    FluidDef {
        id: id.into(),
        name: name.into(),
        mod_name,
        internal_name: internal_name.clone(),
        unlocalized_name: internal_name,
        ..Default::default()
    }
}

/// `"i:mod:thing"` -> `("mod", "thing")`; ids without a mod get "minecraft".
fn split_id(id: &str) -> (String, String) {
    let rest = id.get(2..).unwrap_or("");
    match rest.split_once(':') {
        Some((m, name)) => (m.to_owned(), name.to_owned()),
        None => ("minecraft".to_owned(), rest.to_owned()),
    }
}

pub fn group(id: &str, name: &str, items: &[&str]) -> GroupDef {
    GroupDef {
        id: id.into(),
        name: name.into(),
        items: items.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn category(name: &str) -> CategoryDef {
    CategoryDef {
        name: name.into(),
        dimensions: Dimensions {
            item_inputs: (3, 3),
            fluid_inputs: (1, 1),
            item_outputs: (2, 1),
            fluid_outputs: (1, 1),
        },
        ..Default::default()
    }
}

pub fn input(goods: &str, amount: i32) -> RecipeIoDef {
    RecipeIoDef::new(IoKind::ItemInput, goods, amount)
}

pub fn group_input(goods: &str, amount: i32) -> RecipeIoDef {
    RecipeIoDef::new(IoKind::GroupInput, goods, amount)
}

pub fn fluid_input(goods: &str, amount: i32) -> RecipeIoDef {
    RecipeIoDef::new(IoKind::FluidInput, goods, amount)
}

pub fn output(goods: &str, amount: i32) -> RecipeIoDef {
    RecipeIoDef::new(IoKind::ItemOutput, goods, amount)
}

pub fn fluid_output(goods: &str, amount: i32) -> RecipeIoDef {
    RecipeIoDef::new(IoKind::FluidOutput, goods, amount)
}

pub fn recipe(id: &str, category: &str, io: Vec<RecipeIoDef>) -> RecipeDef {
    RecipeDef {
        id: id.into(),
        category: category.into(),
        io,
        machine: None,
    }
}

pub fn machine(voltage: i32, duration: i32) -> MachineDef {
    MachineDef {
        voltage,
        duration,
        amperage: 1,
        voltage_tier: 1,
        metadata: Vec::new(),
        special_value: 0,
    }
}

// ===========================================================================
// Fixture models
// ===========================================================================

/// A small pack: steel processing plus a modded widget.
pub fn steel_model() -> Model {
    let mut press = category("press");
    press.label = Some("GregTech".into());
    press.singleblocks = vec!["i:gregtech:bender".into()];
    press.default_crafter = Some("i:gregtech:bender".into());
    press.crafters = vec!["i:gregtech:bender".into()];

    let mut plate = item("i:gregtech:plate_steel", "Steel Plate");
    plate.tooltip = Some("Dense and flat".into());
    let mut cell = item("i:ic2:cell_water", "Water Cell");
    cell.container = Some(ContainerDef {
        fluid: "f:water".into(),
        amount: 1000,
        empty: Some("i:ic2:cell_empty".into()),
    });

    let mut bend = recipe(
        "r:bend_steel",
        "press",
        vec![input("i:gregtech:ingot_steel", 1), output("i:gregtech:plate_steel", 1)],
    );
    let mut m = machine(30, 200);
    m.metadata.push(("heat".into(), 1800.0));
    bend.machine = Some(m);

    Model {
        items: vec![
            plate,
            item("i:gregtech:ingot_steel", "Steel Ingot"),
            item("i:gregtech:bender", "Basic Bending Machine"),
            item("i:mod:widget", "Widget"),
            item("i:ic2:cell_empty", "Empty Cell"),
            cell,
        ],
        fluids: vec![fluid("f:water", "Water")],
        groups: vec![group("g:ingotSteel", "ingotSteel", &["i:gregtech:ingot_steel"])],
        categories: vec![press, category("crafting")],
        recipes: vec![
            bend,
            recipe(
                "r:widget",
                "crafting",
                vec![
                    group_input("g:ingotSteel", 2),
                    fluid_input("f:water", 100),
                    output("i:mod:widget", 1),
                ],
            ),
        ],
        well_known: vec!["i:mod:widget".into(), "i:gregtech:bender".into()],
    }
}

/// Ore and dust for the macerator remap scenario.
fn macerator_base() -> Model {
    Model {
        items: vec![item("i:gt:ore_iron", "Iron Ore"), item("i:gt:dust_iron", "Iron Dust")],
        categories: vec![category("Macerator")],
        ..Default::default()
    }
}

/// Build v1: `R1 = Ore x1 -> Dust x2`.
pub fn macerator_v1() -> Model {
    let mut m = macerator_base();
    m.recipes.push(recipe(
        "r:1",
        "Macerator",
        vec![input("i:gt:ore_iron", 1), output("i:gt:dust_iron", 2)],
    ));
    m
}

/// Build v2: every id regenerated, dust output raised to x3.
pub fn macerator_v2() -> Model {
    let mut m = macerator_base();
    m.recipes.push(recipe(
        "r:1b",
        "Macerator",
        vec![input("i:gt:ore_iron", 1), output("i:gt:dust_iron", 3)],
    ));
    m
}

// ===========================================================================
// Build helpers
// ===========================================================================

pub fn build_default(model: Model) -> BuildOutput {
    build(model, None, &BuildConfig::default()).expect("fixture model builds")
}

pub fn build_after(model: Model, previous: &[u8]) -> BuildOutput {
    build(model, Some(previous), &BuildConfig::default()).expect("fixture model builds")
}

pub fn load(output: &BuildOutput) -> Dataset {
    output.dataset().expect("fresh arena loads")
}
