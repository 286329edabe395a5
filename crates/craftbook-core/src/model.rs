//! In-memory object model handed to the build pipeline.
//!
//! References between entities are by id (items, fluids, groups, recipes)
//! or by name (categories). The pipeline resolves them when it encodes the
//! arena; nothing here is validated on construction.

use serde::{Deserialize, Serialize};

/// Role of one recipe I/O entry. The discriminant is the wire value and the
/// declaration order is the canonical I/O order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IoKind {
    ItemInput = 0,
    GroupInput = 1,
    FluidInput = 2,
    ItemOutput = 3,
    FluidOutput = 4,
}

impl IoKind {
    pub const ALL: [IoKind; 5] = [
        IoKind::ItemInput,
        IoKind::GroupInput,
        IoKind::FluidInput,
        IoKind::ItemOutput,
        IoKind::FluidOutput,
    ];

    pub fn from_wire(v: i32) -> Option<IoKind> {
        IoKind::ALL.get(usize::try_from(v).ok()?).copied()
    }

    pub fn wire(self) -> i32 {
        self as i32
    }

    pub fn is_output(self) -> bool {
        matches!(self, IoKind::ItemOutput | IoKind::FluidOutput)
    }

    pub fn is_fluid(self) -> bool {
        matches!(self, IoKind::FluidInput | IoKind::FluidOutput)
    }
}

/// Stored probability meaning "always".
pub const PROBABILITY_SCALE: i32 = 10_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub mod_name: String,
    pub internal_name: String,
    pub icon_id: i32,
    pub tooltip: Option<String>,
    pub unlocalized_name: String,
    pub nbt: Option<String>,
    pub stack_size: i32,
    pub damage: i32,
    pub container: Option<ContainerDef>,
}

/// An item that holds a fixed amount of fluid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerDef {
    pub fluid: String,
    pub amount: i32,
    /// The item left behind once the fluid is removed.
    pub empty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FluidDef {
    pub id: String,
    pub name: String,
    pub mod_name: String,
    pub internal_name: String,
    pub icon_id: i32,
    pub tooltip: Option<String>,
    pub unlocalized_name: String,
    pub nbt: Option<String>,
    pub is_gas: bool,
}

/// Interchangeable items (an ore-dictionary entry).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupDef {
    pub id: String,
    pub name: String,
    pub items: Vec<String>,
}

/// Grid sizes of a category's I/O panes, as (width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub item_inputs: (i32, i32),
    pub fluid_inputs: (i32, i32),
    pub item_outputs: (i32, i32),
    pub fluid_outputs: (i32, i32),
}

impl Dimensions {
    pub fn to_words(self) -> [i32; 8] {
        [
            self.item_inputs.0,
            self.item_inputs.1,
            self.fluid_inputs.0,
            self.fluid_inputs.1,
            self.item_outputs.0,
            self.item_outputs.1,
            self.fluid_outputs.0,
            self.fluid_outputs.1,
        ]
    }

    pub fn from_words(w: [i32; 8]) -> Self {
        Self {
            item_inputs: (w[0], w[1]),
            fluid_inputs: (w[2], w[3]),
            item_outputs: (w[4], w[5]),
            fluid_outputs: (w[6], w[7]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub label: Option<String>,
    pub dimensions: Dimensions,
    pub shapeless: bool,
    pub singleblocks: Vec<String>,
    pub multiblocks: Vec<String>,
    pub default_crafter: Option<String>,
    pub crafters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIoDef {
    pub kind: IoKind,
    /// Item, fluid or group id, matching `kind`.
    pub goods: String,
    pub slot: i32,
    pub amount: i32,
    /// Chance in `0.0..=1.0`.
    pub probability: f64,
}

impl RecipeIoDef {
    pub fn new(kind: IoKind, goods: impl Into<String>, amount: i32) -> Self {
        Self {
            kind,
            goods: goods.into(),
            slot: 0,
            amount,
            probability: 1.0,
        }
    }

    pub fn with_slot(mut self, slot: i32) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Probability as stored in the arena.
    pub fn stored_probability(&self) -> i32 {
        (self.probability.clamp(0.0, 1.0) * PROBABILITY_SCALE as f64).round() as i32
    }
}

/// GregTech-style machine requirements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineDef {
    pub voltage: i32,
    /// Duration in ticks.
    pub duration: i32,
    pub amperage: i32,
    pub voltage_tier: i32,
    pub metadata: Vec<(String, f64)>,
    pub special_value: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeDef {
    pub id: String,
    pub category: String,
    pub io: Vec<RecipeIoDef>,
    pub machine: Option<MachineDef>,
}

impl RecipeDef {
    /// I/O entries in canonical order: stable-sorted by kind.
    pub fn canonical_io(&self) -> Vec<&RecipeIoDef> {
        let mut io: Vec<&RecipeIoDef> = self.io.iter().collect();
        io.sort_by_key(|e| e.kind);
        io
    }
}

/// Everything one build encodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    pub items: Vec<ItemDef>,
    pub fluids: Vec<FluidDef>,
    pub groups: Vec<GroupDef>,
    pub categories: Vec<CategoryDef>,
    pub recipes: Vec<RecipeDef>,
    /// Ids of objects the UI pins (e.g. common crafting stations).
    pub well_known: Vec<String>,
}

impl Model {
    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn fluid(&self, id: &str) -> Option<&FluidDef> {
        self.fluids.iter().find(|f| f.id == id)
    }

    pub fn recipe(&self, id: &str) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kind_wire_values() {
        for (i, kind) in IoKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.wire(), i as i32);
            assert_eq!(IoKind::from_wire(i as i32), Some(kind));
        }
        assert_eq!(IoKind::from_wire(5), None);
        assert_eq!(IoKind::from_wire(-1), None);
        assert!(IoKind::FluidOutput.is_output());
        assert!(!IoKind::GroupInput.is_output());
    }

    #[test]
    fn canonical_io_is_stable_by_kind() {
        let recipe = RecipeDef {
            id: "r:x".into(),
            category: "c".into(),
            io: vec![
                RecipeIoDef::new(IoKind::ItemOutput, "i:out", 1),
                RecipeIoDef::new(IoKind::ItemInput, "i:b", 2),
                RecipeIoDef::new(IoKind::FluidInput, "f:w", 100),
                RecipeIoDef::new(IoKind::ItemInput, "i:a", 1),
            ],
            machine: None,
        };
        let order: Vec<&str> = recipe.canonical_io().iter().map(|e| e.goods.as_str()).collect();
        assert_eq!(order, vec!["i:b", "i:a", "f:w", "i:out"]);
    }

    #[test]
    fn probability_is_stored_in_hundredths_of_percent() {
        let e = RecipeIoDef::new(IoKind::ItemOutput, "i:a", 1).with_probability(0.25);
        assert_eq!(e.stored_probability(), 2500);
        assert_eq!(RecipeIoDef::new(IoKind::ItemOutput, "i:a", 1).stored_probability(), 10_000);
    }

    #[test]
    fn dimensions_words() {
        let d = Dimensions {
            item_inputs: (3, 3),
            fluid_inputs: (1, 2),
            item_outputs: (2, 1),
            fluid_outputs: (0, 0),
        };
        assert_eq!(Dimensions::from_words(d.to_words()), d);
    }
}
