//! Serde data file structs for modpack exports.
//!
//! These structs define the on-disk format for items, fluids, groups,
//! categories and recipes. They are deserialized from RON, JSON, or TOML
//! data files and then converted into the core object model by the loader.

use std::collections::BTreeMap;

use craftbook_core::model::{
    CategoryDef, ContainerDef, Dimensions, FluidDef, GroupDef, IoKind, ItemDef, MachineDef,
    RecipeDef, RecipeIoDef,
};
use serde::Deserialize;

/// `"i:mod:name"` -> `("mod", "name")`. Ids without a mod segment belong to
/// `minecraft`.
pub fn split_id(id: &str) -> (String, String) {
    let rest = id.get(2..).unwrap_or("");
    match rest.split_once(':') {
        Some((m, name)) => (m.to_owned(), name.to_owned()),
        None => ("minecraft".to_owned(), rest.to_owned()),
    }
}

// ===========================================================================
// Items and fluids
// ===========================================================================

fn default_stack_size() -> i32 {
    64
}

/// An item definition in a data file. `mod_name` and `internal_name`
/// default to the segments of the id.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mod_name: Option<String>,
    #[serde(default)]
    pub internal_name: Option<String>,
    #[serde(default)]
    pub unlocalized_name: Option<String>,
    #[serde(default)]
    pub icon_id: i32,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub nbt: Option<String>,
    #[serde(default = "default_stack_size")]
    pub stack_size: i32,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub container: Option<ContainerData>,
}

/// The fluid an item holds.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerData {
    pub fluid: String,
    pub amount: i32,
    #[serde(default)]
    pub empty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FluidData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mod_name: Option<String>,
    #[serde(default)]
    pub internal_name: Option<String>,
    #[serde(default)]
    pub unlocalized_name: Option<String>,
    #[serde(default)]
    pub icon_id: i32,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub nbt: Option<String>,
    #[serde(default)]
    pub is_gas: bool,
}

/// Resolved (mod, internal, unlocalized) names of a commodity.
fn names(
    id: &str,
    mod_name: Option<String>,
    internal_name: Option<String>,
    unlocalized_name: Option<String>,
) -> (String, String, String) {
    let (m, n) = split_id(id);
    let internal = internal_name.unwrap_or(n);
    let unlocalized = unlocalized_name.unwrap_or_else(|| internal.clone());
    (mod_name.unwrap_or(m), internal, unlocalized)
}

impl ItemData {
    pub fn into_def(self) -> ItemDef {
        let (mod_name, internal_name, unlocalized_name) = names(
            &self.id,
            self.mod_name,
            self.internal_name,
            self.unlocalized_name,
        );
        ItemDef {
            id: self.id,
            name: self.name,
            mod_name,
            internal_name,
            icon_id: self.icon_id,
            tooltip: self.tooltip,
            unlocalized_name,
            nbt: self.nbt,
            stack_size: self.stack_size,
            damage: self.damage,
            container: self.container.map(|c| ContainerDef {
                fluid: c.fluid,
                amount: c.amount,
                empty: c.empty,
            }),
        }
    }
}

impl FluidData {
    pub fn into_def(self) -> FluidDef {
        let (mod_name, internal_name, unlocalized_name) = names(
            &self.id,
            self.mod_name,
            self.internal_name,
            self.unlocalized_name,
        );
        FluidDef {
            id: self.id,
            name: self.name,
            mod_name,
            internal_name,
            icon_id: self.icon_id,
            tooltip: self.tooltip,
            unlocalized_name,
            nbt: self.nbt,
            is_gas: self.is_gas,
        }
    }
}

// ===========================================================================
// Groups and categories
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GroupData {
    pub id: String,
    pub name: String,
    pub items: Vec<String>,
}

impl GroupData {
    pub fn into_def(self) -> GroupDef {
        GroupDef {
            id: self.id,
            name: self.name,
            items: self.items,
        }
    }
}

/// Pane sizes as `[width, height]`. Missing panes are 0x0.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct DimensionsData {
    pub item_inputs: (i32, i32),
    pub fluid_inputs: (i32, i32),
    pub item_outputs: (i32, i32),
    pub fluid_outputs: (i32, i32),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryData {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub dimensions: DimensionsData,
    #[serde(default)]
    pub shapeless: bool,
    #[serde(default)]
    pub singleblocks: Vec<String>,
    #[serde(default)]
    pub multiblocks: Vec<String>,
    #[serde(default)]
    pub default_crafter: Option<String>,
    #[serde(default)]
    pub crafters: Vec<String>,
}

impl CategoryData {
    pub fn into_def(self) -> CategoryDef {
        let d = self.dimensions;
        CategoryDef {
            name: self.name,
            label: self.label,
            dimensions: Dimensions {
                item_inputs: d.item_inputs,
                fluid_inputs: d.fluid_inputs,
                item_outputs: d.item_outputs,
                fluid_outputs: d.fluid_outputs,
            },
            shapeless: self.shapeless,
            singleblocks: self.singleblocks,
            multiblocks: self.multiblocks,
            default_crafter: self.default_crafter,
            crafters: self.crafters,
        }
    }
}

// ===========================================================================
// Recipes
// ===========================================================================

fn default_probability() -> f64 {
    1.0
}

/// One recipe I/O entry, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IoData {
    /// Short form: `("i:mod:name", amount)`, slot 0, always produced.
    Short(String, i32),
    /// Full form with slot and chance.
    Full {
        goods: String,
        amount: i32,
        #[serde(default)]
        slot: i32,
        #[serde(default = "default_probability")]
        probability: f64,
    },
}

impl IoData {
    pub fn goods(&self) -> &str {
        match self {
            IoData::Short(goods, _) | IoData::Full { goods, .. } => goods,
        }
    }

    fn into_def(self, kind: IoKind) -> RecipeIoDef {
        match self {
            IoData::Short(goods, amount) => RecipeIoDef::new(kind, goods, amount),
            IoData::Full {
                goods,
                amount,
                slot,
                probability,
            } => RecipeIoDef::new(kind, goods, amount)
                .with_slot(slot)
                .with_probability(probability),
        }
    }
}

fn default_amperage() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub voltage: i32,
    /// Ticks.
    pub duration: i32,
    #[serde(default = "default_amperage")]
    pub amperage: i32,
    #[serde(default)]
    pub voltage_tier: i32,
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
    #[serde(default)]
    pub special_value: i32,
}

impl MachineData {
    pub fn into_def(self) -> MachineDef {
        MachineDef {
            voltage: self.voltage,
            duration: self.duration,
            amperage: self.amperage,
            voltage_tier: self.voltage_tier,
            metadata: self.metadata.into_iter().collect(),
            special_value: self.special_value,
        }
    }
}

/// A recipe definition in a data file. I/O is listed per role.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub item_inputs: Vec<IoData>,
    #[serde(default)]
    pub group_inputs: Vec<IoData>,
    #[serde(default)]
    pub fluid_inputs: Vec<IoData>,
    #[serde(default)]
    pub item_outputs: Vec<IoData>,
    #[serde(default)]
    pub fluid_outputs: Vec<IoData>,
    #[serde(default)]
    pub machine: Option<MachineData>,
}

impl RecipeData {
    /// Every I/O entry with its role, in canonical order.
    pub fn io(&self) -> impl Iterator<Item = (IoKind, &IoData)> {
        [
            (IoKind::ItemInput, &self.item_inputs),
            (IoKind::GroupInput, &self.group_inputs),
            (IoKind::FluidInput, &self.fluid_inputs),
            (IoKind::ItemOutput, &self.item_outputs),
            (IoKind::FluidOutput, &self.fluid_outputs),
        ]
        .into_iter()
        .flat_map(|(kind, list)| list.iter().map(move |io| (kind, io)))
    }

    pub fn into_def(self) -> RecipeDef {
        let mut io = Vec::new();
        for (kind, list) in [
            (IoKind::ItemInput, self.item_inputs),
            (IoKind::GroupInput, self.group_inputs),
            (IoKind::FluidInput, self.fluid_inputs),
            (IoKind::ItemOutput, self.item_outputs),
            (IoKind::FluidOutput, self.fluid_outputs),
        ] {
            io.extend(list.into_iter().map(|entry| entry.into_def(kind)));
        }
        RecipeDef {
            id: self.id,
            category: self.category,
            io,
            machine: self.machine.map(MachineData::into_def),
        }
    }
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlRecipes {
    pub recipes: Vec<RecipeData>,
}

// ===========================================================================
// Tests
// ===========================================================================
