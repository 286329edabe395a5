//! Versioned record layouts shared by the arena writer and reader.
//!
//! The arena is not self-describing: both sides agree on the word offset of
//! every field of every record type. Those offsets live here, as constants
//! grouped per record and as [`Layout`] tables that the writer checks field
//! writes against and the reader validates once at load. Any change to a
//! layout requires bumping [`FORMAT_VERSION`].

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current arena format version, stored in word 0.
pub const FORMAT_VERSION: i32 = 5;

/// Number of words in the arena header.
pub const HEADER_WORDS: usize = 8;

/// Header slots. Every slot but `VERSION` holds a slice pointer.
pub mod header {
    pub const VERSION: usize = 0;
    pub const ITEMS: usize = 1;
    pub const FLUIDS: usize = 2;
    pub const GROUPS: usize = 3;
    pub const CATEGORIES: usize = 4;
    pub const RECIPES: usize = 5;
    pub const WELL_KNOWN: usize = 6;
    pub const REMAPS: usize = 7;
}

/// Fields common to every searchable record.
pub mod searchable {
    pub const BITS: usize = 0;
    pub const ID: usize = 4;
}

/// Fields shared by items and fluids.
pub mod goods {
    pub use super::searchable::{BITS, ID};
    pub const NAME: usize = 5;
    pub const MOD: usize = 6;
    pub const INTERNAL_NAME: usize = 7;
    pub const ICON_ID: usize = 8;
    pub const TOOLTIP: usize = 9;
    pub const UNLOCALIZED_NAME: usize = 10;
    pub const NBT: usize = 11;
    pub const PRODUCTION: usize = 12;
    pub const CONSUMPTION: usize = 13;
}

pub mod item {
    pub use super::goods::*;
    pub const STACK_SIZE: usize = 14;
    pub const DAMAGE: usize = 15;
    pub const CONTAINER: usize = 16;
}

pub mod fluid {
    pub use super::goods::*;
    pub const IS_GAS: usize = 14;
    pub const CONTAINERS: usize = 15;
}

pub mod container {
    pub const FLUID: usize = 0;
    pub const AMOUNT: usize = 1;
    pub const EMPTY: usize = 2;
}

pub mod group {
    pub use super::searchable::{BITS, ID};
    pub const NAME: usize = 5;
    pub const ITEMS: usize = 6;
}

pub mod category {
    pub const NAME: usize = 0;
    pub const LABEL: usize = 1;
    pub const DIMENSIONS: usize = 2;
    pub const MULTIBLOCKS: usize = 3;
    pub const SHAPELESS: usize = 4;
    pub const SINGLEBLOCKS: usize = 5;
    pub const DEFAULT_CRAFTER: usize = 6;
    pub const CRAFTERS: usize = 7;

    /// Ints in the dimensions slice: item in, fluid in, item out, fluid out.
    pub const DIMENSION_WORDS: usize = 8;
}

pub mod recipe {
    pub use super::searchable::{BITS, ID};
    pub const IO: usize = 5;
    pub const CATEGORY: usize = 6;
    pub const MACHINE: usize = 7;

    /// Words per I/O entry: kind, pointer, slot, amount, probability.
    pub const IO_STRIDE: usize = 5;
}

pub mod machine {
    pub const VOLTAGE: usize = 0;
    pub const DURATION: usize = 1;
    pub const AMPERAGE: usize = 2;
    pub const VOLTAGE_TIER: usize = 3;
    pub const METADATA: usize = 4;
    pub const CONFLICTS: usize = 5;
    pub const SPECIAL_VALUE: usize = 6;
}

pub mod metadata {
    pub const KEY: usize = 0;
    pub const VALUE: usize = 1;
}

pub mod remap {
    pub const FROM: usize = 0;
    pub const TO: usize = 1;
}

// ---------------------------------------------------------------------------
// Layout tables
// ---------------------------------------------------------------------------

/// Storage class of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Four words of search index bits.
    Bits,
    Int,
    /// Two words holding a little-endian `f64`, 8-byte aligned.
    Double,
    Str,
    Slice,
    Object,
}

impl FieldType {
    pub const fn words(self) -> usize {
        match self {
            FieldType::Bits => 4,
            FieldType::Double => 2,
            _ => 1,
        }
    }

    /// Whether the field stores a pointer.
    pub const fn is_pointer(self) -> bool {
        matches!(self, FieldType::Str | FieldType::Slice | FieldType::Object)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub ty: FieldType,
}

const fn field(name: &'static str, offset: usize, ty: FieldType) -> Field {
    Field { name, offset, ty }
}

/// The ordered field list of one record type.
#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub searchable: bool,
    pub fields: &'static [Field],
}

impl Layout {
    /// Total words occupied by one record.
    pub fn words(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.offset + f.ty.words())
            .max()
            .unwrap_or(0)
    }

    /// The field starting at `offset`, if any.
    pub fn field_at(&self, offset: usize) -> Option<&Field> {
        self.fields.iter().find(|f| f.offset == offset)
    }

    /// Parity of the word offset of this layout's doubles, if it has any.
    /// The writer pads so that `base + parity` is even.
    pub fn double_parity(&self) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.ty == FieldType::Double)
            .map(|f| f.offset % 2)
    }

    /// Check that fields tile the record without gaps or overlaps, that all
    /// doubles share a parity, and that searchable records carry the
    /// bits-then-id prefix.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut next = 0;
        for f in self.fields {
            if f.offset != next {
                return Err(SchemaError::NonContiguous {
                    layout: self.name,
                    field: f.name,
                    offset: f.offset,
                });
            }
            next = f.offset + f.ty.words();
        }

        if let Some(parity) = self.double_parity() {
            let mixed = self
                .fields
                .iter()
                .any(|f| f.ty == FieldType::Double && f.offset % 2 != parity);
            if mixed {
                return Err(SchemaError::DoubleParity { layout: self.name });
            }
        }

        if self.searchable {
            let bits = self.field_at(searchable::BITS).map(|f| f.ty);
            let id = self.field_at(searchable::ID).map(|f| f.ty);
            if bits != Some(FieldType::Bits) || id != Some(FieldType::Str) {
                return Err(SchemaError::SearchablePrefix { layout: self.name });
            }
        }
        Ok(())
    }
}

use FieldType::*;

pub const ITEM: Layout = Layout {
    name: "item",
    searchable: true,
    fields: &[
        field("bits", item::BITS, Bits),
        field("id", item::ID, Str),
        field("name", item::NAME, Str),
        field("mod", item::MOD, Str),
        field("internal_name", item::INTERNAL_NAME, Str),
        field("icon_id", item::ICON_ID, Int),
        field("tooltip", item::TOOLTIP, Str),
        field("unlocalized_name", item::UNLOCALIZED_NAME, Str),
        field("nbt", item::NBT, Str),
        field("production", item::PRODUCTION, Slice),
        field("consumption", item::CONSUMPTION, Slice),
        field("stack_size", item::STACK_SIZE, Int),
        field("damage", item::DAMAGE, Int),
        field("container", item::CONTAINER, Object),
    ],
};

pub const FLUID: Layout = Layout {
    name: "fluid",
    searchable: true,
    fields: &[
        field("bits", fluid::BITS, Bits),
        field("id", fluid::ID, Str),
        field("name", fluid::NAME, Str),
        field("mod", fluid::MOD, Str),
        field("internal_name", fluid::INTERNAL_NAME, Str),
        field("icon_id", fluid::ICON_ID, Int),
        field("tooltip", fluid::TOOLTIP, Str),
        field("unlocalized_name", fluid::UNLOCALIZED_NAME, Str),
        field("nbt", fluid::NBT, Str),
        field("production", fluid::PRODUCTION, Slice),
        field("consumption", fluid::CONSUMPTION, Slice),
        field("is_gas", fluid::IS_GAS, Int),
        field("containers", fluid::CONTAINERS, Slice),
    ],
};

pub const CONTAINER: Layout = Layout {
    name: "fluid_container",
    searchable: false,
    fields: &[
        field("fluid", container::FLUID, Object),
        field("amount", container::AMOUNT, Int),
        field("empty", container::EMPTY, Object),
    ],
};

pub const GROUP: Layout = Layout {
    name: "group",
    searchable: true,
    fields: &[
        field("bits", group::BITS, Bits),
        field("id", group::ID, Str),
        field("name", group::NAME, Str),
        field("items", group::ITEMS, Slice),
    ],
};

pub const CATEGORY: Layout = Layout {
    name: "category",
    searchable: false,
    fields: &[
        field("name", category::NAME, Str),
        field("label", category::LABEL, Str),
        field("dimensions", category::DIMENSIONS, Slice),
        field("multiblocks", category::MULTIBLOCKS, Slice),
        field("shapeless", category::SHAPELESS, Int),
        field("singleblocks", category::SINGLEBLOCKS, Slice),
        field("default_crafter", category::DEFAULT_CRAFTER, Object),
        field("crafters", category::CRAFTERS, Slice),
    ],
};

pub const RECIPE: Layout = Layout {
    name: "recipe",
    searchable: true,
    fields: &[
        field("bits", recipe::BITS, Bits),
        field("id", recipe::ID, Str),
        field("io", recipe::IO, Slice),
        field("category", recipe::CATEGORY, Object),
        field("machine", recipe::MACHINE, Object),
    ],
};

pub const MACHINE: Layout = Layout {
    name: "machine",
    searchable: false,
    fields: &[
        field("voltage", machine::VOLTAGE, Int),
        field("duration", machine::DURATION, Int),
        field("amperage", machine::AMPERAGE, Int),
        field("voltage_tier", machine::VOLTAGE_TIER, Int),
        field("metadata", machine::METADATA, Slice),
        field("conflicts", machine::CONFLICTS, Int),
        field("special_value", machine::SPECIAL_VALUE, Int),
    ],
};

pub const METADATA: Layout = Layout {
    name: "metadata",
    searchable: false,
    fields: &[
        field("key", metadata::KEY, Str),
        field("value", metadata::VALUE, Double),
    ],
};

pub const REMAP: Layout = Layout {
    name: "remap",
    searchable: false,
    fields: &[
        field("from", remap::FROM, Str),
        field("to", remap::TO, Object),
    ],
};

/// Every layout of one format version.
#[derive(Debug)]
pub struct Schema {
    pub version: i32,
    pub layouts: &'static [&'static Layout],
}

pub static SCHEMA: Schema = Schema {
    version: FORMAT_VERSION,
    layouts: &[
        &ITEM, &FLUID, &CONTAINER, &GROUP, &CATEGORY, &RECIPE, &MACHINE, &METADATA, &REMAP,
    ],
};

impl Schema {
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.layouts.iter().try_for_each(|layout| layout.validate())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("layout {layout}: field '{field}' at word {offset} leaves a gap or overlaps")]
    NonContiguous {
        layout: &'static str,
        field: &'static str,
        offset: usize,
    },
    #[error("layout {layout}: doubles disagree on word parity")]
    DoubleParity { layout: &'static str },
    #[error("layout {layout}: searchable records must start with index bits and an id")]
    SearchablePrefix { layout: &'static str },
}
