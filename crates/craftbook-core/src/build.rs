//! The build pipeline: model in, arena bytes out.
//!
//! Stages run in a fixed order:
//!
//! 1. ban list, display-text fix-up and circuit conflicts on the model;
//! 2. id tag checks and the remap diff against the previous arena;
//! 3. encoding: items, fluids, fluid containers, groups, categories,
//!    recipes, then the back-patched production/consumption slices, the
//!    collections, the well-known list, the remap records and the header.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::info;

use crate::arena::{ArenaWriter, EncodeError, Pointer, PointerTable, RecordWriter};
use crate::config::BuildConfig;
use crate::conflicts::circuit_conflicts;
use crate::dataset::{Dataset, LoadError};
use crate::filter::FilterReport;
use crate::id::IdKind;
use crate::index::{IndexBits, IndexBuilder};
use crate::model::{IoKind, MachineDef, Model, RecipeDef};
use crate::remap::{RemapReport, RemapTable, compute_remaps};
use crate::schema::{
    self, SCHEMA, SchemaError, category, container, fluid, goods, group, header, item, machine,
};
use crate::text::TextFixReport;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Counts gathered while building.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub items: usize,
    pub fluids: usize,
    pub groups: usize,
    pub categories: usize,
    pub recipes: usize,
    pub strings: usize,
    pub words: usize,
    pub conflicting_recipes: usize,
    pub filter: FilterReport,
    pub text: TextFixReport,
    pub remap: RemapReport,
}

#[derive(Debug)]
pub struct BuildOutput {
    pub bytes: Vec<u8>,
    pub report: BuildReport,
}

impl BuildOutput {
    /// Load the freshly built arena.
    pub fn dataset(&self) -> Result<Dataset, LoadError> {
        Dataset::load(self.bytes.clone())
    }
}

/// Encode `model`, diffing recipe ids against `previous` if given.
pub fn build(
    mut model: Model,
    previous: Option<&[u8]>,
    config: &BuildConfig,
) -> Result<BuildOutput, BuildError> {
    SCHEMA.validate()?;
    let filter = config.ban_list().apply(&mut model);
    let text = config.character_fixer().apply(&mut model);
    let conflicts = circuit_conflicts(&model, &config.circuit_item);
    check_id_tags(&model)?;

    let (remaps, remap) = compute_remaps(previous, &model.recipes, config.remap_policy);

    let mut enc = Encoder::new();
    enc.items(&model)?;
    enc.fluids(&model)?;
    enc.containers(&model)?;
    enc.groups(&model)?;
    enc.categories(&model)?;
    enc.recipes(&model, &conflicts)?;
    enc.back_references()?;
    enc.collections()?;
    enc.well_known(&model)?;
    enc.remaps(&remaps)?;

    let report = BuildReport {
        items: enc.items.len(),
        fluids: enc.fluids.len(),
        groups: enc.groups.len(),
        categories: enc.categories.len(),
        recipes: enc.recipes.len(),
        strings: enc.writer.string_count(),
        words: enc.writer.len(),
        conflicting_recipes: conflicts.iter().filter(|m| **m != 0).count(),
        filter,
        text,
        remap,
    };
    info!(
        items = report.items,
        fluids = report.fluids,
        groups = report.groups,
        recipes = report.recipes,
        words = report.words,
        remaps = remaps.len(),
        "arena built"
    );
    Ok(BuildOutput {
        bytes: enc.writer.finish(),
        report,
    })
}

fn check_id_tags(model: &Model) -> Result<(), EncodeError> {
    let ids = model
        .items
        .iter()
        .map(|i| (IdKind::Item, &i.id))
        .chain(model.fluids.iter().map(|f| (IdKind::Fluid, &f.id)))
        .chain(model.groups.iter().map(|g| (IdKind::Group, &g.id)))
        .chain(model.recipes.iter().map(|r| (IdKind::Recipe, &r.id)));
    for (kind, id) in ids {
        if !kind.accepts(id) {
            return Err(EncodeError::MismatchedIdTag {
                kind: kind.name(),
                id: id.clone(),
                expected: kind.tag(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Display fields shared by items and fluids.
struct GoodsText<'m> {
    id: &'m str,
    name: &'m str,
    mod_name: &'m str,
    internal_name: &'m str,
    icon_id: i32,
    tooltip: Option<&'m str>,
    unlocalized_name: &'m str,
    nbt: Option<&'m str>,
}

struct Encoder {
    writer: ArenaWriter,
    items: PointerTable,
    fluids: PointerTable,
    groups: PointerTable,
    categories: PointerTable,
    recipes: PointerTable,
    bits: FxHashMap<Pointer, IndexBits>,
    group_members: FxHashMap<Pointer, Vec<Pointer>>,
    produced_by: FxHashMap<Pointer, Vec<Pointer>>,
    consumed_by: FxHashMap<Pointer, Vec<Pointer>>,
}

fn push_unique(map: &mut FxHashMap<Pointer, Vec<Pointer>>, goods: Pointer, recipe: Pointer) {
    let list = map.entry(goods).or_default();
    if list.last() != Some(&recipe) {
        list.push(recipe);
    }
}

impl Encoder {
    fn new() -> Self {
        Self {
            writer: ArenaWriter::new(),
            items: PointerTable::new(IdKind::Item.name()),
            fluids: PointerTable::new(IdKind::Fluid.name()),
            groups: PointerTable::new(IdKind::Group.name()),
            categories: PointerTable::new("category"),
            recipes: PointerTable::new(IdKind::Recipe.name()),
            bits: FxHashMap::default(),
            group_members: FxHashMap::default(),
            produced_by: FxHashMap::default(),
            consumed_by: FxHashMap::default(),
        }
    }

    /// Fill the searchable and goods fields, leaving back references null.
    fn goods_fields(
        &mut self,
        rec: &mut RecordWriter,
        g: &GoodsText<'_>,
    ) -> Result<IndexBits, EncodeError> {
        let bits = IndexBuilder::new()
            .add_text(g.name)
            .add_opt(g.tooltip)
            .add_text(g.mod_name)
            .finish();
        let w = &mut self.writer;
        rec.bits(goods::BITS, bits)?
            .string(goods::ID, w.intern_string(g.id)?)?
            .string(goods::NAME, w.intern_string(g.name)?)?
            .string(goods::MOD, w.intern_string(g.mod_name)?)?
            .string(goods::INTERNAL_NAME, w.intern_string(g.internal_name)?)?
            .int(goods::ICON_ID, g.icon_id)?
            .string(goods::TOOLTIP, w.intern_opt(g.tooltip)?)?
            .string(goods::UNLOCALIZED_NAME, w.intern_string(g.unlocalized_name)?)?
            .string(goods::NBT, w.intern_opt(g.nbt)?)?
            .slice(goods::PRODUCTION, Pointer::NULL)?
            .slice(goods::CONSUMPTION, Pointer::NULL)?;
        Ok(bits)
    }

    fn items(&mut self, model: &Model) -> Result<(), EncodeError> {
        for def in &model.items {
            let mut rec = RecordWriter::new(&schema::ITEM);
            let bits = self.goods_fields(
                &mut rec,
                &GoodsText {
                    id: &def.id,
                    name: &def.name,
                    mod_name: &def.mod_name,
                    internal_name: &def.internal_name,
                    icon_id: def.icon_id,
                    tooltip: def.tooltip.as_deref(),
                    unlocalized_name: &def.unlocalized_name,
                    nbt: def.nbt.as_deref(),
                },
            )?;
            rec.int(item::STACK_SIZE, def.stack_size)?
                .int(item::DAMAGE, def.damage)?
                .object(item::CONTAINER, Pointer::NULL)?;
            let ptr = self.writer.write_object(rec.finish()?)?;
            self.items.insert(&def.id, ptr)?;
            self.bits.insert(ptr, bits);
        }
        Ok(())
    }

    fn fluids(&mut self, model: &Model) -> Result<(), EncodeError> {
        for def in &model.fluids {
            let mut rec = RecordWriter::new(&schema::FLUID);
            let bits = self.goods_fields(
                &mut rec,
                &GoodsText {
                    id: &def.id,
                    name: &def.name,
                    mod_name: &def.mod_name,
                    internal_name: &def.internal_name,
                    icon_id: def.icon_id,
                    tooltip: def.tooltip.as_deref(),
                    unlocalized_name: &def.unlocalized_name,
                    nbt: def.nbt.as_deref(),
                },
            )?;
            rec.int(fluid::IS_GAS, def.is_gas as i32)?
                .slice(fluid::CONTAINERS, Pointer::NULL)?;
            let ptr = self.writer.write_object(rec.finish()?)?;
            self.fluids.insert(&def.id, ptr)?;
            self.bits.insert(ptr, bits);
        }
        Ok(())
    }

    fn containers(&mut self, model: &Model) -> Result<(), EncodeError> {
        let mut by_fluid: FxHashMap<Pointer, Vec<Pointer>> = FxHashMap::default();
        for def in &model.items {
            let Some(c) = &def.container else { continue };
            let fluid_ptr = self.fluids.resolve(&c.fluid)?;
            let mut rec = RecordWriter::new(&schema::CONTAINER);
            rec.object(container::FLUID, fluid_ptr)?
                .int(container::AMOUNT, c.amount)?
                .object(container::EMPTY, self.items.resolve_opt(c.empty.as_deref())?)?;
            let ptr = self.writer.write_object(rec.finish()?)?;
            let item_ptr = self.items.resolve(&def.id)?;
            self.writer
                .patch(item_ptr, &schema::ITEM, item::CONTAINER, ptr)?;
            by_fluid.entry(fluid_ptr).or_default().push(ptr);
        }
        for &fluid_ptr in self.fluids.pointers() {
            if let Some(list) = by_fluid.get(&fluid_ptr) {
                let slice = self.writer.write_pointers(list)?;
                self.writer
                    .patch(fluid_ptr, &schema::FLUID, fluid::CONTAINERS, slice)?;
            }
        }
        Ok(())
    }

    fn groups(&mut self, model: &Model) -> Result<(), EncodeError> {
        for def in &model.groups {
            let members = def
                .items
                .iter()
                .map(|id| self.items.resolve(id))
                .collect::<Result<Vec<_>, _>>()?;
            let mut bits = IndexBuilder::new();
            for m in &members {
                bits.add_bits(self.bits.get(m).copied().unwrap_or_default());
            }
            let bits = bits.finish();

            let items_slice = self.writer.write_pointers(&members)?;
            let mut rec = RecordWriter::new(&schema::GROUP);
            rec.bits(group::BITS, bits)?
                .string(group::ID, self.writer.intern_string(&def.id)?)?
                .string(group::NAME, self.writer.intern_string(&def.name)?)?
                .slice(group::ITEMS, items_slice)?;
            let ptr = self.writer.write_object(rec.finish()?)?;
            self.groups.insert(&def.id, ptr)?;
            self.bits.insert(ptr, bits);
            self.group_members.insert(ptr, members);
        }
        Ok(())
    }

    fn item_list(&mut self, ids: &[String]) -> Result<Pointer, EncodeError> {
        let ptrs = ids
            .iter()
            .map(|id| self.items.resolve(id))
            .collect::<Result<Vec<_>, _>>()?;
        self.writer.write_pointers(&ptrs)
    }

    fn categories(&mut self, model: &Model) -> Result<(), EncodeError> {
        for def in &model.categories {
            let dimensions = self.writer.write_slice(&def.dimensions.to_words())?;
            let multiblocks = self.item_list(&def.multiblocks)?;
            let singleblocks = self.item_list(&def.singleblocks)?;
            let crafters = self.item_list(&def.crafters)?;
            let default_crafter = self.items.resolve_opt(def.default_crafter.as_deref())?;

            let mut rec = RecordWriter::new(&schema::CATEGORY);
            rec.string(category::NAME, self.writer.intern_string(&def.name)?)?
                .string(category::LABEL, self.writer.intern_opt(def.label.as_deref())?)?
                .slice(category::DIMENSIONS, dimensions)?
                .slice(category::MULTIBLOCKS, multiblocks)?
                .int(category::SHAPELESS, def.shapeless as i32)?
                .slice(category::SINGLEBLOCKS, singleblocks)?
                .object(category::DEFAULT_CRAFTER, default_crafter)?
                .slice(category::CRAFTERS, crafters)?;
            let ptr = self.writer.write_object(rec.finish()?)?;
            self.categories.insert(&def.name, ptr)?;
        }
        Ok(())
    }

    fn machine(&mut self, def: &MachineDef, conflicts: u32) -> Result<Pointer, EncodeError> {
        let mut entries = Vec::with_capacity(def.metadata.len());
        for (key, value) in &def.metadata {
            let mut rec = RecordWriter::new(&schema::METADATA);
            rec.string(schema::metadata::KEY, self.writer.intern_string(key)?)?
                .double(schema::metadata::VALUE, *value)?;
            entries.push(self.writer.write_object(rec.finish()?)?);
        }
        let metadata = self.writer.write_pointers(&entries)?;

        let mut rec = RecordWriter::new(&schema::MACHINE);
        rec.int(machine::VOLTAGE, def.voltage)?
            .int(machine::DURATION, def.duration)?
            .int(machine::AMPERAGE, def.amperage)?
            .int(machine::VOLTAGE_TIER, def.voltage_tier)?
            .slice(machine::METADATA, metadata)?
            .int(machine::CONFLICTS, conflicts as i32)?
            .int(machine::SPECIAL_VALUE, def.special_value)?;
        self.writer.write_object(rec.finish()?)
    }

    fn goods_table(&self, kind: IoKind) -> &PointerTable {
        match kind {
            IoKind::ItemInput | IoKind::ItemOutput => &self.items,
            IoKind::FluidInput | IoKind::FluidOutput => &self.fluids,
            IoKind::GroupInput => &self.groups,
        }
    }

    fn recipe(&mut self, def: &RecipeDef, conflicts: u32) -> Result<(), EncodeError> {
        let io = def.canonical_io();
        let mut words = Vec::with_capacity(io.len() * schema::recipe::IO_STRIDE);
        let mut bits = IndexBuilder::new();
        let mut targets = Vec::with_capacity(io.len());
        for entry in &io {
            let target = self.goods_table(entry.kind).resolve(&entry.goods)?;
            bits.add_bits(self.bits.get(&target).copied().unwrap_or_default());
            words.extend_from_slice(&[
                entry.kind.wire(),
                target.0,
                entry.slot,
                entry.amount,
                entry.stored_probability(),
            ]);
            targets.push((entry.kind, target));
        }
        let bits = bits.finish();

        let io_slice = self.writer.write_slice(&words)?;
        let category = self.categories.resolve(&def.category)?;
        let machine = match &def.machine {
            Some(m) => self.machine(m, conflicts)?,
            None => Pointer::NULL,
        };

        let mut rec = RecordWriter::new(&schema::RECIPE);
        rec.bits(schema::recipe::BITS, bits)?
            .string(schema::recipe::ID, self.writer.intern_string(&def.id)?)?
            .slice(schema::recipe::IO, io_slice)?
            .object(schema::recipe::CATEGORY, category)?
            .object(schema::recipe::MACHINE, machine)?;
        let ptr = self.writer.write_object(rec.finish()?)?;
        self.recipes.insert(&def.id, ptr)?;

        for (kind, target) in targets {
            match kind {
                IoKind::ItemOutput | IoKind::FluidOutput => {
                    push_unique(&mut self.produced_by, target, ptr)
                }
                IoKind::ItemInput | IoKind::FluidInput => {
                    push_unique(&mut self.consumed_by, target, ptr)
                }
                IoKind::GroupInput => {
                    if let Some(members) = self.group_members.get(&target) {
                        for &m in members {
                            push_unique(&mut self.consumed_by, m, ptr);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn recipes(&mut self, model: &Model, conflicts: &[u32]) -> Result<(), EncodeError> {
        for (i, def) in model.recipes.iter().enumerate() {
            self.recipe(def, conflicts.get(i).copied().unwrap_or(0))?;
        }
        Ok(())
    }

    /// Write production and consumption slices into every commodity that
    /// has any.
    fn back_references(&mut self) -> Result<(), EncodeError> {
        let goods: Vec<(Pointer, &'static schema::Layout)> = self
            .items
            .pointers()
            .iter()
            .map(|&p| (p, &schema::ITEM))
            .chain(self.fluids.pointers().iter().map(|&p| (p, &schema::FLUID)))
            .collect();
        for (ptr, layout) in goods {
            if let Some(list) = self.produced_by.remove(&ptr) {
                let slice = self.writer.write_pointers(&list)?;
                self.writer.patch(ptr, layout, goods::PRODUCTION, slice)?;
            }
            if let Some(list) = self.consumed_by.remove(&ptr) {
                let slice = self.writer.write_pointers(&list)?;
                self.writer.patch(ptr, layout, goods::CONSUMPTION, slice)?;
            }
        }
        Ok(())
    }

    fn collections(&mut self) -> Result<(), EncodeError> {
        for (slot, table) in [
            (header::ITEMS, &self.items),
            (header::FLUIDS, &self.fluids),
            (header::GROUPS, &self.groups),
            (header::CATEGORIES, &self.categories),
            (header::RECIPES, &self.recipes),
        ] {
            let ptr = self.writer.write_pointers(table.pointers())?;
            self.writer.set_header(slot, ptr);
        }
        Ok(())
    }

    fn well_known(&mut self, model: &Model) -> Result<(), EncodeError> {
        let ptrs = model
            .well_known
            .iter()
            .map(|id| match IdKind::of(id) {
                Some(IdKind::Item) => self.items.resolve(id),
                Some(IdKind::Fluid) => self.fluids.resolve(id),
                Some(IdKind::Group) => self.groups.resolve(id),
                Some(IdKind::Recipe) => self.recipes.resolve(id),
                None => Err(EncodeError::DanglingReference {
                    kind: "object",
                    id: id.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ptr = self.writer.write_pointers(&ptrs)?;
        self.writer.set_header(header::WELL_KNOWN, ptr);
        Ok(())
    }

    fn remaps(&mut self, table: &RemapTable) -> Result<(), EncodeError> {
        let mut records = Vec::with_capacity(table.len());
        for entry in table.entries() {
            let mut rec = RecordWriter::new(&schema::REMAP);
            rec.string(schema::remap::FROM, self.writer.intern_string(&entry.from)?)?
                .object(schema::remap::TO, self.recipes.resolve(&entry.to)?)?;
            records.push(self.writer.write_object(rec.finish()?)?);
        }
        let ptr = self.writer.write_pointers(&records)?;
        self.writer.set_header(header::REMAPS, ptr);
        Ok(())
    }
}
