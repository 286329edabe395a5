//! Typed views over arena records.
//!
//! A [`View`] pairs the reader with a cached [`Node`]; cloning a view is an
//! `Rc` bump and two views of the same pointer share one node. Each record
//! type is a zero-sized [`Shape`] and the public names (`Item`, `Recipe`,
//! ...) are aliases of `View` over those shapes.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::arena::{Node, Pointer, Reader, Shape};
use crate::id::IdKind;
use crate::index::IndexBits;
use crate::model::{Dimensions, IoKind, PROBABILITY_SCALE};
use crate::schema::{self, Layout, category, container, fluid, goods, group, item, machine};

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

macro_rules! shape {
    ($name:ident, $layout:expr) => {
        shape!($name, $layout, ());
    };
    ($name:ident, $layout:expr, $cache:ty) => {
        #[derive(Debug)]
        pub enum $name {}

        impl Shape for $name {
            const LAYOUT: &'static Layout = &$layout;
            type Cache = $cache;
        }
    };
}

shape!(ItemShape, schema::ITEM);
shape!(FluidShape, schema::FLUID);
shape!(ContainerShape, schema::CONTAINER);
shape!(GroupShape, schema::GROUP);
shape!(CategoryShape, schema::CATEGORY);
shape!(RecipeShape, schema::RECIPE, OnceCell<Vec<IoEntry>>);
shape!(MachineShape, schema::MACHINE);
shape!(MetadataShape, schema::METADATA);
shape!(RemapShape, schema::REMAP);

/// Records that start with index bits and an id.
pub trait Searchable: Shape {
    const KIND: IdKind;
}

impl Searchable for ItemShape {
    const KIND: IdKind = IdKind::Item;
}
impl Searchable for FluidShape {
    const KIND: IdKind = IdKind::Fluid;
}
impl Searchable for GroupShape {
    const KIND: IdKind = IdKind::Group;
}
impl Searchable for RecipeShape {
    const KIND: IdKind = IdKind::Recipe;
}

/// Items and fluids.
pub trait GoodsShape: Searchable {}

impl GoodsShape for ItemShape {}
impl GoodsShape for FluidShape {}

pub type Item<'a> = View<'a, ItemShape>;
pub type Fluid<'a> = View<'a, FluidShape>;
pub type FluidContainer<'a> = View<'a, ContainerShape>;
pub type Group<'a> = View<'a, GroupShape>;
pub type Category<'a> = View<'a, CategoryShape>;
pub type Recipe<'a> = View<'a, RecipeShape>;
pub type MachineInfo<'a> = View<'a, MachineShape>;
pub type Metadata<'a> = View<'a, MetadataShape>;
pub type Remap<'a> = View<'a, RemapShape>;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

pub struct View<'a, S: Shape> {
    reader: &'a Reader,
    node: Rc<Node<S>>,
}

impl<S: Shape> Clone for View<'_, S> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader,
            node: Rc::clone(&self.node),
        }
    }
}

impl<S: Shape> fmt::Debug for View<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct(S::LAYOUT.name);
        d.field("ptr", &self.node.pointer().0);
        if let Some(id) = self.node.id() {
            d.field("id", id);
        }
        d.finish()
    }
}

impl<'a, S: Shape> View<'a, S> {
    /// Materialize (or fetch) the record at `ptr`. `None` for null.
    pub fn at(reader: &'a Reader, ptr: Pointer) -> Option<Self> {
        reader.object::<S>(ptr).map(|node| View { reader, node })
    }

    pub fn pointer(&self) -> Pointer {
        self.node.pointer()
    }

    pub fn node(&self) -> &Rc<Node<S>> {
        &self.node
    }

    /// Whether both views wrap the very same materialized node.
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    fn int(&self, offset: usize) -> i32 {
        self.reader.field(self.pointer(), offset)
    }

    fn text(&self, offset: usize) -> Rc<str> {
        self.opt_text(offset).unwrap_or_else(|| Rc::from(""))
    }

    fn opt_text(&self, offset: usize) -> Option<Rc<str>> {
        self.reader.string_field(self.pointer(), offset)
    }

    fn link<T: Shape>(&self, offset: usize) -> Option<View<'a, T>> {
        View::at(self.reader, self.reader.pointer(self.pointer(), offset))
    }

    fn links<T: Shape>(&self, offset: usize) -> impl Iterator<Item = View<'a, T>> + use<'a, S, T> {
        let reader = self.reader;
        reader
            .slice_field(self.pointer(), offset)
            .pointers()
            .filter_map(move |p| View::at(reader, p))
    }
}

impl<S: Searchable> View<'_, S> {
    pub fn id(&self) -> &str {
        self.node.id().map_or("", |id| &**id)
    }

    pub fn bits(&self) -> IndexBits {
        self.reader.bits(self.pointer())
    }
}

impl<'a, S: GoodsShape> View<'a, S> {
    pub fn name(&self) -> Rc<str> {
        self.text(goods::NAME)
    }

    pub fn mod_name(&self) -> Rc<str> {
        self.text(goods::MOD)
    }

    pub fn internal_name(&self) -> Rc<str> {
        self.text(goods::INTERNAL_NAME)
    }

    pub fn icon_id(&self) -> i32 {
        self.int(goods::ICON_ID)
    }

    pub fn tooltip(&self) -> Option<Rc<str>> {
        self.opt_text(goods::TOOLTIP)
    }

    pub fn unlocalized_name(&self) -> Rc<str> {
        self.text(goods::UNLOCALIZED_NAME)
    }

    pub fn nbt(&self) -> Option<Rc<str>> {
        self.opt_text(goods::NBT)
    }

    /// Recipes that output this commodity.
    pub fn production(&self) -> impl Iterator<Item = Recipe<'a>> + use<'a, S> {
        self.links(goods::PRODUCTION)
    }

    /// Recipes that consume this commodity, directly or through a group.
    pub fn consumption(&self) -> impl Iterator<Item = Recipe<'a>> + use<'a, S> {
        self.links(goods::CONSUMPTION)
    }
}

impl<'a> Item<'a> {
    pub fn stack_size(&self) -> i32 {
        self.int(item::STACK_SIZE)
    }

    pub fn damage(&self) -> i32 {
        self.int(item::DAMAGE)
    }

    pub fn container(&self) -> Option<FluidContainer<'a>> {
        self.link(item::CONTAINER)
    }
}

impl<'a> Fluid<'a> {
    pub fn is_gas(&self) -> bool {
        self.int(fluid::IS_GAS) != 0
    }

    /// Items that hold this fluid.
    pub fn containers(&self) -> impl Iterator<Item = FluidContainer<'a>> + use<'a> {
        self.links(fluid::CONTAINERS)
    }
}

impl<'a> FluidContainer<'a> {
    pub fn fluid(&self) -> Option<Fluid<'a>> {
        self.link(container::FLUID)
    }

    pub fn amount(&self) -> i32 {
        self.int(container::AMOUNT)
    }

    pub fn empty(&self) -> Option<Item<'a>> {
        self.link(container::EMPTY)
    }
}

impl<'a> Group<'a> {
    pub fn name(&self) -> Rc<str> {
        self.text(group::NAME)
    }

    pub fn items(&self) -> impl Iterator<Item = Item<'a>> + use<'a> {
        self.links(group::ITEMS)
    }
}

impl<'a> Category<'a> {
    pub fn name(&self) -> Rc<str> {
        self.text(category::NAME)
    }

    /// Label of the tab the category is shown under.
    pub fn label(&self) -> Option<Rc<str>> {
        self.opt_text(category::LABEL)
    }

    pub fn dimensions(&self) -> Dimensions {
        let slice = self.reader.slice_field(self.pointer(), category::DIMENSIONS);
        let mut words = [0; category::DIMENSION_WORDS];
        for (dst, src) in words.iter_mut().zip(slice.iter()) {
            *dst = src;
        }
        Dimensions::from_words(words)
    }

    pub fn shapeless(&self) -> bool {
        self.int(category::SHAPELESS) != 0
    }

    pub fn singleblocks(&self) -> impl Iterator<Item = Item<'a>> + use<'a> {
        self.links(category::SINGLEBLOCKS)
    }

    pub fn multiblocks(&self) -> impl Iterator<Item = Item<'a>> + use<'a> {
        self.links(category::MULTIBLOCKS)
    }

    pub fn crafters(&self) -> impl Iterator<Item = Item<'a>> + use<'a> {
        self.links(category::CRAFTERS)
    }

    pub fn default_crafter(&self) -> Option<Item<'a>> {
        self.link(category::DEFAULT_CRAFTER)
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// One decoded I/O quintuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoEntry {
    pub kind: IoKind,
    pub target: Pointer,
    pub slot: i32,
    pub amount: i32,
    /// Hundredths of a percent.
    pub probability: i32,
}

/// What a recipe I/O entry points at.
#[derive(Debug, Clone)]
pub enum RecipeObject<'a> {
    Item(Item<'a>),
    Fluid(Fluid<'a>),
    Group(Group<'a>),
}

impl<'a> RecipeObject<'a> {
    pub fn id(&self) -> &str {
        match self {
            RecipeObject::Item(v) => v.id(),
            RecipeObject::Fluid(v) => v.id(),
            RecipeObject::Group(v) => v.id(),
        }
    }

    pub fn name(&self) -> Rc<str> {
        match self {
            RecipeObject::Item(v) => v.name(),
            RecipeObject::Fluid(v) => v.name(),
            RecipeObject::Group(v) => v.name(),
        }
    }

    pub fn bits(&self) -> IndexBits {
        match self {
            RecipeObject::Item(v) => v.bits(),
            RecipeObject::Fluid(v) => v.bits(),
            RecipeObject::Group(v) => v.bits(),
        }
    }

    pub fn into_object(self) -> Object<'a> {
        match self {
            RecipeObject::Item(v) => Object::Item(v),
            RecipeObject::Fluid(v) => Object::Fluid(v),
            RecipeObject::Group(v) => Object::Group(v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecipeIo<'a> {
    pub kind: IoKind,
    pub goods: RecipeObject<'a>,
    pub slot: i32,
    pub amount: i32,
    /// Chance in `0.0..=1.0`.
    pub probability: f64,
}

impl<'a> Recipe<'a> {
    /// Raw I/O entries in stored (canonical) order. Entries with an
    /// unknown kind are skipped.
    pub fn io_entries(&self) -> &[IoEntry] {
        self.node.cache().get_or_init(|| {
            let slice = self.reader.slice_field(self.pointer(), schema::recipe::IO);
            let words: Vec<i32> = slice.iter().collect();
            words
                .chunks_exact(schema::recipe::IO_STRIDE)
                .filter_map(|q| {
                    Some(IoEntry {
                        kind: IoKind::from_wire(q[0])?,
                        target: Pointer(q[1]),
                        slot: q[2],
                        amount: q[3],
                        probability: q[4],
                    })
                })
                .collect()
        })
    }

    pub fn io(&self) -> impl Iterator<Item = RecipeIo<'a>> + '_ {
        let reader = self.reader;
        self.io_entries().iter().filter_map(move |e| {
            let goods = match e.kind {
                IoKind::ItemInput | IoKind::ItemOutput => {
                    RecipeObject::Item(View::at(reader, e.target)?)
                }
                IoKind::FluidInput | IoKind::FluidOutput => {
                    RecipeObject::Fluid(View::at(reader, e.target)?)
                }
                IoKind::GroupInput => RecipeObject::Group(View::at(reader, e.target)?),
            };
            Some(RecipeIo {
                kind: e.kind,
                goods,
                slot: e.slot,
                amount: e.amount,
                probability: e.probability as f64 / PROBABILITY_SCALE as f64,
            })
        })
    }

    pub fn inputs(&self) -> impl Iterator<Item = RecipeIo<'a>> + '_ {
        self.io().filter(|io| !io.kind.is_output())
    }

    pub fn outputs(&self) -> impl Iterator<Item = RecipeIo<'a>> + '_ {
        self.io().filter(|io| io.kind.is_output())
    }

    pub fn category(&self) -> Option<Category<'a>> {
        self.link(schema::recipe::CATEGORY)
    }

    /// Machine requirements, for recipes that have them.
    pub fn machine(&self) -> Option<MachineInfo<'a>> {
        self.link(schema::recipe::MACHINE)
    }
}

impl<'a> MachineInfo<'a> {
    pub fn voltage(&self) -> i32 {
        self.int(machine::VOLTAGE)
    }

    pub fn duration_ticks(&self) -> i32 {
        self.int(machine::DURATION)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ticks() as f64 / 20.0
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds() / 60.0
    }

    pub fn amperage(&self) -> i32 {
        self.int(machine::AMPERAGE)
    }

    pub fn voltage_tier(&self) -> i32 {
        self.int(machine::VOLTAGE_TIER)
    }

    pub fn metadata(&self) -> impl Iterator<Item = Metadata<'a>> + use<'a> {
        self.links(machine::METADATA)
    }

    /// Value stored under `key`, or `default` when absent.
    pub fn metadata_value(&self, key: &str, default: f64) -> f64 {
        self.metadata()
            .find(|m| &*m.key() == key)
            .map_or(default, |m| m.value())
    }

    /// Bit `c` is set when a recipe of the same category configured with
    /// circuit `c` would also accept this recipe's inputs.
    pub fn circuit_conflicts(&self) -> u32 {
        self.int(machine::CONFLICTS) as u32
    }

    pub fn conflicts_with_circuit(&self, circuit: u32) -> bool {
        circuit < 32 && self.circuit_conflicts() & (1 << circuit) != 0
    }

    pub fn special_value(&self) -> i32 {
        self.int(machine::SPECIAL_VALUE)
    }
}

impl Metadata<'_> {
    pub fn key(&self) -> Rc<str> {
        self.text(schema::metadata::KEY)
    }

    pub fn value(&self) -> f64 {
        self.reader
            .double(self.pointer().word(schema::metadata::VALUE))
    }
}

impl<'a> Remap<'a> {
    pub fn from_id(&self) -> Rc<str> {
        self.text(schema::remap::FROM)
    }

    pub fn target(&self) -> Pointer {
        self.reader.pointer(self.pointer(), schema::remap::TO)
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Any searchable record.
#[derive(Debug, Clone)]
pub enum Object<'a> {
    Item(Item<'a>),
    Fluid(Fluid<'a>),
    Group(Group<'a>),
    Recipe(Recipe<'a>),
}

impl<'a> Object<'a> {
    /// Materialize a searchable record of kind `kind`.
    pub fn at(reader: &'a Reader, kind: IdKind, ptr: Pointer) -> Option<Self> {
        Some(match kind {
            IdKind::Item => Object::Item(View::at(reader, ptr)?),
            IdKind::Fluid => Object::Fluid(View::at(reader, ptr)?),
            IdKind::Group => Object::Group(View::at(reader, ptr)?),
            IdKind::Recipe => Object::Recipe(View::at(reader, ptr)?),
        })
    }

    /// Materialize a searchable record, taking its kind from its id tag.
    pub fn sniff(reader: &'a Reader, ptr: Pointer) -> Option<Self> {
        let id = reader.string_field(ptr.non_null()?, schema::searchable::ID)?;
        Object::at(reader, IdKind::of(&id)?, ptr)
    }

    pub fn kind(&self) -> IdKind {
        match self {
            Object::Item(_) => IdKind::Item,
            Object::Fluid(_) => IdKind::Fluid,
            Object::Group(_) => IdKind::Group,
            Object::Recipe(_) => IdKind::Recipe,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Object::Item(v) => v.id(),
            Object::Fluid(v) => v.id(),
            Object::Group(v) => v.id(),
            Object::Recipe(v) => v.id(),
        }
    }

    pub fn pointer(&self) -> Pointer {
        match self {
            Object::Item(v) => v.pointer(),
            Object::Fluid(v) => v.pointer(),
            Object::Group(v) => v.pointer(),
            Object::Recipe(v) => v.pointer(),
        }
    }

    pub fn bits(&self) -> IndexBits {
        match self {
            Object::Item(v) => v.bits(),
            Object::Fluid(v) => v.bits(),
            Object::Group(v) => v.bits(),
            Object::Recipe(v) => v.bits(),
        }
    }

    pub fn same_instance(&self, other: &Object<'_>) -> bool {
        match (self, other) {
            (Object::Item(a), Object::Item(b)) => Rc::ptr_eq(a.node(), b.node()),
            (Object::Fluid(a), Object::Fluid(b)) => Rc::ptr_eq(a.node(), b.node()),
            (Object::Group(a), Object::Group(b)) => Rc::ptr_eq(a.node(), b.node()),
            (Object::Recipe(a), Object::Recipe(b)) => Rc::ptr_eq(a.node(), b.node()),
            _ => false,
        }
    }

    pub fn as_item(&self) -> Option<&Item<'a>> {
        match self {
            Object::Item(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_fluid(&self) -> Option<&Fluid<'a>> {
        match self {
            Object::Fluid(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group<'a>> {
        match self {
            Object::Group(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_recipe(&self) -> Option<&Recipe<'a>> {
        match self {
            Object::Recipe(v) => Some(v),
            _ => None,
        }
    }
}
