//! A loaded arena: validated header, id lookup and typed collections.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::arena::{Pointer, Reader, Shape};
use crate::graph::{
    Category, Fluid, GoodsShape, Group, Item, Object, Recipe, Remap, Searchable, View,
};
use crate::id::IdKind;
use crate::schema::{
    self, FORMAT_VERSION, FieldType, HEADER_WORDS, Layout, SCHEMA, SchemaError, header,
    searchable,
};
use crate::search::Search;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("arena length {len} is not a multiple of 4")]
    Misaligned { len: usize },
    #[error("arena of {len} bytes is shorter than its header")]
    TooShort { len: usize },
    #[error("unsupported arena format version {found} (expected {expected})")]
    UnsupportedVersion { expected: i32, found: i32 },
    #[error("{what} at pointer {pointer} is out of bounds (arena has {len} words)")]
    OutOfBounds {
        what: &'static str,
        pointer: i32,
        len: usize,
    },
    #[error("id '{id}' in the {expected:?} collection has the wrong tag")]
    MismatchedIdTag { expected: IdKind, id: String },
    #[error("id '{id}' names more than one record")]
    DuplicateId { id: String },
    #[error("{what} at pointer {pointer} is not valid UTF-8")]
    InvalidUtf8 { what: &'static str, pointer: i32 },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Read-only handle over one build's arena.
///
/// Lookups and views are lazy and cached, so a `Dataset` is single-threaded;
/// load one per thread from the same bytes for parallel readers.
#[derive(Debug)]
pub struct Dataset {
    reader: Reader,
    ids: FxHashMap<Box<str>, Pointer>,
    remapped: usize,
}

impl Dataset {
    /// Validate `bytes` and index every id.
    pub fn load(bytes: impl Into<Vec<u8>>) -> Result<Dataset, LoadError> {
        let bytes = bytes.into();
        if bytes.len() % 4 != 0 {
            return Err(LoadError::Misaligned { len: bytes.len() });
        }
        if bytes.len() < HEADER_WORDS * 4 {
            return Err(LoadError::TooShort { len: bytes.len() });
        }
        let reader = Reader::new(bytes);
        let found = reader.word(header::VERSION);
        if found != FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                found,
            });
        }
        SCHEMA.validate()?;

        let check = Validator { reader: &reader };
        let mut ids: FxHashMap<Box<str>, Pointer> = FxHashMap::default();
        for (slot, kind, layout) in [
            (header::ITEMS, IdKind::Item, &schema::ITEM),
            (header::FLUIDS, IdKind::Fluid, &schema::FLUID),
            (header::GROUPS, IdKind::Group, &schema::GROUP),
            (header::RECIPES, IdKind::Recipe, &schema::RECIPE),
        ] {
            for ptr in check.collection(slot, layout)? {
                check.text_fields(ptr, layout)?;
                let id = check.string(reader.pointer(ptr, searchable::ID), "id")?;
                if !kind.accepts(&id) {
                    return Err(LoadError::MismatchedIdTag { expected: kind, id });
                }
                if ids.contains_key(id.as_str()) {
                    return Err(LoadError::DuplicateId { id });
                }
                ids.insert(id.into_boxed_str(), ptr);
                if kind == IdKind::Recipe {
                    check.machine(reader.pointer(ptr, schema::recipe::MACHINE))?;
                }
            }
        }
        for ptr in check.collection(header::CATEGORIES, &schema::CATEGORY)? {
            check.text_fields(ptr, &schema::CATEGORY)?;
        }

        let well_known = check.slice(reader.word(header::WELL_KNOWN), "well-known slice")?;
        for ptr in well_known {
            if ptr.is_null() {
                return Err(check.out_of_bounds("well-known object", ptr.0));
            }
            check.record(ptr, searchable::ID + 1)?;
            check.string(reader.pointer(ptr, searchable::ID), "well-known id")?;
        }

        let mut remapped = 0;
        for ptr in check.collection(header::REMAPS, &schema::REMAP)? {
            let from = check.string(reader.pointer(ptr, schema::remap::FROM), "remap id")?;
            if !IdKind::Recipe.accepts(&from) {
                return Err(LoadError::MismatchedIdTag {
                    expected: IdKind::Recipe,
                    id: from,
                });
            }
            let to = reader.pointer(ptr, schema::remap::TO);
            check.record(to, schema::RECIPE.words())?;
            // Live ids win over remap entries.
            if !ids.contains_key(from.as_str()) {
                ids.insert(from.into_boxed_str(), to);
                remapped += 1;
            }
        }

        debug!(
            words = reader.len_words(),
            ids = ids.len(),
            remapped,
            "dataset loaded"
        );
        Ok(Dataset {
            reader,
            ids,
            remapped,
        })
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Raw arena bytes.
    pub fn bytes(&self) -> &[u8] {
        self.reader.bytes()
    }

    /// Number of ids that resolve through the remap table.
    pub fn remap_count(&self) -> usize {
        self.remapped
    }

    /// Whether `id` names a live record (not a remap entry).
    pub fn is_live(&self, id: &str) -> bool {
        self.ids
            .get(id)
            .and_then(|&ptr| Object::at(&self.reader, IdKind::of(id)?, ptr))
            .is_some_and(|obj| obj.id() == id)
    }

    /// Resolve any id, following the remap table for retired recipe ids.
    pub fn get_by_id(&self, id: &str) -> Option<Object<'_>> {
        let kind = IdKind::of(id)?;
        let ptr = *self.ids.get(id)?;
        Object::at(&self.reader, kind, ptr)
    }

    fn lookup<S: Searchable>(&self, id: &str) -> Option<View<'_, S>> {
        if !S::KIND.accepts(id) {
            return None;
        }
        View::at(&self.reader, *self.ids.get(id)?)
    }

    pub fn item(&self, id: &str) -> Option<Item<'_>> {
        self.lookup(id)
    }

    pub fn fluid(&self, id: &str) -> Option<Fluid<'_>> {
        self.lookup(id)
    }

    pub fn group(&self, id: &str) -> Option<Group<'_>> {
        self.lookup(id)
    }

    pub fn recipe(&self, id: &str) -> Option<Recipe<'_>> {
        self.lookup(id)
    }

    /// Pointers of the collection in header slot `slot`.
    pub(crate) fn collection(&self, slot: usize) -> impl Iterator<Item = Pointer> + '_ {
        self.reader
            .slice(Pointer(self.reader.word(slot)))
            .pointers()
    }

    fn views<S: Shape>(&self, slot: usize) -> impl Iterator<Item = View<'_, S>> + '_ {
        self.collection(slot)
            .filter_map(|ptr| View::at(&self.reader, ptr))
    }

    pub fn items(&self) -> impl Iterator<Item = Item<'_>> + '_ {
        self.views(header::ITEMS)
    }

    pub fn fluids(&self) -> impl Iterator<Item = Fluid<'_>> + '_ {
        self.views(header::FLUIDS)
    }

    pub fn groups(&self) -> impl Iterator<Item = Group<'_>> + '_ {
        self.views(header::GROUPS)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category<'_>> + '_ {
        self.views(header::CATEGORIES)
    }

    pub fn recipes(&self) -> impl Iterator<Item = Recipe<'_>> + '_ {
        self.views(header::RECIPES)
    }

    /// Objects pinned by the build, in build order.
    pub fn well_known(&self) -> impl Iterator<Item = Object<'_>> + '_ {
        self.collection(header::WELL_KNOWN)
            .filter_map(|ptr| Object::sniff(&self.reader, ptr))
    }

    /// Stored remap entries.
    pub fn remaps(&self) -> impl Iterator<Item = Remap<'_>> + '_ {
        self.views(header::REMAPS)
    }

    /// Category by name.
    pub fn category(&self, name: &str) -> Option<Category<'_>> {
        self.categories().find(|c| &*c.name() == name)
    }

    /// First commodity with the given mod and internal name.
    pub fn find_goods<S: GoodsShape>(
        &self,
        mod_name: &str,
        internal_name: &str,
    ) -> Option<View<'_, S>> {
        let slot = if S::KIND == IdKind::Fluid {
            header::FLUIDS
        } else {
            header::ITEMS
        };
        self.views::<S>(slot)
            .find(|g| &*g.mod_name() == mod_name && &*g.internal_name() == internal_name)
    }

    /// Start a search. See [`Search`] for matching rules.
    pub fn query(&self, text: &str) -> Search<'_> {
        Search::new(self, text)
    }
}

// ---------------------------------------------------------------------------
// Load-time validation
// ---------------------------------------------------------------------------

struct Validator<'r> {
    reader: &'r Reader,
}

impl Validator<'_> {
    fn out_of_bounds(&self, what: &'static str, pointer: i32) -> LoadError {
        LoadError::OutOfBounds {
            what,
            pointer,
            len: self.reader.len_words(),
        }
    }

    /// Records of `words` words at `ptr` must fit. Null passes.
    fn record(&self, ptr: Pointer, words: usize) -> Result<(), LoadError> {
        if ptr.is_null() {
            return Ok(());
        }
        if ptr.0 < HEADER_WORDS as i32 || ptr.index() + words > self.reader.len_words() {
            return Err(self.out_of_bounds("record", ptr.0));
        }
        Ok(())
    }

    /// Pointers of the slice at `ptr`, checked to fit. Null is empty.
    fn slice(&self, ptr: i32, what: &'static str) -> Result<Vec<Pointer>, LoadError> {
        let ptr = Pointer(ptr);
        if ptr.is_null() {
            return Ok(Vec::new());
        }
        let count = self
            .reader
            .try_word(ptr.index())
            .filter(|c| *c >= 0)
            .ok_or_else(|| self.out_of_bounds(what, ptr.0))? as usize;
        if ptr.index() + 1 + count > self.reader.len_words() {
            return Err(self.out_of_bounds(what, ptr.0));
        }
        Ok(self.reader.slice(ptr).pointers().collect())
    }

    fn collection(&self, slot: usize, layout: &'static Layout) -> Result<Vec<Pointer>, LoadError> {
        let pointers = self.slice(self.reader.word(slot), layout.name)?;
        for &ptr in &pointers {
            if ptr.is_null() {
                return Err(self.out_of_bounds(layout.name, ptr.0));
            }
            self.record(ptr, layout.words())?;
        }
        Ok(pointers)
    }

    /// A required string: non-null, in bounds and valid UTF-8.
    fn string(&self, ptr: Pointer, what: &'static str) -> Result<String, LoadError> {
        if ptr.is_null() {
            return Err(self.out_of_bounds(what, ptr.0));
        }
        self.text(ptr, what).map(str::to_owned)
    }

    fn text(&self, ptr: Pointer, what: &'static str) -> Result<&str, LoadError> {
        let len = self
            .reader
            .try_word(ptr.index())
            .filter(|l| *l >= 0)
            .ok_or_else(|| self.out_of_bounds(what, ptr.0))? as usize;
        if ptr.index() + 1 + len.div_ceil(4) > self.reader.len_words() {
            return Err(self.out_of_bounds(what, ptr.0));
        }
        let start = ptr.word(1) * 4;
        let payload = &self.reader.bytes()[start..start + len];
        std::str::from_utf8(payload).map_err(|_| LoadError::InvalidUtf8 {
            what,
            pointer: ptr.0,
        })
    }

    /// Every non-null string field of the record at `ptr`.
    fn text_fields(&self, ptr: Pointer, layout: &'static Layout) -> Result<(), LoadError> {
        for field in layout.fields.iter().filter(|f| f.ty == FieldType::Str) {
            let s = self.reader.pointer(ptr, field.offset);
            if !s.is_null() {
                self.text(s, field.name)?;
            }
        }
        Ok(())
    }

    /// A recipe's machine record and its metadata keys. Null passes.
    fn machine(&self, ptr: Pointer) -> Result<(), LoadError> {
        if ptr.is_null() {
            return Ok(());
        }
        self.record(ptr, schema::MACHINE.words())?;
        let metadata = self.reader.pointer(ptr, schema::machine::METADATA);
        for entry in self.slice(metadata.0, "metadata slice")? {
            if entry.is_null() {
                return Err(self.out_of_bounds("metadata", entry.0));
            }
            self.record(entry, schema::METADATA.words())?;
            self.string(self.reader.pointer(entry, schema::metadata::KEY), "metadata key")?;
        }
        Ok(())
    }
}
