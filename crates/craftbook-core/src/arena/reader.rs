//! Read side of the arena: primitive reads plus memoized materialization.
//!
//! Strings and typed nodes are built at most once per pointer and handed out
//! as `Rc`s, so two reads of the same pointer observe the same instance.
//! Reads past the end of the buffer are invariant violations and panic with
//! the offending pointer; [`Reader::try_word`] is the non-panicking probe
//! used while validating a freshly loaded buffer.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::id::Pointer;
use crate::index::IndexBits;
use crate::schema::{Layout, searchable};

#[cold]
#[inline(never)]
fn out_of_bounds(what: &str, index: usize, len: usize) -> ! {
    panic!("arena read of {what} at word {index} is out of bounds (arena has {len} words)")
}

#[cold]
#[inline(never)]
fn invalid_utf8(index: usize) -> ! {
    panic!("arena string at word {index} is not valid UTF-8")
}

// ---------------------------------------------------------------------------
// Shapes and nodes
// ---------------------------------------------------------------------------

/// A record type: its layout plus whatever per-instance cache its typed
/// view wants to keep.
pub trait Shape: 'static {
    const LAYOUT: &'static Layout;
    type Cache: Default + 'static;
}

/// A materialized record. Holds the decoded id of searchable records and
/// the shape's lazy cache.
#[derive(Debug)]
pub struct Node<S: Shape> {
    ptr: Pointer,
    id: Option<Rc<str>>,
    cache: S::Cache,
}

impl<S: Shape> Node<S> {
    pub fn pointer(&self) -> Pointer {
        self.ptr
    }

    pub fn id(&self) -> Option<&Rc<str>> {
        self.id.as_ref()
    }

    pub fn cache(&self) -> &S::Cache {
        &self.cache
    }
}

// ---------------------------------------------------------------------------
// Slice view
// ---------------------------------------------------------------------------

/// Zero-copy view of a counted slice's elements.
#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    bytes: &'a [u8],
}

impl<'a> Slice<'a> {
    pub const EMPTY: Slice<'static> = Slice { bytes: &[] };

    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<i32> {
        let b = self.bytes.get(i * 4..i * 4 + 4)?;
        Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn iter(self) -> impl Iterator<Item = i32> + 'a {
        self.bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn pointers(self) -> impl Iterator<Item = Pointer> + 'a {
        self.iter().map(Pointer)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

pub struct Reader {
    bytes: Vec<u8>,
    strings: RefCell<FxHashMap<Pointer, Rc<str>>>,
    objects: RefCell<FxHashMap<(Pointer, TypeId), Rc<dyn Any>>>,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("words", &self.len_words())
            .field("strings", &self.strings.borrow().len())
            .field("objects", &self.objects.borrow().len())
            .finish()
    }
}

impl Reader {
    /// Wrap a buffer. The caller guarantees it is word aligned.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            strings: RefCell::default(),
            objects: RefCell::default(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len_words(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn try_word(&self, index: usize) -> Option<i32> {
        let start = index.checked_mul(4)?;
        let b = self.bytes.get(start..start.checked_add(4)?)?;
        Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn word(&self, index: usize) -> i32 {
        match self.try_word(index) {
            Some(w) => w,
            None => out_of_bounds("int", index, self.len_words()),
        }
    }

    /// Field `offset` of the record at `ptr`.
    pub fn field(&self, ptr: Pointer, offset: usize) -> i32 {
        self.word(ptr.word(offset))
    }

    pub fn pointer(&self, ptr: Pointer, offset: usize) -> Pointer {
        Pointer(self.field(ptr, offset))
    }

    /// Little-endian `f64` occupying words `index` and `index + 1`.
    pub fn double(&self, index: usize) -> f64 {
        let start = index * 4;
        match self.bytes.get(start..start + 8) {
            Some(b) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                f64::from_le_bytes(raw)
            }
            None => out_of_bounds("double", index, self.len_words()),
        }
    }

    /// Index bits at the start of a searchable record.
    pub fn bits(&self, ptr: Pointer) -> IndexBits {
        let base = ptr.word(searchable::BITS);
        IndexBits::from_words([
            self.word(base),
            self.word(base + 1),
            self.word(base + 2),
            self.word(base + 3),
        ])
    }

    /// Decode the string record at `ptr`, once. `None` for null.
    pub fn string(&self, ptr: Pointer) -> Option<Rc<str>> {
        let ptr = ptr.non_null()?;
        if let Some(s) = self.strings.borrow().get(&ptr) {
            return Some(Rc::clone(s));
        }
        let len = self.word(ptr.index()) as usize;
        let start = ptr.word(1) * 4;
        let payload = match self.bytes.get(start..start.saturating_add(len)) {
            Some(p) => p,
            None => out_of_bounds("string", ptr.index(), self.len_words()),
        };
        let s: Rc<str> = match std::str::from_utf8(payload) {
            Ok(s) => Rc::from(s),
            Err(_) => invalid_utf8(ptr.index()),
        };
        self.strings.borrow_mut().insert(ptr, Rc::clone(&s));
        Some(s)
    }

    /// String stored in field `offset` of the record at `ptr`.
    pub fn string_field(&self, ptr: Pointer, offset: usize) -> Option<Rc<str>> {
        self.string(self.pointer(ptr, offset))
    }

    /// The counted slice at `ptr`; null reads as empty.
    pub fn slice(&self, ptr: Pointer) -> Slice<'_> {
        let Some(ptr) = ptr.non_null() else {
            return Slice::EMPTY;
        };
        let count = self.word(ptr.index()).max(0) as usize;
        let start = ptr.word(1) * 4;
        match self.bytes.get(start..start.saturating_add(count * 4)) {
            Some(bytes) => Slice { bytes },
            None => out_of_bounds("slice", ptr.index(), self.len_words()),
        }
    }

    pub fn slice_field(&self, ptr: Pointer, offset: usize) -> Slice<'_> {
        self.slice(self.pointer(ptr, offset))
    }

    /// Materialize the record at `ptr` as `S`, or return the node built by
    /// an earlier call. `None` for null.
    pub fn object<S: Shape>(&self, ptr: Pointer) -> Option<Rc<Node<S>>> {
        let ptr = ptr.non_null()?;
        let key = (ptr, TypeId::of::<Node<S>>());
        if let Some(node) = self.cached::<S>(&key) {
            return Some(node);
        }

        let end = ptr.word(S::LAYOUT.words());
        if end > self.len_words() {
            out_of_bounds(S::LAYOUT.name, ptr.index(), self.len_words());
        }
        let id = if S::LAYOUT.searchable {
            self.string_field(ptr, searchable::ID)
        } else {
            None
        };
        let node: Rc<dyn Any> = Rc::new(Node::<S> {
            ptr,
            id,
            cache: S::Cache::default(),
        });

        let stored = Rc::clone(self.objects.borrow_mut().entry(key).or_insert(node));
        stored.downcast::<Node<S>>().ok()
    }

    fn cached<S: Shape>(&self, key: &(Pointer, TypeId)) -> Option<Rc<Node<S>>> {
        let objects = self.objects.borrow();
        let node = objects.get(key)?;
        Rc::clone(node).downcast::<Node<S>>().ok()
    }

    /// Number of nodes materialized so far.
    pub fn materialized(&self) -> usize {
        self.objects.borrow().len()
    }
}
