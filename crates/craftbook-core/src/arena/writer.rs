//! Append-only arena encoder.

use rustc_hash::FxHashMap;

use crate::id::Pointer;
use crate::index::IndexBits;
use crate::schema::{FORMAT_VERSION, FieldType, HEADER_WORDS, Layout, header};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("{kind} '{id}' is referenced before it was written")]
    DanglingReference { kind: &'static str, id: String },
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} id '{id}' does not carry the '{expected}' tag")]
    MismatchedIdTag {
        kind: &'static str,
        id: String,
        expected: char,
    },
    #[error("layout {layout} has no field at word {offset}")]
    UnknownField { layout: &'static str, offset: usize },
    #[error("layout {layout}: field '{field}' is {expected:?}, not {found:?}")]
    FieldType {
        layout: &'static str,
        field: &'static str,
        expected: FieldType,
        found: FieldType,
    },
    #[error("layout {layout}: field '{field}' was never written")]
    MissingField {
        layout: &'static str,
        field: &'static str,
    },
    #[error("arena grew past the addressable range ({words} words)")]
    Overflow { words: usize },
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A fully populated record, ready to append.
#[derive(Debug, Clone)]
pub struct Record {
    layout: &'static Layout,
    words: Vec<i32>,
}

impl Record {
    pub fn layout(&self) -> &'static Layout {
        self.layout
    }
}

/// Fills one record field by field, checking each write against the layout.
#[derive(Debug)]
pub struct RecordWriter {
    layout: &'static Layout,
    words: Vec<i32>,
    filled: Vec<bool>,
}

impl RecordWriter {
    pub fn new(layout: &'static Layout) -> Self {
        let n = layout.words();
        Self {
            layout,
            words: vec![0; n],
            filled: vec![false; layout.fields.len()],
        }
    }

    fn slot(&mut self, offset: usize, found: FieldType) -> Result<&mut [i32], EncodeError> {
        let layout = self.layout;
        let (index, field) = layout
            .fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.offset == offset)
            .ok_or(EncodeError::UnknownField {
                layout: layout.name,
                offset,
            })?;
        if field.ty != found {
            return Err(EncodeError::FieldType {
                layout: layout.name,
                field: field.name,
                expected: field.ty,
                found,
            });
        }
        self.filled[index] = true;
        Ok(&mut self.words[offset..offset + found.words()])
    }

    pub fn bits(&mut self, offset: usize, bits: IndexBits) -> Result<&mut Self, EncodeError> {
        self.slot(offset, FieldType::Bits)?
            .copy_from_slice(&bits.to_words());
        Ok(self)
    }

    pub fn int(&mut self, offset: usize, value: i32) -> Result<&mut Self, EncodeError> {
        self.slot(offset, FieldType::Int)?[0] = value;
        Ok(self)
    }

    pub fn double(&mut self, offset: usize, value: f64) -> Result<&mut Self, EncodeError> {
        let raw = value.to_bits();
        let words = self.slot(offset, FieldType::Double)?;
        words[0] = raw as u32 as i32;
        words[1] = (raw >> 32) as u32 as i32;
        Ok(self)
    }

    pub fn string(&mut self, offset: usize, ptr: Pointer) -> Result<&mut Self, EncodeError> {
        self.slot(offset, FieldType::Str)?[0] = ptr.0;
        Ok(self)
    }

    pub fn slice(&mut self, offset: usize, ptr: Pointer) -> Result<&mut Self, EncodeError> {
        self.slot(offset, FieldType::Slice)?[0] = ptr.0;
        Ok(self)
    }

    pub fn object(&mut self, offset: usize, ptr: Pointer) -> Result<&mut Self, EncodeError> {
        self.slot(offset, FieldType::Object)?[0] = ptr.0;
        Ok(self)
    }

    /// Check every field was written and hand back the record.
    pub fn finish(self) -> Result<Record, EncodeError> {
        if let Some(index) = self.filled.iter().position(|f| !f) {
            return Err(EncodeError::MissingField {
                layout: self.layout.name,
                field: self.layout.fields[index].name,
            });
        }
        Ok(Record {
            layout: self.layout,
            words: self.words,
        })
    }
}

// ---------------------------------------------------------------------------
// Arena writer
// ---------------------------------------------------------------------------

/// Builds the word buffer. The header is reserved up front and filled with
/// [`ArenaWriter::set_header`] once the collections are known.
#[derive(Debug)]
pub struct ArenaWriter {
    words: Vec<i32>,
    strings: FxHashMap<String, Pointer>,
}

impl Default for ArenaWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaWriter {
    pub fn new() -> Self {
        let mut words = vec![0; HEADER_WORDS];
        words[header::VERSION] = FORMAT_VERSION;
        for slot in &mut words[1..] {
            *slot = Pointer::NULL.0;
        }
        Self {
            words,
            strings: FxHashMap::default(),
        }
    }

    /// Words written so far, header included.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.len() <= HEADER_WORDS
    }

    /// Number of distinct strings interned.
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    fn next_pointer(&self, extra: usize) -> Result<Pointer, EncodeError> {
        let end = self.words.len() + extra;
        if i32::try_from(end).is_err() {
            return Err(EncodeError::Overflow { words: end });
        }
        Ok(Pointer(self.words.len() as i32))
    }

    /// Append `s` unless the same bytes were interned before.
    pub fn intern_string(&mut self, s: &str) -> Result<Pointer, EncodeError> {
        if let Some(&ptr) = self.strings.get(s) {
            return Ok(ptr);
        }
        let bytes = s.as_bytes();
        let payload_words = bytes.len().div_ceil(4);
        let ptr = self.next_pointer(1 + payload_words)?;
        self.words.push(bytes.len() as i32);
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.words.push(i32::from_le_bytes(word));
        }
        self.strings.insert(s.to_owned(), ptr);
        Ok(ptr)
    }

    pub fn intern_opt(&mut self, s: Option<&str>) -> Result<Pointer, EncodeError> {
        match s {
            Some(s) => self.intern_string(s),
            None => Ok(Pointer::NULL),
        }
    }

    /// Append a counted slice. Slices are never shared.
    pub fn write_slice(&mut self, elements: &[i32]) -> Result<Pointer, EncodeError> {
        let ptr = self.next_pointer(1 + elements.len())?;
        self.words.push(elements.len() as i32);
        self.words.extend_from_slice(elements);
        Ok(ptr)
    }

    pub fn write_pointers(&mut self, pointers: &[Pointer]) -> Result<Pointer, EncodeError> {
        let ptr = self.next_pointer(1 + pointers.len())?;
        self.words.push(pointers.len() as i32);
        self.words.extend(pointers.iter().map(|p| p.0));
        Ok(ptr)
    }

    /// Append a record, padding one word first if its doubles would
    /// otherwise straddle an 8-byte boundary.
    pub fn write_object(&mut self, record: Record) -> Result<Pointer, EncodeError> {
        if let Some(parity) = record.layout.double_parity() {
            if (self.words.len() + parity) % 2 != 0 {
                self.words.push(0);
            }
        }
        let ptr = self.next_pointer(record.words.len())?;
        self.words.extend_from_slice(&record.words);
        Ok(ptr)
    }

    /// Overwrite a pointer field of a record written earlier.
    pub fn patch(
        &mut self,
        record: Pointer,
        layout: &'static Layout,
        offset: usize,
        value: Pointer,
    ) -> Result<(), EncodeError> {
        let field = layout.field_at(offset).ok_or(EncodeError::UnknownField {
            layout: layout.name,
            offset,
        })?;
        if !field.ty.is_pointer() {
            return Err(EncodeError::FieldType {
                layout: layout.name,
                field: field.name,
                expected: field.ty,
                found: FieldType::Object,
            });
        }
        self.words[record.word(offset)] = value.0;
        Ok(())
    }

    pub fn set_header(&mut self, slot: usize, ptr: Pointer) {
        self.words[slot] = ptr.0;
    }

    /// Serialize to little-endian bytes.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 4);
        for w in self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Pointer table
// ---------------------------------------------------------------------------

/// Maps entity ids to the pointers they were written at.
#[derive(Debug)]
pub struct PointerTable {
    kind: &'static str,
    map: FxHashMap<String, Pointer>,
    order: Vec<Pointer>,
}

impl PointerTable {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            map: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn insert(&mut self, id: &str, ptr: Pointer) -> Result<(), EncodeError> {
        if self.map.contains_key(id) {
            return Err(EncodeError::DuplicateId {
                kind: self.kind,
                id: id.to_owned(),
            });
        }
        self.map.insert(id.to_owned(), ptr);
        self.order.push(ptr);
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<Pointer, EncodeError> {
        self.map
            .get(id)
            .copied()
            .ok_or_else(|| EncodeError::DanglingReference {
                kind: self.kind,
                id: id.to_owned(),
            })
    }

    pub fn resolve_opt(&self, id: Option<&str>) -> Result<Pointer, EncodeError> {
        match id {
            Some(id) => self.resolve(id),
            None => Ok(Pointer::NULL),
        }
    }

    pub fn get(&self, id: &str) -> Option<Pointer> {
        self.map.get(id).copied()
    }

    /// Pointers in insertion order.
    pub fn pointers(&self) -> &[Pointer] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
