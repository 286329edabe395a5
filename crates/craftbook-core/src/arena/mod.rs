//! The flat word arena: a little-endian `i32` buffer addressed by word
//! offsets.
//!
//! Strings are a byte-length word followed by zero-padded UTF-8; slices are
//! a count word followed by elements; typed records follow the layouts in
//! [`crate::schema`]. The eight header words hold the format version and the
//! pointers of the top-level collections.

pub mod reader;
pub mod writer;

pub use crate::id::Pointer;
pub use reader::{Node, Reader, Shape, Slice};
pub use writer::{ArenaWriter, EncodeError, PointerTable, Record, RecordWriter};

/// The null pointer.
pub const NULL: Pointer = Pointer::NULL;
