//! Craftbook Core -- a compact, pointer-linked recipe dataset.
//!
//! A modpack export (items, fluids, ore-dictionary groups, recipe categories
//! and recipes) is compiled once into a flat arena of little-endian 32-bit
//! words. Clients load that arena and navigate it lazily: every record is
//! decoded on first access and the resulting view is shared from then on.
//!
//! # Build Pipeline
//!
//! [`build::build`] turns a [`model::Model`] into arena bytes:
//!
//! 1. **Filter** -- Drop banned commodities and everything referring to them.
//! 2. **Text fix** -- Replace private-use font glyphs in display strings.
//! 3. **Conflicts** -- Compute programmed-circuit conflict masks.
//! 4. **Remap** -- Match recipes against the previous build by fingerprint.
//! 5. **Encode** -- Lay out records, patch back-references, write the header.
//!
//! # Reading
//!
//! ```rust,ignore
//! let dataset = Dataset::load(bytes)?;
//! let widget = dataset.item("i:mod:widget").unwrap();
//! for recipe in widget.production() {
//!     println!("{} <- {}", widget.name(), recipe.id());
//! }
//! for hit in dataset.query("steel plate").iter() {
//!     println!("{}", hit.id());
//! }
//! ```
//!
//! # Key Types
//!
//! - [`dataset::Dataset`] -- Validated arena with id lookup and search.
//! - [`arena::Reader`] -- Word-level access plus the shared object cache.
//! - [`graph`] -- Typed views: `Item`, `Fluid`, `Group`, `Category`, `Recipe`.
//! - [`index::IndexBits`] -- 128-bit n-gram prefilter stored per searchable.
//! - [`search::Search`] -- Token and `@mod` query over the whole dataset.
//! - [`remap`] -- Recipe fingerprints and cross-build id remapping.
//! - [`schema`] -- Record layouts shared by the writer and the reader.

pub mod arena;
pub mod build;
pub mod config;
pub mod conflicts;
pub mod dataset;
pub mod filter;
pub mod graph;
pub mod id;
pub mod index;
pub mod model;
pub mod remap;
pub mod schema;
pub mod search;
pub mod text;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use build::{BuildError, BuildOutput, BuildReport, build};
pub use config::BuildConfig;
pub use dataset::{Dataset, LoadError};
pub use model::Model;
