//! Data-driven modpack loading: RON / TOML / JSON files in, core model out.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, build_dir, load_config, load_model};
