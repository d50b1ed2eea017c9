//! Data-driven configuration for filler engines.
//!
//! Reads engine settings and pattern recipe tables from RON, TOML or JSON
//! files, with the format picked by file extension.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, FillerData, load_engine_config, load_filler_data};
