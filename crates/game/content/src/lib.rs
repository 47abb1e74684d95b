//! Compendium and configuration loaders.
//!
//! This crate is the only place content touches the filesystem:
//! - Compendium entries (features, skills) from JSON, one bad entry never
//!   aborts the rest
//! - Compendium write-back from the loaded registry
//! - Engine configuration from TOML
//!
//! Parsing of individual entries lives in `vtt-core`; this crate handles
//! files, directories and error reporting around it.

pub mod loaders;

pub use loaders::{
    CompendiumFile, CompendiumLoader, CompendiumWriter, ConfigLoader, ContentFactory, LoadReport,
    LoadResult, SkippedEntry,
};
