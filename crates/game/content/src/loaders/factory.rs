//! Content factory for loading everything a board needs from one directory.

use std::path::{Path, PathBuf};

use vtt_core::{ContentRegistry, EngineConfig};

use crate::loaders::{CompendiumLoader, CompendiumWriter, ConfigLoader, LoadReport, LoadResult};

/// Content factory that loads game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── engine.toml       (optional)
/// └── compendium.json
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub const CONFIG_FILE: &'static str = "engine.toml";
    pub const COMPENDIUM_FILE: &'static str = "compendium.json";

    /// Creates a new content factory pointing to a data directory.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Path to the directory containing data files
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load engine configuration, falling back to defaults when the file is absent.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join(Self::CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(target: "vtt::content", path = %path.display(), "no engine config, using defaults");
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the compendium into a fresh registry.
    pub fn load_compendium(&self) -> LoadResult<(ContentRegistry, LoadReport)> {
        CompendiumLoader::load(&self.data_dir.join(Self::COMPENDIUM_FILE))
    }

    pub fn save_compendium(&self, registry: &ContentRegistry) -> LoadResult<()> {
        CompendiumWriter::save(registry, &self.data_dir.join(Self::COMPENDIUM_FILE))
    }
}
