//! Compendium JSON loading and saving.
//!
//! # File Shape
//!
//! ```json
//! {
//!   "features": { "<id>": { "type": "condition", "ticks": 3 } },
//!   "skills":   { "<id>": { "type": "attack", "execute": "..." } }
//! }
//! ```
//!
//! Entries are parsed by `vtt-core`. A malformed entry is logged and skipped;
//! only an unreadable file or invalid top-level JSON fails the whole load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vtt_core::ContentRegistry;

use crate::loaders::{LoadResult, read_file};

/// Top-level compendium document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompendiumFile {
    pub features: BTreeMap<String, Value>,
    pub skills: BTreeMap<String, Value>,
}

/// Entry rejected during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub id: String,
    pub reason: String,
}

/// Outcome of a compendium load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub features: usize,
    pub skills: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.features + self.skills
    }
}

/// Loader for compendium files.
pub struct CompendiumLoader;

impl CompendiumLoader {
    /// Load every entry of `path` into a fresh registry.
    pub fn load(path: &Path) -> LoadResult<(ContentRegistry, LoadReport)> {
        let mut registry = ContentRegistry::new();
        let report = Self::load_into(path, &mut registry)?;
        Ok((registry, report))
    }

    /// Load `path` on top of `registry`; entries with an existing id replace it.
    pub fn load_into(path: &Path, registry: &mut ContentRegistry) -> LoadResult<LoadReport> {
        let content = read_file(path)?;
        let file: CompendiumFile = serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse compendium {}: {}", path.display(), e)
        })?;
        let report = Self::apply(file, registry);
        tracing::info!(
            target: "vtt::content",
            path = %path.display(),
            features = report.features,
            skills = report.skills,
            skipped = report.skipped.len(),
            "compendium loaded"
        );
        Ok(report)
    }

    /// Register every entry of an already parsed document.
    pub fn apply(file: CompendiumFile, registry: &mut ContentRegistry) -> LoadReport {
        let mut report = LoadReport::default();

        for (id, value) in &file.features {
            match registry.load_feature(id, value) {
                Ok(_) => report.features += 1,
                Err(err) => Self::skip(&mut report, id, err.to_string()),
            }
        }
        for (id, value) in &file.skills {
            match registry.load_skill(id, value) {
                Ok(_) => report.skills += 1,
                Err(err) => Self::skip(&mut report, id, err.to_string()),
            }
        }
        report
    }

    fn skip(report: &mut LoadReport, id: &str, reason: String) {
        tracing::warn!(target: "vtt::content", entry = %id, %reason, "skipping compendium entry");
        report.skipped.push(SkippedEntry {
            id: id.to_string(),
            reason,
        });
    }
}

/// Writes a registry back to its authoring form.
pub struct CompendiumWriter;

impl CompendiumWriter {
    pub fn to_file(registry: &ContentRegistry) -> CompendiumFile {
        CompendiumFile {
            features: registry
                .features()
                .map(|feature| (feature.id().to_string(), feature.to_json()))
                .collect(),
            skills: registry
                .skills()
                .map(|skill| (skill.id().to_string(), skill.to_json()))
                .collect(),
        }
    }

    /// Save `registry` as pretty-printed JSON at `path`.
    pub fn save(registry: &ContentRegistry, path: &Path) -> LoadResult<()> {
        let json = serde_json::to_string_pretty(&Self::to_file(registry))?;
        std::fs::write(path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write compendium {}: {}", path.display(), e))
    }
}
