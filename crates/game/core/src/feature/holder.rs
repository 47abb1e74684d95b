//! Feature container embedded in entities and items.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Feature, FeatureData};
use crate::state::Tick;
use crate::stats::{StatBlock, StatModifier};

/// Lifecycle change of an attached feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FeatureChange {
    Attached { feature: String },
    Detached { feature: String },
    Enabled { feature: String },
    Disabled { feature: String },
}

#[derive(Clone, Debug)]
pub struct FeatureEntry {
    pub feature: Arc<dyn Feature>,
    pub enabled: bool,
}

/// Ordered set of attached features plus their shared data store.
///
/// Features are kept in attach order; hooks dispatch in this order.
/// A feature is attached at most once (by id).
#[derive(Clone, Debug, Default)]
pub struct FeatureHolder {
    entries: Vec<FeatureEntry>,
    data: FeatureData,
    changes: Vec<FeatureChange>,
}

impl FeatureHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stat modifier id a feature contributes under, unique per feature.
    pub fn modifier_id(feature: &str, modifier: &str) -> String {
        format!("{feature}/{modifier}")
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.feature.id() == id)
    }

    /// Attaches and enables `feature`. Returns false if already attached.
    pub fn add(
        &mut self,
        feature: Arc<dyn Feature>,
        stats: Option<&mut StatBlock>,
        tick: Tick,
    ) -> bool {
        let id = feature.id().to_string();
        if self.has(&id) {
            return false;
        }
        self.entries.push(FeatureEntry {
            feature,
            enabled: false,
        });
        self.changes.push(FeatureChange::Attached {
            feature: id.clone(),
        });
        self.enable(&id, stats, tick);
        true
    }

    /// Detaches `id`, disabling it first. Returns false if not attached.
    pub fn remove(&mut self, id: &str, stats: Option<&mut StatBlock>) -> bool {
        if !self.has(id) {
            return false;
        }
        self.disable(id, stats);
        let Some(index) = self.position(id) else {
            return false;
        };
        self.entries.remove(index);
        self.changes.push(FeatureChange::Detached {
            feature: id.to_string(),
        });
        true
    }

    /// Enables an attached feature. Returns false if missing or already on.
    pub fn enable(&mut self, id: &str, stats: Option<&mut StatBlock>, tick: Tick) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        if entry.enabled {
            return false;
        }
        entry.enabled = true;
        let feature = Arc::clone(&entry.feature);

        if let Some(stats) = stats {
            for (stat, modifiers) in &feature.meta().modifiers {
                for modifier in modifiers {
                    stats.set_modifier(
                        stat.clone(),
                        StatModifier {
                            id: Self::modifier_id(id, &modifier.id),
                            ..modifier.clone()
                        },
                    );
                }
            }
        }
        feature.on_enable(&mut self.data, tick);
        self.changes.push(FeatureChange::Enabled {
            feature: id.to_string(),
        });
        true
    }

    /// Disables an attached feature. Returns false if missing or already off.
    pub fn disable(&mut self, id: &str, stats: Option<&mut StatBlock>) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        if !entry.enabled {
            return false;
        }
        entry.enabled = false;
        let feature = Arc::clone(&entry.feature);

        if let Some(stats) = stats {
            for (stat, modifiers) in &feature.meta().modifiers {
                for modifier in modifiers {
                    stats.remove_modifier(stat, &Self::modifier_id(id, &modifier.id));
                }
            }
        }
        feature.on_disable(&mut self.data);
        self.changes.push(FeatureChange::Disabled {
            feature: id.to_string(),
        });
        true
    }

    /// Applies the modifiers of every enabled feature to `stats`.
    ///
    /// Used when an item starts lending its features to a wearer.
    pub fn apply_modifiers(&self, stats: &mut StatBlock) {
        for entry in self.entries.iter().filter(|e| e.enabled) {
            let id = entry.feature.id();
            for (stat, modifiers) in &entry.feature.meta().modifiers {
                for modifier in modifiers {
                    stats.set_modifier(
                        stat.clone(),
                        StatModifier {
                            id: Self::modifier_id(id, &modifier.id),
                            ..modifier.clone()
                        },
                    );
                }
            }
        }
    }

    /// Reverse of [`apply_modifiers`](Self::apply_modifiers).
    pub fn strip_modifiers(&self, stats: &mut StatBlock) {
        for entry in self.entries.iter().filter(|e| e.enabled) {
            let id = entry.feature.id();
            for (stat, modifiers) in &entry.feature.meta().modifiers {
                for modifier in modifiers {
                    stats.remove_modifier(stat, &Self::modifier_id(id, &modifier.id));
                }
            }
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Feature>> {
        self.entries
            .iter()
            .find(|e| e.feature.id() == id)
            .map(|e| &e.feature)
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.enabled && e.feature.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureEntry> {
        self.entries.iter()
    }

    /// Snapshot of enabled features in dispatch order.
    pub fn enabled(&self) -> Vec<Arc<dyn Feature>> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.feature))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data(&self) -> &FeatureData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut FeatureData {
        &mut self.data
    }

    pub fn drain_changes(&mut self) -> Vec<FeatureChange> {
        std::mem::take(&mut self.changes)
    }
}
