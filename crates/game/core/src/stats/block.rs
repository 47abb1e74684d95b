use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::modifier::StatModifier;
use super::stat::{Stat, Upsert};

/// Change raised by a [`StatBlock`] mutation, consumed by the network layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StatChange {
    BaseChanged {
        stat: String,
        value: f32,
    },
    ModifierAdded {
        stat: String,
        modifier: StatModifier,
    },
    ModifierUpdated {
        stat: String,
        modifier: StatModifier,
    },
    ModifierRemoved {
        stat: String,
        id: String,
    },
    BoundsChanged {
        stat: String,
        min: Option<f32>,
        max: Option<f32>,
    },
}

/// Every stat of an entity, keyed by name.
///
/// Setting a modifier on a stat that does not exist yet creates it with a
/// zero base, so features can target stats the entity has never declared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatBlock {
    stats: BTreeMap<String, Stat>,
    changes: Vec<StatChange>,
}

impl StatBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, name: impl Into<String>, base: f32) -> Self {
        self.set_base(name, base);
        self.changes.clear();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.stats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stats.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stat)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Final value of `name`, or `None` when the entity lacks the stat.
    pub fn value(&self, name: &str) -> Option<f32> {
        self.stats.get(name).map(Stat::final_value)
    }

    pub fn value_or(&self, name: &str, default: f32) -> f32 {
        self.value(name).unwrap_or(default)
    }

    pub fn set_base(&mut self, name: impl Into<String>, value: f32) {
        let name = name.into();
        let created = !self.stats.contains_key(&name);
        let stat = self.stats.entry(name.clone()).or_default();
        if stat.set_base(value) || created {
            self.changes.push(StatChange::BaseChanged { stat: name, value });
        }
    }

    pub fn set_bounds(&mut self, name: impl Into<String>, min: Option<f32>, max: Option<f32>) {
        let name = name.into();
        let stat = self.stats.entry(name.clone()).or_default();
        if stat.set_bounds(min, max) {
            self.changes.push(StatChange::BoundsChanged {
                stat: name,
                min,
                max,
            });
        }
    }

    /// Inserts or replaces the modifier with the same id.
    pub fn set_modifier(&mut self, name: impl Into<String>, modifier: StatModifier) {
        let name = name.into();
        let stat = self.stats.entry(name.clone()).or_default();
        let change = match stat.upsert(modifier.clone()) {
            Upsert::Added => StatChange::ModifierAdded {
                stat: name,
                modifier,
            },
            Upsert::Updated => StatChange::ModifierUpdated {
                stat: name,
                modifier,
            },
            Upsert::Unchanged => return,
        };
        self.changes.push(change);
    }

    /// Removes a modifier; unknown stats or ids are a no-op.
    pub fn remove_modifier(&mut self, name: &str, id: &str) -> bool {
        let Some(stat) = self.stats.get_mut(name) else {
            return false;
        };
        if stat.remove(id).is_none() {
            return false;
        }
        self.changes.push(StatChange::ModifierRemoved {
            stat: name.to_string(),
            id: id.to_string(),
        });
        true
    }

    /// Final values of every stat, for snapshots and scripts.
    pub fn values(&self) -> BTreeMap<String, f32> {
        self.stats
            .iter()
            .map(|(name, stat)| (name.clone(), stat.final_value()))
            .collect()
    }

    pub fn drain_changes(&mut self) -> Vec<StatChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ModifierKind;

    #[test]
    fn modifier_on_missing_stat_creates_it() {
        let mut block = StatBlock::new();
        block.set_modifier("armor", StatModifier::flat("shield", 2.0));
        assert_eq!(block.value("armor"), Some(2.0));
    }

    #[test]
    fn mutations_are_journaled() {
        let mut block = StatBlock::new().with_base("strength", 10.0);
        block.set_base("strength", 12.0);
        block.set_modifier("strength", StatModifier::flat("belt", 1.0));
        block.set_modifier("strength", StatModifier::flat("belt", 2.0));
        block.set_modifier("strength", StatModifier::flat("belt", 2.0));
        block.remove_modifier("strength", "belt");
        block.remove_modifier("strength", "belt");
        block.set_bounds("strength", Some(0.0), None);

        let changes = block.drain_changes();
        assert_eq!(changes.len(), 5);
        assert!(matches!(changes[0], StatChange::BaseChanged { value, .. } if value == 12.0));
        assert!(matches!(changes[1], StatChange::ModifierAdded { .. }));
        assert!(matches!(changes[2], StatChange::ModifierUpdated { .. }));
        assert!(matches!(changes[3], StatChange::ModifierRemoved { .. }));
        assert!(matches!(changes[4], StatChange::BoundsChanged { .. }));
        assert!(block.drain_changes().is_empty());
    }

    #[test]
    fn values_snapshot_uses_final_values() {
        let mut block = StatBlock::new().with_base("speed", 10.0);
        block.set_modifier(
            "speed",
            StatModifier::new("slow", 0.5, ModifierKind::Multiplier),
        );
        assert_eq!(block.values().get("speed"), Some(&5.0));
    }
}
