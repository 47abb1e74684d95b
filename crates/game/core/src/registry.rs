//! Loaded compendium content, shared read-mostly across the process.
//!
//! A [`ContentRegistry`] is built once at startup (or per test) and handed to
//! whatever needs lookups by id. Entries are `Arc`s, so the same feature or
//! skill instance is attached everywhere it is used; scripted content relies
//! on this to be resolved by identity from the wire.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::content::{self, ContentError};
use crate::feature::Feature;
use crate::state::{Item, ItemProperty};
use crate::skill::Skill;

/// Content kinds the registry can look up generically.
pub trait CompendiumEntry {
    fn table(registry: &ContentRegistry) -> &BTreeMap<String, Arc<Self>>;
}

impl CompendiumEntry for dyn Feature {
    fn table(registry: &ContentRegistry) -> &BTreeMap<String, Arc<Self>> {
        &registry.features
    }
}

impl CompendiumEntry for dyn Skill {
    fn table(registry: &ContentRegistry) -> &BTreeMap<String, Arc<Self>> {
        &registry.skills
    }
}

#[derive(Clone, Debug, Default)]
pub struct ContentRegistry {
    features: BTreeMap<String, Arc<dyn Feature>>,
    skills: BTreeMap<String, Arc<dyn Skill>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry `id` of kind `T`.
    pub fn entry<T: CompendiumEntry + ?Sized>(&self, id: &str) -> Option<Arc<T>> {
        T::table(self).get(id).cloned()
    }

    pub fn feature(&self, id: &str) -> Option<Arc<dyn Feature>> {
        self.entry::<dyn Feature>(id)
    }

    pub fn skill(&self, id: &str) -> Option<Arc<dyn Skill>> {
        self.entry::<dyn Skill>(id)
    }

    /// Inserts or replaces a feature under its own id.
    pub fn insert_feature(&mut self, feature: Arc<dyn Feature>) -> Option<Arc<dyn Feature>> {
        self.features.insert(feature.id().to_string(), feature)
    }

    pub fn insert_skill(&mut self, skill: Arc<dyn Skill>) -> Option<Arc<dyn Skill>> {
        self.skills.insert(skill.id().to_string(), skill)
    }

    pub fn remove_feature(&mut self, id: &str) -> Option<Arc<dyn Feature>> {
        self.features.remove(id)
    }

    pub fn remove_skill(&mut self, id: &str) -> Option<Arc<dyn Skill>> {
        self.skills.remove(id)
    }

    /// Parses and registers one authored feature entry.
    pub fn load_feature(&mut self, id: &str, value: &Value) -> Result<Arc<dyn Feature>, ContentError> {
        let feature = content::feature_from_json(id, value)?;
        self.insert_feature(Arc::clone(&feature));
        Ok(feature)
    }

    pub fn load_skill(&mut self, id: &str, value: &Value) -> Result<Arc<dyn Skill>, ContentError> {
        let skill = content::skill_from_json(id, value)?;
        self.insert_skill(Arc::clone(&skill));
        Ok(skill)
    }

    pub fn features(&self) -> impl Iterator<Item = &Arc<dyn Feature>> {
        self.features.values()
    }

    pub fn skills(&self) -> impl Iterator<Item = &Arc<dyn Skill>> {
        self.skills.values()
    }

    pub fn len(&self) -> usize {
        self.features.len() + self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.skills.is_empty()
    }

    /// Builds an item whose equipment properties attach their listed
    /// features. Unknown feature ids are skipped with a warning.
    pub fn build_item(&self, name: impl Into<String>, properties: Vec<ItemProperty>) -> Item {
        let mut item = Item::new(name);
        for property in &properties {
            let ItemProperty::Equipment { features, .. } = property else {
                continue;
            };
            for id in features {
                match self.feature(id) {
                    Some(feature) => {
                        item.features.add(feature, None, Default::default());
                    }
                    None => {
                        tracing::warn!(target: "vtt::content", item = %item.name, feature = %id, "unknown item feature");
                    }
                }
            }
        }
        item.properties = properties;
        item
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn generic_lookup_returns_the_registered_instance() {
        let mut registry = ContentRegistry::new();
        let loaded = registry
            .load_feature(
                "blessed",
                &json!({ "type": "simple", "name": "Blessed", "icon": "", "description": "" }),
            )
            .expect("valid entry");
        let found = registry.entry::<dyn Feature>("blessed").expect("registered");
        assert!(Arc::ptr_eq(&loaded, &found));
        assert!(registry.entry::<dyn Skill>("blessed").is_none());
    }

    #[test]
    fn items_pick_up_known_features() {
        let mut registry = ContentRegistry::new();
        registry
            .load_feature(
                "warm",
                &json!({ "type": "simple", "name": "Warm", "icon": "", "description": "" }),
            )
            .expect("valid entry");
        let cloak = registry.build_item(
            "cloak",
            vec![ItemProperty::Equipment {
                slots: vec!["chest".into()],
                features: vec!["warm".into(), "missing".into()],
            }],
        );
        assert!(cloak.features.has("warm"));
        assert_eq!(cloak.features.len(), 1);
        assert_eq!(cloak.properties.len(), 1);
    }
}
