//! Entities living on a board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Body, EntityId, Item, ItemId, PlayerId, Tick, Vec3};
use crate::feature::FeatureHolder;
use crate::skill::ActiveSkill;
use crate::stats::StatBlock;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Creature,
    Prop,
    Door,
    Light,
    /// An item lying on the board rather than carried.
    Item,
}

/// How an entity takes damage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Vitals {
    /// Part-based anatomy; damage becomes injuries.
    Body(Body),
    /// A single pool, for doors and props.
    Health { current: f32, max: f32 },
    /// Cannot be damaged.
    #[default]
    None,
}

impl Vitals {
    pub fn health(max: f32) -> Self {
        Self::Health { current: max, max }
    }

    pub fn body(&self) -> Option<&Body> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }

    /// Flat health, or the root part's health for bodies.
    pub fn current_health(&self) -> Option<f32> {
        match self {
            Self::Body(body) => body.health(&Default::default()),
            Self::Health { current, .. } => Some(*current),
            Self::None => None,
        }
    }

    pub fn is_dead(&self) -> bool {
        match self {
            Self::Body(body) => body.is_dead(),
            Self::Health { current, .. } => *current <= 0.0,
            Self::None => false,
        }
    }
}

/// Node of an entity's skill tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTreeEntry {
    pub id: String,
    /// Compendium id of the granted skill.
    pub skill: String,
    pub unlocked: bool,
}

impl SkillTreeEntry {
    pub fn new(id: impl Into<String>, skill: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skill: skill.into(),
            unlocked: false,
        }
    }

    pub fn unlocked(mut self) -> Self {
        self.unlocked = true;
        self
    }
}

/// A simulated object owned by a [`Board`](super::Board).
#[derive(Clone, Debug)]
pub struct Entity {
    /// Assigned by the board on spawn.
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub owner: Option<PlayerId>,
    /// Hidden entities are only seen by game masters and themselves.
    pub visible: bool,
    pub position: Vec3,
    /// Index into the board's floors.
    pub floor: usize,
    pub stats: StatBlock,
    pub features: FeatureHolder,
    pub vitals: Vitals,
    pub skill_tree: Vec<SkillTreeEntry>,
    pub active_skills: Vec<ActiveSkill>,
    /// Skill id to the tick its cooldown ends.
    pub cooldowns: BTreeMap<String, Tick>,
    pub(crate) items: Vec<Item>,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::default(),
            kind,
            name: name.into(),
            owner: None,
            visible: true,
            position: Vec3::ZERO,
            floor: 0,
            stats: StatBlock::new(),
            features: FeatureHolder::new(),
            vitals: Vitals::None,
            skill_tree: Vec::new(),
            active_skills: Vec::new(),
            cooldowns: BTreeMap::new(),
            items: Vec::new(),
        }
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_stats(mut self, stats: StatBlock) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_skill_tree_entry(mut self, entry: SkillTreeEntry) -> Self {
        self.skill_tree.push(entry);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn body(&self) -> Option<&Body> {
        self.vitals.body()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn skill_tree_entry(&self, id: &str) -> Option<&SkillTreeEntry> {
        self.skill_tree.iter().find(|entry| entry.id == id)
    }

    pub fn is_dead(&self) -> bool {
        self.vitals.is_dead()
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            owner: self.owner,
            visible: self.visible,
            position: self.position,
            floor: self.floor,
            stats: self.stats.values(),
            features: self
                .features
                .iter()
                .map(|entry| FeatureState {
                    id: entry.feature.id().to_string(),
                    enabled: entry.enabled,
                    hidden: entry.feature.hidden(),
                })
                .collect(),
            vitals: self.vitals.clone(),
            items: self
                .items
                .iter()
                .map(|item| ItemSnapshot {
                    id: item.id,
                    name: item.name.clone(),
                    equipped: item.equipped.clone(),
                    features: item
                        .features
                        .iter()
                        .map(|entry| entry.feature.id().to_string())
                        .collect(),
                })
                .collect(),
            active_skills: self
                .active_skills
                .iter()
                .map(|active| (active.data.skill.id().to_string(), active.data.instance))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureState {
    pub id: String,
    pub enabled: bool,
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub equipped: Option<String>,
    pub features: Vec<String>,
}

/// Serializable copy of an entity for observers on other threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub owner: Option<PlayerId>,
    pub visible: bool,
    pub position: Vec3,
    pub floor: usize,
    pub stats: BTreeMap<String, f32>,
    pub features: Vec<FeatureState>,
    pub vitals: Vitals,
    pub items: Vec<ItemSnapshot>,
    /// `(skill id, instance)` of running skills.
    pub active_skills: Vec<(String, u64)>,
}

impl EntitySnapshot {
    /// Copy with hidden features removed, for viewers other than the owner.
    pub fn redacted(mut self) -> Self {
        self.features.retain(|feature| !feature.hidden);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::DamageType;
    use crate::state::BodyPartPath;

    #[test]
    fn body_vitals_report_root_health() {
        let mut vitals = Vitals::Body(Body::humanoid(10.0));
        assert_eq!(vitals.current_health(), Some(10.0));
        if let Some(body) = vitals.body_mut() {
            body.injure(&BodyPartPath::root(), DamageType::Fire, 4.0);
        }
        assert_eq!(vitals.current_health(), Some(6.0));
        assert!(!vitals.is_dead());
    }

    #[test]
    fn flat_health_dies_at_zero() {
        assert!(Vitals::Health { current: 0.0, max: 3.0 }.is_dead());
        assert!(!Vitals::None.is_dead());
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(EntityKind::Creature.to_string(), "creature");
        assert_eq!("door".parse::<EntityKind>().ok(), Some(EntityKind::Door));
    }
}
