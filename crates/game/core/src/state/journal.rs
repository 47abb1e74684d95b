//! Change journal consumed by the network layer.
//!
//! The engine records what happened rather than handing out state diffs; a
//! broadcaster drains the journal once per command or tick and forwards each
//! event to interested observers.

use serde::{Deserialize, Serialize};

use super::{BodyPartPath, EntityId, EntityKind, Injury, ItemId};
use crate::feature::FeatureChange;
use crate::refs::FeatureContainerRef;
use crate::stats::StatChange;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    EntityAdded {
        entity: EntityId,
        kind: EntityKind,
        name: String,
    },
    EntityRemoved {
        entity: EntityId,
    },
    Stat {
        entity: EntityId,
        change: StatChange,
    },
    Feature {
        container: FeatureContainerRef,
        change: FeatureChange,
    },
    HealthChanged {
        entity: EntityId,
        old: f32,
        new: f32,
    },
    InjuryAdded {
        entity: EntityId,
        part: BodyPartPath,
        injury: Injury,
    },
    ItemGiven {
        entity: EntityId,
        item: ItemId,
        name: String,
    },
    ItemEquipped {
        entity: EntityId,
        item: ItemId,
        /// `None` when the item was taken off.
        slot: Option<String>,
    },
    SkillStarted {
        entity: EntityId,
        skill: String,
        instance: u64,
        layers: Vec<String>,
    },
    SkillExecuted {
        entity: EntityId,
        skill: String,
        instance: u64,
        layer: String,
    },
    SkillCancelled {
        entity: EntityId,
        skill: String,
        instance: u64,
        interrupted: bool,
    },
    SkillCompleted {
        entity: EntityId,
        skill: String,
        instance: u64,
    },
    AttackResolved {
        attacker: EntityId,
        target: EntityId,
        skill: String,
        hit: bool,
        amount: f32,
        reason: Option<String>,
    },
    /// Free-form feedback line, e.g. "goblin prepares Slash".
    Message {
        entity: Option<EntityId>,
        text: String,
    },
}

impl ChangeEvent {
    /// Entity the event is about, when there is exactly one.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::EntityAdded { entity, .. }
            | Self::EntityRemoved { entity }
            | Self::Stat { entity, .. }
            | Self::HealthChanged { entity, .. }
            | Self::InjuryAdded { entity, .. }
            | Self::ItemGiven { entity, .. }
            | Self::ItemEquipped { entity, .. }
            | Self::SkillStarted { entity, .. }
            | Self::SkillExecuted { entity, .. }
            | Self::SkillCancelled { entity, .. }
            | Self::SkillCompleted { entity, .. } => Some(*entity),
            Self::Feature { container, .. } => Some(container.entity().id),
            Self::AttackResolved { target, .. } => Some(*target),
            Self::Message { entity, .. } => *entity,
        }
    }
}
