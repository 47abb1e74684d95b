//! Damage types and sources.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::skill::{Skill, SkillArgument};
use crate::state::EntityId;

// ============================================================================
// Damage Type
// ============================================================================

/// Hierarchical damage type.
///
/// ```text
/// Physical ─┬─ Sharp ─┬─ Slash
///           │         └─ Pierce
///           ├─ Blunt
///           └─ Poison
/// Magic ────┬─ Fire
///           ├─ Cold
///           ├─ Lightning
///           └─ Necrotic
/// True
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DamageType {
    Physical,
    Sharp,
    Slash,
    Pierce,
    Blunt,
    Poison,
    Magic,
    Fire,
    Cold,
    Lightning,
    Necrotic,
    /// Ignores resistances; belongs to no family.
    True,
}

impl DamageType {
    pub const fn parent(self) -> Option<DamageType> {
        match self {
            Self::Sharp | Self::Blunt | Self::Poison => Some(Self::Physical),
            Self::Slash | Self::Pierce => Some(Self::Sharp),
            Self::Fire | Self::Cold | Self::Lightning | Self::Necrotic => Some(Self::Magic),
            Self::Physical | Self::Magic | Self::True => None,
        }
    }

    /// This type followed by each ancestor, most specific first.
    pub fn lineage(self) -> impl Iterator<Item = DamageType> {
        std::iter::successors(Some(self), |ty| ty.parent())
    }

    /// True when `self` is `ancestor` or derives from it.
    pub fn is(self, ancestor: DamageType) -> bool {
        self.lineage().any(|ty| ty == ancestor)
    }
}

// ============================================================================
// Damage Source
// ============================================================================

/// Everything known about where a hit came from.
#[derive(Clone, Debug)]
pub struct DamageSource {
    pub damage_type: DamageType,
    pub attacker: Option<EntityId>,
    /// Entity that physically made contact; differs from the attacker for
    /// thrown or projected attacks.
    pub contact: Option<EntityId>,
    pub skill: Option<Arc<dyn Skill>>,
    pub args: Vec<SkillArgument>,
}

impl DamageSource {
    /// Damage with no attacker, such as a condition ticking.
    pub fn environmental(damage_type: DamageType) -> Self {
        Self {
            damage_type,
            attacker: None,
            contact: None,
            skill: None,
            args: Vec::new(),
        }
    }

    pub fn from_attacker(damage_type: DamageType, attacker: EntityId) -> Self {
        Self {
            attacker: Some(attacker),
            contact: Some(attacker),
            ..Self::environmental(damage_type)
        }
    }

    /// Contact entity, falling back to the attacker.
    pub fn contact_entity(&self) -> Option<EntityId> {
        self.contact.or(self.attacker)
    }

    /// Whether the skill behind this damage carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.skill
            .as_ref()
            .is_some_and(|skill| skill.meta().tags.contains(tag))
    }
}
