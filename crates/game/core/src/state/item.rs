//! Inventory items and their closed set of properties.

use serde::{Deserialize, Serialize};

use super::ItemId;
use crate::feature::FeatureHolder;
use crate::wire::{WireCodec, WireError, WireReader, WireWriter};

/// Capability attached to an item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemProperty {
    /// Wearable in any of `slots`. `features` are compendium ids attached to
    /// the item when it is built from content; they act for the wearer only
    /// while the item is equipped.
    Equipment {
        slots: Vec<String>,
        features: Vec<String>,
    },
    /// Grants `skills` to the wielder and adds `damage_bonus` to its attacks.
    Weapon {
        skills: Vec<String>,
        damage_bonus: f32,
    },
}

impl ItemProperty {
    pub const EQUIPMENT_TYPE_NAME: &'static str = "vtt.item.EquipmentProperty";
    pub const WEAPON_TYPE_NAME: &'static str = "vtt.item.WeaponProperty";

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Equipment { .. } => Self::EQUIPMENT_TYPE_NAME,
            Self::Weapon { .. } => Self::WEAPON_TYPE_NAME,
        }
    }
}

fn put_strings(w: &mut WireWriter, what: &'static str, values: &[String]) -> Result<(), WireError> {
    w.put_count(what, values.len())?;
    values.iter().try_for_each(|value| w.put_str(value))
}

fn take_strings(r: &mut WireReader<'_>) -> Result<Vec<String>, WireError> {
    let count = r.take_count()?;
    (0..count).map(|_| r.take_string()).collect()
}

/// `[typeName:string]` then `{slots}{features}` or `{skills}[bonus:f32]`.
impl WireCodec for ItemProperty {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.type_name())?;
        match self {
            Self::Equipment { slots, features } => {
                put_strings(w, "equipment slots", slots)?;
                put_strings(w, "equipment features", features)
            }
            Self::Weapon {
                skills,
                damage_bonus,
            } => {
                put_strings(w, "weapon skills", skills)?;
                w.put(damage_bonus)
            }
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let type_name = r.take_string()?;
        match type_name.as_str() {
            Self::EQUIPMENT_TYPE_NAME => Ok(Self::Equipment {
                slots: take_strings(r)?,
                features: take_strings(r)?,
            }),
            Self::WEAPON_TYPE_NAME => Ok(Self::Weapon {
                skills: take_strings(r)?,
                damage_bonus: r.take()?,
            }),
            _ => Err(WireError::UnknownType(type_name)),
        }
    }
}

/// Item carried in an entity's inventory.
#[derive(Clone, Debug)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub features: FeatureHolder,
    pub properties: Vec<ItemProperty>,
    /// Slot the item is worn in, if equipped.
    pub equipped: Option<String>,
}

impl Item {
    /// Creates an unnumbered item; the board assigns its id when given.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::default(),
            name: name.into(),
            features: FeatureHolder::new(),
            properties: Vec::new(),
            equipped: None,
        }
    }

    pub fn with_property(mut self, property: ItemProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn is_equipped(&self) -> bool {
        self.equipped.is_some()
    }

    /// Whether an equipment property lists `slot`.
    pub fn fits(&self, slot: &str) -> bool {
        self.properties.iter().any(|property| match property {
            ItemProperty::Equipment { slots, .. } => slots.iter().any(|s| s == slot),
            ItemProperty::Weapon { .. } => false,
        })
    }

    /// Skill ids granted by weapon properties.
    pub fn granted_skills(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter_map(|property| match property {
                ItemProperty::Weapon { skills, .. } => Some(skills),
                ItemProperty::Equipment { .. } => None,
            })
            .flatten()
            .map(String::as_str)
    }

    pub fn damage_bonus(&self) -> f32 {
        self.properties
            .iter()
            .map(|property| match property {
                ItemProperty::Weapon { damage_bonus, .. } => *damage_bonus,
                ItemProperty::Equipment { .. } => 0.0,
            })
            .sum()
    }
}
