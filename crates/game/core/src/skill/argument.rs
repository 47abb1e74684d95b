//! Arguments bound to a skill instance.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::refs::{BodyPartRef, EntityRef, ItemRef};
use crate::state::{EntityId, Vec3};
use crate::wire::{WireCodec, WireError, WireReader, WireWriter};

/// Variant tag of a [`SkillArgument`], used to declare what a slot accepts.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum ArgumentType {
    Position = 0,
    BodyPart = 1,
    Entity = 2,
    Item = 3,
    Boolean = 4,
}

impl ArgumentType {
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Wire type name written ahead of an argument payload.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Position => "vtt.skill.argument.Position",
            Self::BodyPart => "vtt.skill.argument.BodyPart",
            Self::Entity => "vtt.skill.argument.Entity",
            Self::Item => "vtt.skill.argument.Item",
            Self::Boolean => "vtt.skill.argument.Boolean",
        }
    }
}

/// A value bound to one argument slot of a skill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SkillArgument {
    Position(Vec3),
    BodyPart(BodyPartRef),
    Entity(EntityRef),
    Item(ItemRef),
    Boolean(bool),
}

impl SkillArgument {
    pub const fn argument_type(&self) -> ArgumentType {
        match self {
            Self::Position(_) => ArgumentType::Position,
            Self::BodyPart(_) => ArgumentType::BodyPart,
            Self::Entity(_) => ArgumentType::Entity,
            Self::Item(_) => ArgumentType::Item,
            Self::Boolean(_) => ArgumentType::Boolean,
        }
    }

    /// Entity this argument points at, if it is a reference into one.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(entity) => Some(entity.id),
            Self::BodyPart(part) => Some(part.entity.id),
            Self::Item(item) => Some(item.holder.id),
            Self::Position(_) | Self::Boolean(_) => None,
        }
    }
}

/// `[typeName:string]` then the variant payload.
impl WireCodec for SkillArgument {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.argument_type().type_name())?;
        match self {
            Self::Position(position) => w.put(position),
            Self::BodyPart(part) => part.encode(w),
            Self::Entity(entity) => entity.encode(w),
            Self::Item(item) => item.encode(w),
            Self::Boolean(value) => w.put(value),
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let type_name = r.take_string()?;
        let kind = <ArgumentType as strum::IntoEnumIterator>::iter()
            .find(|kind| kind.type_name() == type_name)
            .ok_or(WireError::UnknownType(type_name))?;
        Ok(match kind {
            ArgumentType::Position => Self::Position(r.take()?),
            ArgumentType::BodyPart => Self::BodyPart(BodyPartRef::decode(r)?),
            ArgumentType::Entity => Self::Entity(EntityRef::decode(r)?),
            ArgumentType::Item => Self::Item(ItemRef::decode(r)?),
            ArgumentType::Boolean => Self::Boolean(r.take()?),
        })
    }
}
