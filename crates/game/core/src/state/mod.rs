//! Board state: the entity arena, bodies, items and the change journal.
//!
//! Entities are owned by their [`Board`] and addressed by [`EntityId`].
//! Back-references (an item's holder, a feature's container) are ids or
//! reference types resolved through the board, never owning pointers.

pub mod board;
pub mod body;
pub mod common;
pub mod entity;
pub mod item;
pub mod journal;

pub use board::{Board, Floor, Task};
pub use body::{Body, BodyPart, BodyPartPath, EquipmentSlot, Injury, PartFlags};
pub use common::{EntityId, ItemId, PlayerId, Tick, Vec3};
pub use entity::{
    Entity, EntityKind, EntitySnapshot, FeatureState, ItemSnapshot, SkillTreeEntry, Vitals,
};
pub use item::{Item, ItemProperty};
pub use journal::ChangeEvent;
