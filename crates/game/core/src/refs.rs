//! Network-transmissible handles to live objects.
//!
//! A reference names a board and a path within it. Resolving against a board
//! that no longer holds the target (or a different board) yields `None`, which
//! callers treat as "not found" rather than as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Board, BodyPart, BodyPartPath, Entity, EntityId, Item, ItemId, SkillTreeEntry};
use crate::wire::{WireCodec, WireError, WireReader, WireWriter};

/// `[board:string][id:u32]`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub board: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(board: impl Into<String>, id: EntityId) -> Self {
        Self {
            board: board.into(),
            id,
        }
    }

    pub fn resolve<'b>(&self, board: &'b Board) -> Option<&'b Entity> {
        if self.board != board.name() {
            return None;
        }
        board.entity(self.id)
    }

    pub fn resolve_mut<'b>(&self, board: &'b mut Board) -> Option<&'b mut Entity> {
        if self.board != board.name() {
            return None;
        }
        board.entity_mut(self.id)
    }

    pub fn body_part(&self, path: BodyPartPath) -> BodyPartRef {
        BodyPartRef {
            entity: self.clone(),
            path,
        }
    }

    pub fn item(&self, item: ItemId) -> ItemRef {
        ItemRef {
            holder: self.clone(),
            item,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.board, self.id)
    }
}

impl WireCodec for EntityRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(&self.board)?;
        w.put(&self.id.0)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let board = r.take_string()?;
        let id = EntityId(r.take()?);
        Ok(Self { board, id })
    }
}

/// Entity reference plus the part's child-index path: `[entity][len:u8]{u8}`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyPartRef {
    pub entity: EntityRef,
    pub path: BodyPartPath,
}

impl BodyPartRef {
    pub fn resolve<'b>(&self, board: &'b Board) -> Option<&'b BodyPart> {
        self.entity.resolve(board)?.body()?.part(&self.path)
    }

    /// Health of the part, following the ancestor-death rule.
    pub fn health(&self, board: &Board) -> Option<f32> {
        self.entity.resolve(board)?.body()?.health(&self.path)
    }
}

impl WireCodec for BodyPartRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.entity.encode(w)?;
        w.put_count("body part path", self.path.0.len())?;
        self.path.0.iter().try_for_each(|index| w.put(index))
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let entity = EntityRef::decode(r)?;
        let len = r.take_count()?;
        let path = (0..len).map(|_| r.take::<u8>()).collect::<Result<_, _>>()?;
        Ok(Self {
            entity,
            path: BodyPartPath(path),
        })
    }
}

/// Item in an entity's inventory: `[holder][item:u32]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub holder: EntityRef,
    pub item: ItemId,
}

impl ItemRef {
    pub fn resolve<'b>(&self, board: &'b Board) -> Option<&'b Item> {
        self.holder.resolve(board)?.item(self.item)
    }

    pub fn resolve_mut<'b>(&self, board: &'b mut Board) -> Option<&'b mut Item> {
        self.holder.resolve_mut(board)?.item_mut(self.item)
    }
}

impl WireCodec for ItemRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.holder.encode(w)?;
        w.put(&self.item.0)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let holder = EntityRef::decode(r)?;
        let item = ItemId(r.take()?);
        Ok(Self { holder, item })
    }
}

/// Entry of an entity's skill tree: `[entity][entry:string]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillTreeEntryRef {
    pub entity: EntityRef,
    pub entry: String,
}

impl SkillTreeEntryRef {
    pub fn resolve<'b>(&self, board: &'b Board) -> Option<&'b SkillTreeEntry> {
        self.entity.resolve(board)?.skill_tree_entry(&self.entry)
    }
}

impl WireCodec for SkillTreeEntryRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        self.entity.encode(w)?;
        w.put_str(&self.entry)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let entity = EntityRef::decode(r)?;
        let entry = r.take_string()?;
        Ok(Self { entity, entry })
    }
}

/// What granted a running skill. Leading discriminant byte, then the payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillSourceRef {
    #[default]
    None,
    Item(ItemRef),
    BodyPart(BodyPartRef),
    EquipmentProperty(ItemRef),
    SkillTreeEntry(SkillTreeEntryRef),
}

impl SkillSourceRef {
    const NONE: u8 = 0;
    const ITEM: u8 = 1;
    const BODY_PART: u8 = 2;
    const EQUIPMENT_PROPERTY: u8 = 3;
    const SKILL_TREE_ENTRY: u8 = 4;

    /// Whether the source still exists on `board`. `None` always exists.
    pub fn exists(&self, board: &Board) -> bool {
        match self {
            Self::None => true,
            Self::Item(item) | Self::EquipmentProperty(item) => item.resolve(board).is_some(),
            Self::BodyPart(part) => part.resolve(board).is_some(),
            Self::SkillTreeEntry(entry) => entry.resolve(board).is_some(),
        }
    }
}

impl WireCodec for SkillSourceRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        match self {
            Self::None => w.put(&Self::NONE),
            Self::Item(item) => {
                w.put(&Self::ITEM)?;
                item.encode(w)
            }
            Self::BodyPart(part) => {
                w.put(&Self::BODY_PART)?;
                part.encode(w)
            }
            Self::EquipmentProperty(item) => {
                w.put(&Self::EQUIPMENT_PROPERTY)?;
                item.encode(w)
            }
            Self::SkillTreeEntry(entry) => {
                w.put(&Self::SKILL_TREE_ENTRY)?;
                entry.encode(w)
            }
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        match r.take::<u8>()? {
            Self::NONE => Ok(Self::None),
            Self::ITEM => Ok(Self::Item(ItemRef::decode(r)?)),
            Self::BODY_PART => Ok(Self::BodyPart(BodyPartRef::decode(r)?)),
            Self::EQUIPMENT_PROPERTY => Ok(Self::EquipmentProperty(ItemRef::decode(r)?)),
            Self::SKILL_TREE_ENTRY => Ok(Self::SkillTreeEntry(SkillTreeEntryRef::decode(r)?)),
            value => Err(WireError::UnknownDiscriminant {
                what: "skill source",
                value,
            }),
        }
    }
}

/// Anything that holds features.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureContainerRef {
    Entity(EntityRef),
    Item(ItemRef),
}

impl FeatureContainerRef {
    const ENTITY: u8 = 0;
    const ITEM: u8 = 1;

    /// Entity that owns the container (the item's holder for items).
    pub fn entity(&self) -> &EntityRef {
        match self {
            Self::Entity(entity) => entity,
            Self::Item(item) => &item.holder,
        }
    }
}

impl From<EntityRef> for FeatureContainerRef {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl From<ItemRef> for FeatureContainerRef {
    fn from(item: ItemRef) -> Self {
        Self::Item(item)
    }
}

impl fmt::Display for FeatureContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => write!(f, "{entity}"),
            Self::Item(item) => write!(f, "{}/{}", item.holder, item.item),
        }
    }
}

impl WireCodec for FeatureContainerRef {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        match self {
            Self::Entity(entity) => {
                w.put(&Self::ENTITY)?;
                entity.encode(w)
            }
            Self::Item(item) => {
                w.put(&Self::ITEM)?;
                item.encode(w)
            }
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        match r.take::<u8>()? {
            Self::ENTITY => Ok(Self::Entity(EntityRef::decode(r)?)),
            Self::ITEM => Ok(Self::Item(ItemRef::decode(r)?)),
            value => Err(WireError::UnknownDiscriminant {
                what: "feature container",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::state::{Body, EntityKind, Vitals};

    fn board_with_creature() -> (Board, EntityRef) {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(
            Entity::new(EntityKind::Creature, "goblin")
                .with_vitals(Vitals::Body(Body::humanoid(10.0))),
        );
        let entity = board.entity_ref(id);
        (board, entity)
    }

    #[test]
    fn references_resolve_until_removed() {
        let (mut board, entity) = board_with_creature();
        let hand = entity.body_part(BodyPartPath(vec![1, 0]));
        assert_eq!(
            hand.resolve(&board).map(|p| p.name.as_str()),
            Some("left_hand")
        );

        board.remove_entity(entity.id);
        assert!(entity.resolve(&board).is_none());
        assert!(hand.resolve(&board).is_none());
    }

    #[test]
    fn other_boards_do_not_resolve() {
        let (board, entity) = board_with_creature();
        let foreign = EntityRef::new("elsewhere", entity.id);
        assert!(foreign.resolve(&board).is_none());
    }

    #[test]
    fn skill_source_roundtrip_keeps_variant() {
        let (_, entity) = board_with_creature();
        let sources = [
            SkillSourceRef::None,
            SkillSourceRef::Item(entity.item(ItemId(3))),
            SkillSourceRef::BodyPart(entity.body_part(BodyPartPath(vec![2, 0]))),
            SkillSourceRef::EquipmentProperty(entity.item(ItemId(4))),
            SkillSourceRef::SkillTreeEntry(SkillTreeEntryRef {
                entity: entity.clone(),
                entry: "fireball".into(),
            }),
        ];
        for source in sources {
            let bytes = source.to_bytes().expect("encode");
            assert_eq!(SkillSourceRef::from_bytes(&bytes).expect("decode"), source);
        }
    }

    #[test]
    fn entity_ref_layout_is_board_then_id() {
        let bytes = EntityRef::new("b", EntityId(7)).to_bytes().expect("encode");
        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0, 0, 0, b'b', 7, 0, 0, 0]);
    }

    #[test]
    fn unknown_discriminant_is_fatal() {
        assert!(matches!(
            SkillSourceRef::from_bytes(&[9]),
            Err(WireError::UnknownDiscriminant { value: 9, .. })
        ));
    }
}
