//! Requests clients send to a board and the replies they get back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vtt_core::{
    Board, Entity, EntityId, FeatureContainerRef, ItemId, PlayerId, SkillArgument, Tick,
};

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub player: PlayerId,
    pub gm: bool,
}

impl Actor {
    pub const fn player(player: PlayerId) -> Self {
        Self { player, gm: false }
    }

    pub const fn game_master(player: PlayerId) -> Self {
        Self { player, gm: true }
    }

    /// Game masters control everything; players control what they own.
    pub fn controls(&self, board: &Board, entity: EntityId) -> bool {
        self.gm
            || board
                .entity(entity)
                .is_some_and(|e| e.owner == Some(self.player))
    }
}

/// A state change requested by a client.
#[derive(Debug, Clone)]
pub enum Request {
    // Board
    Spawn(Box<Entity>),
    Despawn(EntityId),
    AdvanceTick,

    // Compendium
    LoadFeature { id: String, json: Value },
    LoadSkill { id: String, json: Value },
    RemoveContent { id: String },

    // Entities
    SetStatBase {
        entity: EntityId,
        stat: String,
        value: f32,
    },
    AttachFeature {
        container: FeatureContainerRef,
        feature: String,
    },
    DetachFeature {
        container: FeatureContainerRef,
        feature: String,
    },
    ToggleFeature {
        container: FeatureContainerRef,
        feature: String,
        enabled: bool,
    },
    Equip {
        entity: EntityId,
        item: ItemId,
        slot: String,
    },
    Unequip {
        entity: EntityId,
        item: ItemId,
    },
    UseSkill {
        executor: EntityId,
        skill: String,
        args: Vec<SkillArgument>,
    },
    CancelSkill {
        executor: EntityId,
        instance: u64,
    },
}

impl Request {
    /// Entity the request acts on, if any. Board and compendium requests
    /// have none and are reserved for game masters.
    pub fn subject(&self) -> Option<EntityId> {
        match self {
            Request::Spawn(_)
            | Request::Despawn(_)
            | Request::AdvanceTick
            | Request::LoadFeature { .. }
            | Request::LoadSkill { .. }
            | Request::RemoveContent { .. } => None,
            Request::SetStatBase { entity, .. }
            | Request::Equip { entity, .. }
            | Request::Unequip { entity, .. } => Some(*entity),
            Request::AttachFeature { container, .. }
            | Request::DetachFeature { container, .. }
            | Request::ToggleFeature { container, .. } => Some(container.entity().id),
            Request::UseSkill { executor, .. } | Request::CancelSkill { executor, .. } => {
                Some(*executor)
            }
        }
    }

    pub fn is_authorized(&self, actor: &Actor, board: &Board) -> bool {
        match self.subject() {
            None => actor.gm,
            Some(entity) => actor.controls(board, entity),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Spawn(_) => "spawn",
            Request::Despawn(_) => "despawn",
            Request::AdvanceTick => "advance_tick",
            Request::LoadFeature { .. } => "load_feature",
            Request::LoadSkill { .. } => "load_skill",
            Request::RemoveContent { .. } => "remove_content",
            Request::SetStatBase { .. } => "set_stat_base",
            Request::AttachFeature { .. } => "attach_feature",
            Request::DetachFeature { .. } => "detach_feature",
            Request::ToggleFeature { .. } => "toggle_feature",
            Request::Equip { .. } => "equip",
            Request::Unequip { .. } => "unequip",
            Request::UseSkill { .. } => "use_skill",
            Request::CancelSkill { .. } => "cancel_skill",
        }
    }
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// Applied; `changes` journal entries were published.
    Applied { changes: usize },
    Spawned(EntityId),
    SkillStarted { instance: u64 },
    Ticked(Tick),
    /// Understood and authorised, but the engine said no.
    Rejected { reason: String },
    /// The actor may not do this. Nothing was touched.
    Ignored,
}

impl CommandOutcome {
    pub fn rejected(reason: impl ToString) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Rejected { .. } | Self::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use vtt_core::{EngineConfig, EntityKind};

    use super::*;

    fn board_with_owned(owner: PlayerId) -> (Board, EntityId) {
        let mut board = Board::with_seed("test", EngineConfig::default(), 1);
        let id = board.spawn(Entity::new(EntityKind::Creature, "hero").with_owner(owner));
        (board, id)
    }

    #[test]
    fn owners_control_their_entities_only() {
        let (board, hero) = board_with_owned(PlayerId(7));
        let request = Request::SetStatBase {
            entity: hero,
            stat: "strength".into(),
            value: 12.0,
        };
        assert!(request.is_authorized(&Actor::player(PlayerId(7)), &board));
        assert!(!request.is_authorized(&Actor::player(PlayerId(8)), &board));
        assert!(request.is_authorized(&Actor::game_master(PlayerId(8)), &board));
    }

    #[test]
    fn compendium_edits_need_a_game_master() {
        let (board, _) = board_with_owned(PlayerId(7));
        let request = Request::RemoveContent { id: "slash".into() };
        assert!(!request.is_authorized(&Actor::player(PlayerId(7)), &board));
        assert!(request.is_authorized(&Actor::game_master(PlayerId(1)), &board));
    }

    #[test]
    fn missing_entities_are_nobody_s() {
        let (board, _) = board_with_owned(PlayerId(7));
        let request = Request::Despawn(EntityId(99));
        assert!(!request.is_authorized(&Actor::player(PlayerId(7)), &board));
        let request = Request::CancelSkill {
            executor: EntityId(99),
            instance: 1,
        };
        assert!(!request.is_authorized(&Actor::player(PlayerId(7)), &board));
    }
}
