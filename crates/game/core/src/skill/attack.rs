use std::sync::Arc;

use serde_json::Value as Json;

use super::{
    ArgumentSlot, ArgumentType, AttackBehavior, Skill, SkillArgument, SkillData, SkillMeta,
};
use crate::combat::{self, DamageType};
use crate::content::{ContentError, Fields};
use crate::registry::ContentRegistry;
use crate::state::{Board, ChangeEvent, EntityId};
use crate::stats::names;
use crate::wire::{WireError, WireReader, WireWriter};

/// Plain weapon attack against an entity or one of its body parts.
///
/// Damage is the executor's `attack` stat (1 when missing) times the
/// multiplier. Hit chance compares `accuracy` against the target's `evasion`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttackSkill {
    meta: SkillMeta,
    damage_type: DamageType,
    damage_multiplier: f32,
    delay: u64,
    cooldown: u64,
    stamina_cost: f32,
}

impl AttackSkill {
    pub const TYPE_NAME: &'static str = "vtt.skill.AttackSkill";
    pub const KIND: &'static str = "basic_attack";

    pub fn new(meta: SkillMeta, damage_type: DamageType) -> Self {
        let mut meta = meta;
        if meta.arguments.is_empty() {
            meta.arguments
                .push(ArgumentSlot::new([ArgumentType::Entity, ArgumentType::BodyPart]));
        }
        Self {
            meta,
            damage_type,
            damage_multiplier: 1.0,
            delay: 0,
            cooldown: 0,
            stamina_cost: 0.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn with_timing(mut self, delay: u64, cooldown: u64) -> Self {
        self.delay = delay;
        self.cooldown = cooldown;
        self
    }

    pub fn with_stamina_cost(mut self, cost: f32) -> Self {
        self.stamina_cost = cost;
        self
    }

    pub fn damage_type(&self) -> DamageType {
        self.damage_type
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        let damage_type = fields
            .required_str("damage_type")?
            .parse()
            .map_err(|_| fields.invalid("damage_type", "unknown damage type"))?;
        Ok(Self::new(SkillMeta::from_json(fields)?, damage_type)
            .with_multiplier(fields.f32_or("damage_multiplier", 1.0)?)
            .with_timing(fields.u64_or("delay", 0)?, fields.u64_or("cooldown", 0)?)
            .with_stamina_cost(fields.f32_or("stamina_cost", 0.0)?))
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        _registry: &ContentRegistry,
    ) -> Result<Arc<dyn Skill>, WireError> {
        let meta = SkillMeta::decode(r)?;
        let damage_type = r.take_string()?;
        let damage_type = damage_type.parse().map_err(|_| WireError::Invalid {
            what: "damage type",
            reason: damage_type,
        })?;
        let damage_multiplier = r.take()?;
        let delay = r.take()?;
        let cooldown = r.take()?;
        let stamina_cost = r.take()?;
        Ok(Arc::new(Self {
            meta,
            damage_type,
            damage_multiplier,
            delay,
            cooldown,
            stamina_cost,
        }))
    }
}

impl Skill for AttackSkill {
    fn meta(&self) -> &SkillMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// `[damageType:string][multiplier:f32][delay:u64][cooldown:u64][stamina:f32]`
    fn encode_fields(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.damage_type.as_ref())?;
        w.put(&self.damage_multiplier)?;
        w.put(&self.delay)?;
        w.put(&self.cooldown)?;
        w.put(&self.stamina_cost)
    }

    fn to_json(&self) -> Json {
        let mut obj = self.meta.to_json(Self::KIND);
        obj.insert(
            "damage_type".into(),
            Json::String(self.damage_type.to_string()),
        );
        obj.insert(
            "damage_multiplier".into(),
            Json::from(self.damage_multiplier),
        );
        obj.insert("delay".into(), Json::from(self.delay));
        obj.insert("cooldown".into(), Json::from(self.cooldown));
        obj.insert("stamina_cost".into(), Json::from(self.stamina_cost));
        Json::Object(obj)
    }

    fn attack(&self) -> Option<&dyn super::AttackBehavior> {
        Some(self)
    }

    /// Body parts must be alive; the executor cannot target itself.
    fn can_use_argument(
        &self,
        board: &Board,
        executor: EntityId,
        _slot: usize,
        argument: &SkillArgument,
    ) -> Result<(), String> {
        if argument.entity() == Some(executor) {
            return Err("cannot attack yourself".into());
        }
        match argument {
            SkillArgument::BodyPart(part) => match part.health(board) {
                Some(health) if health > 0.0 => Ok(()),
                Some(_) => Err(format!("{} is already destroyed", part.path)),
                None => Err("no such body part".into()),
            },
            SkillArgument::Entity(entity) if entity.resolve(board).is_none() => {
                Err("no such entity".into())
            }
            _ => Ok(()),
        }
    }

    fn can_be_used(&self, board: &Board, data: &SkillData) -> Result<(), String> {
        if self.stamina_cost <= 0.0 {
            return Ok(());
        }
        let stamina = board
            .entity(data.executor)
            .map_or(0.0, |entity| entity.stats.value_or(names::STAMINA, 0.0));
        if stamina < self.stamina_cost {
            return Err(format!(
                "needs {} stamina, has {stamina}",
                self.stamina_cost
            ));
        }
        Ok(())
    }

    fn start(&self, board: &mut Board, data: &SkillData) {
        if self.stamina_cost > 0.0 {
            if let Some(entity) = board.entity_mut(data.executor) {
                let base = entity.stats.get(names::STAMINA).map_or(0.0, |stat| stat.base());
                entity
                    .stats
                    .set_base(names::STAMINA, base - self.stamina_cost);
            }
        }
        let name = board
            .entity(data.executor)
            .map(|entity| entity.name.clone())
            .unwrap_or_default();
        board.record(ChangeEvent::Message {
            entity: Some(data.executor),
            text: format!("{name} prepares {}", self.meta.display_name()),
        });
    }

    fn delay(&self, _board: &Board, _data: &SkillData) -> u64 {
        self.delay
    }

    fn cooldown(&self, _board: &Board, _data: &SkillData) -> u64 {
        self.cooldown
    }
}

impl AttackBehavior for AttackSkill {
    fn can_target(&self, board: &Board, data: &SkillData, target: EntityId) -> bool {
        target != data.executor && board.entity(target).is_some()
    }

    fn damage(&self, board: &Board, data: &SkillData, _target: EntityId) -> (f32, DamageType) {
        let attack = board
            .entity(data.executor)
            .map_or(1.0, |entity| entity.stats.value_or(names::ATTACK, 1.0));
        (attack * self.damage_multiplier, self.damage_type)
    }

    fn does_hit(&self, board: &mut Board, data: &SkillData, target: EntityId) -> bool {
        let stat = |id: EntityId, name: &str| {
            board
                .entity(id)
                .map_or(0.0, |entity| entity.stats.value_or(name, 0.0))
        };
        let accuracy = stat(data.executor, names::ACCURACY);
        let evasion = stat(target, names::EVASION);
        let roll = board.roll(100);
        combat::check_hit(accuracy, evasion, roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::refs::SkillSourceRef;
    use crate::state::{Body, BodyPartPath, Entity, EntityKind, Vitals};
    use crate::stats::StatBlock;

    fn slash() -> Arc<dyn Skill> {
        Arc::new(
            AttackSkill::new(SkillMeta::new("slash").with_tag("melee"), DamageType::Slash)
                .with_multiplier(2.0)
                .with_timing(1, 2)
                .with_stamina_cost(3.0),
        )
    }

    fn duel() -> (Board, EntityId, EntityId) {
        let mut board = Board::new("table", EngineConfig::default());
        let fighter = board.spawn(
            Entity::new(EntityKind::Creature, "fighter")
                .with_stats(StatBlock::new().with_base(names::ATTACK, 2.5).with_base(names::STAMINA, 5.0)),
        );
        let goblin = board.spawn(
            Entity::new(EntityKind::Creature, "goblin")
                .with_vitals(Vitals::Body(Body::humanoid(20.0))),
        );
        (board, fighter, goblin)
    }

    #[test]
    fn hits_the_chosen_part_after_delay() {
        let (mut board, fighter, goblin) = duel();
        let arm = board.entity_ref(goblin).body_part(BodyPartPath(vec![1]));
        board
            .start_skill(
                fighter,
                slash(),
                vec![SkillArgument::BodyPart(arm.clone())],
                SkillSourceRef::None,
            )
            .expect("starts");
        assert_eq!(board.entity(fighter).map(|e| e.stats.value(names::STAMINA)), Some(Some(2.0)));

        board.process_tick();
        assert_eq!(arm.health(&board), Some(10.0));
        board.process_tick();
        assert_eq!(arm.health(&board), Some(5.0));
    }

    #[test]
    fn not_enough_stamina() {
        let (mut board, fighter, goblin) = duel();
        let target = vec![SkillArgument::Entity(board.entity_ref(goblin))];
        board
            .start_skill(fighter, slash(), target.clone(), SkillSourceRef::None)
            .expect("first swing");
        for _ in 0..4 {
            board.process_tick();
        }
        let err = board
            .start_skill(fighter, slash(), target, SkillSourceRef::None)
            .expect_err("exhausted");
        assert!(matches!(err, super::super::SkillError::Unavailable(_)));
    }

    #[test]
    fn cannot_target_self_or_dead_parts() {
        let (mut board, fighter, goblin) = duel();
        let skill = slash();
        let own = SkillArgument::Entity(board.entity_ref(fighter));
        assert!(skill.can_use_argument(&board, fighter, 0, &own).is_err());

        let arm = board.entity_ref(goblin).body_part(BodyPartPath(vec![1]));
        if let Some(body) = board.entity_mut(goblin).and_then(|e| e.vitals.body_mut()) {
            body.injure(&arm.path, DamageType::Slash, 100.0);
        }
        let hand = SkillArgument::BodyPart(arm.entity.body_part(BodyPartPath(vec![1, 0])));
        assert!(skill.can_use_argument(&board, fighter, 0, &hand).is_err());
    }
}
