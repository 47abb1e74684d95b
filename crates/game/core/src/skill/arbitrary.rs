use std::sync::Arc;

use serde_json::Value as Json;

use super::{ArgumentSlot, ArgumentType, AttackBehavior, Skill, SkillData, SkillMeta};
use crate::combat::{AttackOutcome, DamageType};
use crate::content::{ContentError, Fields};
use crate::registry::ContentRegistry;
use crate::script::{
    EffectScope, HookTable, Role, ScriptContext, SkillHook, Value, apply_effects,
};
use crate::state::{Board, EntityId};
use crate::wire::{WireError, WireReader, WireWriter};

/// Skill whose lifecycle hooks are content-authored scripts.
///
/// The `attack` flavour additionally runs the combat pipeline on execute,
/// asking its `damage`, `doesHit`, `canTarget` and `onHit` hooks. Like
/// scripted features, it travels over the wire as its compendium id.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitrarySkill {
    meta: SkillMeta,
    hooks: HookTable<SkillHook>,
    attack: Option<DamageType>,
}

impl ArbitrarySkill {
    pub const TYPE_NAME: &'static str = "vtt.skill.ArbitrarySkill";
    pub const ATTACK_TYPE_NAME: &'static str = "vtt.skill.ArbitraryAttackSkill";
    pub const KIND: &'static str = "arbitrary";
    pub const ATTACK_KIND: &'static str = "attack";

    /// Kind-specific key of the attack flavour that is not a hook.
    const RESERVED: &'static [&'static str] = &["damage_type"];

    pub fn new(meta: SkillMeta, hooks: HookTable<SkillHook>) -> Self {
        Self {
            meta,
            hooks,
            attack: None,
        }
    }

    pub fn attacking(mut self, damage_type: DamageType) -> Self {
        self.attack = Some(damage_type);
        self
    }

    pub fn hooks(&self) -> &HookTable<SkillHook> {
        &self.hooks
    }

    pub fn from_json(fields: Fields<'_>, attack: bool) -> Result<Self, ContentError> {
        let mut meta = SkillMeta::from_json(fields)?;
        if !attack {
            return Ok(Self::new(meta, HookTable::from_fields(fields, &[])?));
        }
        let damage_type = match fields.optional_str("damage_type")? {
            Some(ty) => ty
                .parse()
                .map_err(|_| fields.invalid("damage_type", "unknown damage type"))?,
            None => DamageType::Physical,
        };
        if meta.arguments.is_empty() {
            meta.arguments
                .push(ArgumentSlot::new([ArgumentType::Entity, ArgumentType::BodyPart]));
        }
        let hooks = HookTable::from_fields(fields, Self::RESERVED)?;
        Ok(Self::new(meta, hooks).attacking(damage_type))
    }

    /// `[id:string]`, resolved through `registry`.
    pub fn decode(
        r: &mut WireReader<'_>,
        registry: &ContentRegistry,
    ) -> Result<Arc<dyn Skill>, WireError> {
        let id = r.take_string()?;
        registry
            .entry::<dyn Skill>(&id)
            .ok_or_else(|| WireError::UnknownContent {
                type_name: Self::TYPE_NAME.to_string(),
                id,
            })
    }

    // ========================================================================
    // Script plumbing
    // ========================================================================

    fn context(&self, board: &Board, data: &SkillData) -> ScriptContext {
        let mut ctx = ScriptContext::new(board.current_tick())
            .with_entity(Role::Holder, board, Some(data.executor))
            .with_entity(Role::Target, board, data.first_target());
        ctx.tags = self.meta.tags.clone();
        ctx.args = data.args.len();
        ctx.damage_type = self.attack;
        ctx.elapsed = board
            .active_skill(data.executor, data.instance)
            .map(|active| board.current_tick().since(active.started));
        ctx
    }

    fn scope(&self, data: &SkillData) -> EffectScope {
        let mut scope = EffectScope::new(self.attack.unwrap_or(DamageType::Physical))
            .with_role(Role::Holder, Some(data.executor))
            .with_role(Role::Target, data.first_target());
        scope.skill = Some((data.executor, data.instance));
        scope
    }

    /// Evaluates `hook` without applying effects, for read-only queries.
    fn query(&self, board: &Board, data: &SkillData, hook: SkillHook) -> Option<Value> {
        let ctx = self.context(board, data);
        self.hooks
            .run(hook, &ctx, board.config().script_step_budget)
            .map(|outcome| outcome.value)
    }

    fn run(&self, board: &mut Board, data: &SkillData, hook: SkillHook, ctx: ScriptContext) {
        if let Some(outcome) = self.hooks.run(hook, &ctx, board.config().script_step_budget) {
            apply_effects(board, &self.scope(data), outcome.effects);
        }
    }

    fn ticks(&self, board: &Board, data: &SkillData, hook: SkillHook) -> u64 {
        self.query(board, data, hook)
            .and_then(|value| value.as_number())
            .map_or(0, |n| n.max(0.0) as u64)
    }
}

impl Skill for ArbitrarySkill {
    fn meta(&self) -> &SkillMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        if self.attack.is_some() {
            Self::ATTACK_TYPE_NAME
        } else {
            Self::TYPE_NAME
        }
    }

    fn kind(&self) -> &'static str {
        if self.attack.is_some() {
            Self::ATTACK_KIND
        } else {
            Self::KIND
        }
    }

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.type_name())?;
        w.put_str(self.id())
    }

    fn to_json(&self) -> Json {
        let mut obj = self.meta.to_json(self.kind());
        if let Some(damage_type) = self.attack {
            obj.insert("damage_type".into(), Json::String(damage_type.to_string()));
        }
        self.hooks.write_json(&mut obj);
        Json::Object(obj)
    }

    fn attack(&self) -> Option<&dyn AttackBehavior> {
        self.attack.map(|_| self as &dyn AttackBehavior)
    }

    fn can_be_used(&self, board: &Board, data: &SkillData) -> Result<(), String> {
        match self.query(board, data, SkillHook::Condition) {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Str(reason)) => Err(reason),
            Some(value) if value.truthy() => Ok(()),
            Some(_) => Err(format!("{} cannot be used now", self.meta.display_name())),
        }
    }

    fn start(&self, board: &mut Board, data: &SkillData) {
        let ctx = self.context(board, data);
        self.run(board, data, SkillHook::Start, ctx);
    }

    fn delay(&self, board: &Board, data: &SkillData) -> u64 {
        self.ticks(board, data, SkillHook::Delay)
    }

    fn cooldown(&self, board: &Board, data: &SkillData) -> u64 {
        self.ticks(board, data, SkillHook::Cooldown)
    }

    fn duration(&self, board: &Board, data: &SkillData) -> u64 {
        self.ticks(board, data, SkillHook::Duration)
    }

    /// The `layers` hook returns a comma separated list.
    fn layers(&self, board: &Board, data: &SkillData) -> Vec<String> {
        match self.query(board, data, SkillHook::Layers) {
            Some(Value::Str(layers)) => layers
                .split(',')
                .map(str::trim)
                .filter(|layer| !layer.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn execute(&self, board: &mut Board, data: &SkillData, layer: &str) {
        let mut ctx = self.context(board, data);
        ctx.layer = Some(layer.to_string());
        self.run(board, data, SkillHook::Execute, ctx);
        if self.attack.is_some() {
            crate::combat::resolve_attack(board, data);
        }
    }

    fn can_cancel(&self, board: &Board, data: &SkillData) -> bool {
        match self.query(board, data, SkillHook::CanCancel) {
            None | Some(Value::Null) => true,
            Some(value) => value.truthy(),
        }
    }

    fn cancel(&self, board: &mut Board, data: &SkillData, interrupted: bool) {
        let mut ctx = self.context(board, data);
        ctx.interrupted = Some(interrupted);
        self.run(board, data, SkillHook::Cancel, ctx);
    }
}

impl AttackBehavior for ArbitrarySkill {
    fn can_target(&self, board: &Board, data: &SkillData, target: EntityId) -> bool {
        if board.entity(target).is_none() {
            return false;
        }
        match self.query(board, data, SkillHook::CanTarget) {
            None | Some(Value::Null) => true,
            Some(value) => value.truthy(),
        }
    }

    fn damage(&self, board: &Board, data: &SkillData, _target: EntityId) -> (f32, DamageType) {
        let amount = self
            .query(board, data, SkillHook::Damage)
            .and_then(|value| value.as_number())
            .map_or(0.0, |n| n as f32);
        (amount, self.attack.unwrap_or(DamageType::Physical))
    }

    fn does_hit(&self, board: &mut Board, data: &SkillData, _target: EntityId) -> bool {
        let ctx = self.context(board, data);
        match self.hooks.run(SkillHook::DoesHit, &ctx, board.config().script_step_budget) {
            Some(outcome) => {
                let hit = outcome.value.is_null() || outcome.value.truthy();
                apply_effects(board, &self.scope(data), outcome.effects);
                hit
            }
            None => true,
        }
    }

    fn on_hit(&self, board: &mut Board, data: &SkillData, outcome: &AttackOutcome) {
        let ctx = self
            .context(board, data)
            .with_hit(outcome.hit)
            .with_amount(outcome.amount);
        self.run(board, data, SkillHook::OnHit, ctx);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::EngineConfig;
    use crate::refs::SkillSourceRef;
    use crate::skill::SkillArgument;
    use crate::state::{ChangeEvent, Entity, EntityKind, Vitals};

    fn skill(mut entry: Json, attack: bool) -> Arc<dyn Skill> {
        if let Some(obj) = entry.as_object_mut() {
            for key in ["name", "icon", "description"] {
                obj.entry(key).or_insert_with(|| json!(""));
            }
        }
        let fields = Fields::new("scripted", &entry).expect("object");
        Arc::new(ArbitrarySkill::from_json(fields, attack).expect("compiles"))
    }

    fn messages(board: &mut Board) -> Vec<String> {
        board
            .drain_changes()
            .into_iter()
            .filter_map(|event| match event {
                ChangeEvent::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn hooks_drive_the_lifecycle() {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(Entity::new(EntityKind::Creature, "bard"));
        let song = skill(
            json!({ "type": "arbitrary", "start": "log(\"tuning\")", "delay": "1",
                    "duration": "1", "execute": "log(\"verse \" + layer)",
                    "layers": "\"voice, hands\"" }),
            false,
        );
        board
            .start_skill(id, song, Vec::new(), SkillSourceRef::None)
            .expect("starts");
        for _ in 0..4 {
            board.process_tick();
        }
        assert_eq!(
            messages(&mut board),
            vec![
                "tuning",
                "verse voice",
                "verse hands",
                "verse voice",
                "verse hands"
            ]
        );
    }

    #[test]
    fn missing_hooks_use_defaults() {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(Entity::new(EntityKind::Creature, "bard"));
        let idle = skill(json!({ "type": "arbitrary" }), false);
        let instance = board
            .start_skill(id, Arc::clone(&idle), Vec::new(), SkillSourceRef::None)
            .expect("starts");
        let data = board
            .active_skill(id, instance)
            .map(|active| active.data.clone())
            .expect("active");
        assert_eq!(idle.delay(&board, &data), 0);
        assert!(idle.can_cancel(&board, &data));
        assert_eq!(data.layers, vec!["main".to_string()]);
    }

    #[test]
    fn condition_string_explains_refusal() {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(Entity::new(EntityKind::Creature, "bard"));
        let gated = skill(
            json!({ "type": "arbitrary", "condition": "has_feature(holder, \"mana_well\") ? true : \"no mana\"" }),
            false,
        );
        let err = board
            .start_skill(id, gated, Vec::new(), SkillSourceRef::None)
            .expect_err("gated");
        assert_eq!(err, super::super::SkillError::Unavailable("no mana".into()));
    }

    #[test]
    fn scripted_attack_uses_damage_hook() {
        let mut board = Board::new("table", EngineConfig::default());
        let wolf = board.spawn(Entity::new(EntityKind::Creature, "wolf"));
        let sheep = board.spawn(Entity::new(EntityKind::Prop, "sheep").with_vitals(Vitals::health(10.0)));
        let bite = skill(
            json!({ "type": "attack", "damage_type": "pierce", "damage": "3",
                    "onHit": "log(\"crunch\")" }),
            true,
        );
        assert_eq!(bite.type_name(), ArbitrarySkill::ATTACK_TYPE_NAME);
        board
            .start_skill(
                wolf,
                bite,
                vec![SkillArgument::Entity(board.entity_ref(sheep))],
                SkillSourceRef::None,
            )
            .expect("starts");
        board.process_tick();
        assert_eq!(
            board.entity(sheep).and_then(|e| e.vitals.current_health()),
            Some(7.0)
        );
        assert!(messages(&mut board).contains(&"crunch".to_string()));
    }
}
