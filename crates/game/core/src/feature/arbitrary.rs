use std::sync::Arc;

use serde_json::Value as Json;

use super::condition::{clear_start, elapsed, stamp_start};
use super::{Feature, FeatureData, FeatureMeta, Verdict};
use crate::combat::{AttackOutcome, DamageSource, DamageType};
use crate::content::{ContentError, Fields};
use crate::refs::FeatureContainerRef;
use crate::registry::ContentRegistry;
use crate::script::{
    EffectScope, FeatureHook, HookTable, Role, ScriptContext, Value, apply_effects, data_prefix,
};
use crate::skill::SkillData;
use crate::state::{Board, EntityId, Tick};
use crate::wire::{WireError, WireReader, WireWriter};

/// Feature whose hooks are content-authored scripts.
///
/// Only the compendium id travels over the wire; the receiving side resolves
/// the very same instance from its registry.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitraryFeature {
    meta: FeatureMeta,
    hooks: HookTable<FeatureHook>,
}

impl ArbitraryFeature {
    pub const TYPE_NAME: &'static str = "vtt.feature.ArbitraryFeature";
    pub const KIND: &'static str = "arbitrary";

    pub fn new(meta: FeatureMeta, hooks: HookTable<FeatureHook>) -> Self {
        Self { meta, hooks }
    }

    pub fn hooks(&self) -> &HookTable<FeatureHook> {
        &self.hooks
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        Ok(Self::new(
            FeatureMeta::from_json(fields)?,
            HookTable::from_fields(fields, &[])?,
        ))
    }

    /// `[id:string]`, resolved through `registry`.
    pub fn decode(
        r: &mut WireReader<'_>,
        registry: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        let id = r.take_string()?;
        registry
            .entry::<dyn Feature>(&id)
            .ok_or_else(|| WireError::UnknownContent {
                type_name: Self::TYPE_NAME.to_string(),
                id,
            })
    }

    // ========================================================================
    // Script plumbing
    // ========================================================================

    /// Context shared by every hook: tick, elapsed time, stored data and the
    /// holder's view.
    fn context(&self, board: &Board, holder: &FeatureContainerRef) -> ScriptContext {
        let mut ctx = ScriptContext::new(board.current_tick()).with_entity(
            Role::Holder,
            board,
            Some(holder.entity().id),
        );
        ctx.elapsed = elapsed(board, holder, self.id());
        if let Some(data) = board.feature_data(holder) {
            ctx.data = data.numbers_with_prefix(&data_prefix(self.id()));
        }
        ctx
    }

    fn scope(&self, holder: &FeatureContainerRef, damage_type: DamageType) -> EffectScope {
        let mut scope = EffectScope::new(damage_type).with_role(Role::Holder, Some(holder.entity().id));
        scope.feature = Some((holder.clone(), self.id().to_string()));
        scope
    }

    /// Runs `hook`, applies its effects and hands back the returned value.
    fn run(
        &self,
        board: &mut Board,
        hook: FeatureHook,
        ctx: ScriptContext,
        scope: EffectScope,
    ) -> Option<Value> {
        let outcome = self
            .hooks
            .run(hook, &ctx, board.config().script_step_budget)?;
        apply_effects(board, &scope, outcome.effects);
        Some(outcome.value)
    }

    fn verdict(value: Option<Value>, default: Verdict) -> Verdict {
        match value {
            Some(Value::Str(reason)) => Verdict::deny(reason),
            Some(Value::Null) | None => default,
            Some(value) => Verdict::pass(value.truthy()),
        }
    }

    fn amount(value: Option<Value>, default: f32) -> f32 {
        value
            .and_then(|value| value.as_number())
            .map_or(default, |n| n as f32)
    }
}

impl Feature for ArbitraryFeature {
    fn meta(&self) -> &FeatureMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.type_name())?;
        w.put_str(self.id())
    }

    fn to_json(&self) -> Json {
        let mut obj = self.meta.to_json(Self::KIND);
        self.hooks.write_json(&mut obj);
        Json::Object(obj)
    }

    fn on_enable(&self, data: &mut FeatureData, tick: Tick) {
        stamp_start(data, self.id(), tick);
    }

    fn on_disable(&self, data: &mut FeatureData) {
        clear_start(data, self.id());
    }

    fn on_tick(&self, board: &mut Board, holder: &FeatureContainerRef) {
        if !self.hooks.contains(FeatureHook::OnTick) {
            return;
        }
        let ctx = self.context(board, holder);
        let scope = self.scope(holder, DamageType::Physical);
        self.run(board, FeatureHook::OnTick, ctx, scope);
    }

    fn does_get_attacked(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        hit: bool,
    ) -> Verdict {
        if !self.hooks.contains(FeatureHook::DoesGetAttacked) {
            return Verdict::pass(hit);
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(holder.entity().id))
            .with_source(source)
            .with_hit(hit);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(holder.entity().id));
        let value = self.run(board, FeatureHook::DoesGetAttacked, ctx, scope);
        Self::verdict(value, Verdict::pass(hit))
    }

    fn does_attack(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        target: EntityId,
        hit: bool,
    ) -> Verdict {
        if !self.hooks.contains(FeatureHook::DoesAttack) {
            return Verdict::pass(hit);
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(target))
            .with_source(source)
            .with_hit(hit);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(target));
        let value = self.run(board, FeatureHook::DoesAttack, ctx, scope);
        Self::verdict(value, Verdict::pass(hit))
    }

    fn does_execute_skill(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        skill: &SkillData,
    ) -> Verdict {
        if !self.hooks.contains(FeatureHook::DoesExecuteSkill) {
            return Verdict::allow();
        }
        let ctx = skill_context(self.context(board, holder), board, skill);
        let scope = self
            .scope(holder, DamageType::Physical)
            .with_role(Role::Target, skill.first_target());
        let value = self.run(board, FeatureHook::DoesExecuteSkill, ctx, scope);
        Self::verdict(value, Verdict::allow())
    }

    fn modify_receiving_damage(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        amount: f32,
    ) -> f32 {
        if !self.hooks.contains(FeatureHook::ModifyReceivingDamage) {
            return amount;
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(holder.entity().id))
            .with_source(source)
            .with_amount(amount);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(holder.entity().id));
        let value = self.run(board, FeatureHook::ModifyReceivingDamage, ctx, scope);
        Self::amount(value, amount)
    }

    fn modify_attacking_damage(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        target: EntityId,
        amount: f32,
    ) -> f32 {
        if !self.hooks.contains(FeatureHook::ModifyAttackingDamage) {
            return amount;
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(target))
            .with_source(source)
            .with_amount(amount);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(target));
        let value = self.run(board, FeatureHook::ModifyAttackingDamage, ctx, scope);
        Self::amount(value, amount)
    }

    fn on_attacked(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        outcome: &AttackOutcome,
    ) {
        if !self.hooks.contains(FeatureHook::OnAttacked) {
            return;
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(holder.entity().id))
            .with_source(source)
            .with_hit(outcome.hit)
            .with_amount(outcome.amount);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(holder.entity().id));
        self.run(board, FeatureHook::OnAttacked, ctx, scope);
    }

    fn on_attack(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        target: EntityId,
        outcome: &AttackOutcome,
    ) {
        if !self.hooks.contains(FeatureHook::OnAttack) {
            return;
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(target))
            .with_source(source)
            .with_hit(outcome.hit)
            .with_amount(outcome.amount);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(target));
        self.run(board, FeatureHook::OnAttack, ctx, scope);
    }

    fn on_execute_skill(&self, board: &mut Board, holder: &FeatureContainerRef, skill: &SkillData) {
        if !self.hooks.contains(FeatureHook::OnExecuteSkill) {
            return;
        }
        let ctx = skill_context(self.context(board, holder), board, skill);
        let scope = self
            .scope(holder, DamageType::Physical)
            .with_role(Role::Target, skill.first_target());
        self.run(board, FeatureHook::OnExecuteSkill, ctx, scope);
    }

    fn on_injured(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        amount: f32,
    ) {
        if !self.hooks.contains(FeatureHook::OnInjured) {
            return;
        }
        let ctx = self
            .context(board, holder)
            .with_entity(Role::Source, board, source.attacker)
            .with_entity(Role::Target, board, Some(holder.entity().id))
            .with_source(source)
            .with_amount(amount);
        let scope = self
            .scope(holder, source.damage_type)
            .with_role(Role::Source, source.attacker)
            .with_role(Role::Target, Some(holder.entity().id));
        self.run(board, FeatureHook::OnInjured, ctx, scope);
    }
}

fn skill_context(mut ctx: ScriptContext, board: &Board, skill: &SkillData) -> ScriptContext {
    ctx.tags = skill.skill.meta().tags.clone();
    ctx.args = skill.args.len();
    ctx.layer = skill.layers.first().cloned();
    ctx.with_entity(Role::Target, board, skill.first_target())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::combat::{self, DamageType};
    use crate::config::EngineConfig;
    use crate::state::{ChangeEvent, Entity, EntityKind, Vitals};

    fn feature(mut entry: Json) -> Arc<dyn Feature> {
        if let Some(obj) = entry.as_object_mut() {
            for key in ["name", "icon", "description"] {
                obj.entry(key).or_insert_with(|| json!(""));
            }
        }
        let fields = Fields::new("scripted", &entry).expect("object");
        Arc::new(ArbitraryFeature::from_json(fields).expect("compiles"))
    }

    fn board_with(feature: Arc<dyn Feature>) -> (Board, EntityId) {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(Entity::new(EntityKind::Prop, "dummy").with_vitals(Vitals::health(10.0)));
        board.add_feature(board.entity_ref(id), feature);
        board.drain_changes();
        (board, id)
    }

    #[test]
    fn missing_hooks_keep_defaults() {
        let (mut board, id) = board_with(feature(json!({ "type": "arbitrary" })));
        let holder: FeatureContainerRef = board.entity_ref(id).into();
        let source = DamageSource::environmental(DamageType::Fire);
        let scripted = board.enabled_features(&holder).remove(0);
        assert_eq!(scripted.modify_receiving_damage(&mut board, &holder, &source, 4.0), 4.0);
        assert!(scripted.does_get_attacked(&mut board, &holder, &source, true).allowed);
        assert!(!scripted.does_get_attacked(&mut board, &holder, &source, false).allowed);
    }

    #[test]
    fn modify_hook_rewrites_amount() {
        let (mut board, id) = board_with(feature(json!({
            "type": "arbitrary",
            "modifyReceivingDamage": "damage_is(\"fire\") ? amount / 2 : amount"
        })));
        combat::inflict(&mut board, id, &DamageSource::environmental(DamageType::Fire), 4.0);
        assert_eq!(board.entity(id).and_then(|e| e.vitals.current_health()), Some(8.0));
        combat::inflict(&mut board, id, &DamageSource::environmental(DamageType::Cold), 4.0);
        assert_eq!(board.entity(id).and_then(|e| e.vitals.current_health()), Some(4.0));
    }

    #[test]
    fn string_result_denies_with_reason() {
        let (mut board, id) = board_with(feature(json!({
            "type": "arbitrary",
            "doesGetAttacked": "hit ? \"ethereal\" : null"
        })));
        let holder: FeatureContainerRef = board.entity_ref(id).into();
        let scripted = board.enabled_features(&holder).remove(0);
        let source = DamageSource::environmental(DamageType::Slash);
        let verdict = scripted.does_get_attacked(&mut board, &holder, &source, true);
        assert_eq!(verdict, Verdict::deny("ethereal"));
    }

    #[test]
    fn tick_hook_keeps_data_and_removes_itself() {
        let (mut board, id) = board_with(feature(json!({
            "type": "arbitrary",
            "onTick": "set_data(\"seen\", elapsed); elapsed >= 2 ? remove_self() : log(\"waiting\")"
        })));
        let holder: FeatureContainerRef = board.entity_ref(id).into();
        board.process_tick();
        board.process_tick();
        assert!(board.has_feature(holder.clone(), "scripted"));
        let seen = board
            .feature_data(&holder)
            .and_then(|data| data.get_f64("scripted:var:seen"));
        assert_eq!(seen, Some(1.0));

        board.process_tick();
        assert!(!board.has_feature(holder, "scripted"));
        let logs = board
            .drain_changes()
            .into_iter()
            .filter(|event| matches!(event, ChangeEvent::Message { .. }))
            .count();
        assert_eq!(logs, 2);
    }

    #[test]
    fn wire_form_is_type_and_id() {
        let scripted = feature(json!({ "type": "arbitrary", "onTick": "1" }));
        let mut w = WireWriter::new();
        scripted.encode(&mut w).expect("encode");
        let bytes = w.finish();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.take_string().expect("type"), ArbitraryFeature::TYPE_NAME);
        assert_eq!(r.take_string().expect("id"), "scripted");
        r.finish().expect("nothing else");
    }
}
