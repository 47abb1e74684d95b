//! End-to-end attack resolution through features on both sides.

use std::sync::Arc;

use vtt_core::combat::{self, DamageSource};
use vtt_core::feature::{DamageOverTimeCondition, ParryingFeature};
use vtt_core::refs::SkillSourceRef;
use vtt_core::skill::AttackSkill;
use vtt_core::stats::names;
use vtt_core::{
    Board, Body, ChangeEvent, DamageType, Entity, EntityId, EntityKind, EngineConfig, FeatureMeta,
    Skill, SkillArgument, SkillData, SkillMeta, StatBlock, Vec3, Vitals,
};

fn sword() -> Arc<dyn Skill> {
    Arc::new(
        AttackSkill::new(SkillMeta::new("sword").with_tag("melee"), DamageType::Slash)
            .with_multiplier(2.0),
    )
}

fn arena() -> (Board, EntityId, EntityId) {
    let mut board = Board::with_seed("arena", EngineConfig::default(), 11);
    let attacker = board.spawn(
        Entity::new(EntityKind::Creature, "duelist")
            .with_stats(StatBlock::new().with_base("attack", 3.0)),
    );
    let defender = board.spawn(
        Entity::new(EntityKind::Creature, "fencer").with_vitals(Vitals::Body(Body::humanoid(20.0))),
    );
    board.add_feature(
        board.entity_ref(defender),
        Arc::new(ParryingFeature::new(FeatureMeta::new("parry"))),
    );
    (board, attacker, defender)
}

fn swing(board: &Board, attacker: EntityId, defender: EntityId, skill: Arc<dyn Skill>) -> SkillData {
    SkillData::new(
        1,
        skill,
        attacker,
        vec![SkillArgument::Entity(board.entity_ref(defender))],
        SkillSourceRef::None,
    )
}

#[test]
fn parry_zeroes_damage_and_leaves_after_the_hit() {
    let (mut board, attacker, defender) = arena();
    let data = swing(&board, attacker, defender, sword());

    let outcome = combat::resolve_attack(&mut board, &data).expect("attack resolves");
    assert!(outcome.hit);
    assert_eq!(outcome.amount, 0.0);
    assert!(!outcome.injured);
    assert!(
        board.has_feature(board.entity_ref(defender), "parry"),
        "removal is deferred until the hook chain finishes"
    );

    board.process_tick();
    assert!(!board.has_feature(board.entity_ref(defender), "parry"));
    assert_eq!(
        board.entity(defender).and_then(|e| e.vitals.current_health()),
        Some(20.0)
    );
}

#[test]
fn second_swing_lands_once_parry_is_spent() {
    let (mut board, attacker, defender) = arena();
    let target = vec![SkillArgument::Entity(board.entity_ref(defender))];
    board
        .start_skill(attacker, sword(), target.clone(), SkillSourceRef::None)
        .expect("first swing");
    board.process_tick();
    assert!(!board.has_feature(board.entity_ref(defender), "parry"));

    board
        .start_skill(attacker, sword(), target, SkillSourceRef::None)
        .expect("second swing");
    board.process_tick();
    assert_eq!(
        board.entity(defender).and_then(|e| e.vitals.current_health()),
        Some(14.0)
    );
}

#[test]
fn unseen_attackers_are_not_parried() {
    let hidden = Entity::new(EntityKind::Creature, "assassin").hidden();
    let distant = Entity::new(EntityKind::Creature, "archer").with_position(Vec3::new(30.0, 0.0, 0.0));
    for attacker in [hidden, distant] {
        let (mut board, _, defender) = arena();
        if let Some(fencer) = board.entity_mut(defender) {
            fencer.stats.set_base(names::SIGHT, 10.0);
        }
        let attacker = board.spawn(attacker.with_stats(StatBlock::new().with_base("attack", 3.0)));
        assert!(!board.can_see(defender, attacker));

        let data = swing(&board, attacker, defender, sword());
        let outcome = combat::resolve_attack(&mut board, &data).expect("attack resolves");
        assert_eq!(outcome.amount, 6.0);
        assert!(outcome.injured);
        board.process_tick();
        assert!(board.has_feature(board.entity_ref(defender), "parry"));
        assert_eq!(
            board.entity(defender).and_then(|e| e.vitals.current_health()),
            Some(14.0)
        );
    }
}

#[test]
fn magic_is_not_parried() {
    let (mut board, attacker, defender) = arena();
    let spell: Arc<dyn Skill> = Arc::new(AttackSkill::new(
        SkillMeta::new("shock").with_tag("melee").with_tag("magic"),
        DamageType::Lightning,
    ));
    let data = swing(&board, attacker, defender, spell);
    let outcome = combat::resolve_attack(&mut board, &data).expect("attack resolves");
    assert_eq!(outcome.amount, 3.0);
    assert!(outcome.injured);
    board.process_tick();
    assert!(board.has_feature(board.entity_ref(defender), "parry"));
}

#[test]
fn attack_outcome_is_journaled() {
    let (mut board, attacker, defender) = arena();
    board.drain_changes();
    let data = swing(&board, attacker, defender, sword());
    combat::resolve_attack(&mut board, &data);
    let resolved: Vec<_> = board
        .drain_changes()
        .into_iter()
        .filter_map(|event| match event {
            ChangeEvent::AttackResolved { hit, amount, .. } => Some((hit, amount)),
            _ => None,
        })
        .collect();
    assert_eq!(resolved, [(true, 0.0)]);
}

#[test]
fn damage_over_time_lands_every_interval() {
    let mut board = Board::new("swamp", EngineConfig::default());
    let frog = board.spawn(Entity::new(EntityKind::Prop, "frog").with_vitals(Vitals::health(10.0)));
    board.add_feature(
        board.entity_ref(frog),
        Arc::new(DamageOverTimeCondition::new(
            FeatureMeta::new("poisoned"),
            6,
            1.0,
            DamageType::Poison,
            2,
        )),
    );
    for _ in 0..8 {
        board.process_tick();
    }
    assert_eq!(
        board.entity(frog).and_then(|e| e.vitals.current_health()),
        Some(7.0)
    );

    let rock = board.spawn(Entity::new(EntityKind::Prop, "rock"));
    combat::inflict(&mut board, rock, &DamageSource::environmental(DamageType::Poison), 5.0);
    assert!(board.entity(rock).is_some_and(|e| e.vitals.current_health().is_none()));
}
