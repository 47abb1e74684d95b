//! Ordered hook dispatch over an entity's enabled features.
//!
//! The chain of an entity is its own features in attach order, followed by
//! the features of each equipped item in inventory order. Every function
//! snapshots the chain first, so hooks may schedule removals or attach new
//! features without disturbing the iteration in progress.
//!
//! Decision hooks are asked in full even after one said no: the answers are
//! AND-combined and the last reason wins. Features such as parrying rely on
//! being consulted on every attack.

use std::sync::Arc;

use super::{Feature, Verdict};
use crate::combat::{AttackOutcome, DamageSource};
use crate::refs::FeatureContainerRef;
use crate::skill::SkillData;
use crate::state::{Board, EntityId};

pub type Chain = Vec<(FeatureContainerRef, Arc<dyn Feature>)>;

/// Snapshot of enabled features that act on behalf of `entity`.
pub fn chain(board: &Board, entity: EntityId) -> Chain {
    let Some(holder) = board.entity(entity) else {
        return Vec::new();
    };
    let entity_ref = board.entity_ref(entity);
    let mut chain: Chain = holder
        .features
        .enabled()
        .into_iter()
        .map(|feature| (FeatureContainerRef::from(entity_ref.clone()), feature))
        .collect();
    for item in holder.items().filter(|item| item.is_equipped()) {
        let container = FeatureContainerRef::from(entity_ref.item(item.id));
        chain.extend(
            item.features
                .enabled()
                .into_iter()
                .map(|feature| (container.clone(), feature)),
        );
    }
    chain
}

// ============================================================================
// Decisions
// ============================================================================

pub fn does_attack(
    board: &mut Board,
    attacker: EntityId,
    source: &DamageSource,
    target: EntityId,
    hit: bool,
) -> Verdict {
    chain(board, attacker)
        .into_iter()
        .fold(Verdict::pass(hit), |verdict, (holder, feature)| {
            let answer = feature.does_attack(board, &holder, source, target, verdict.allowed);
            verdict.and(answer)
        })
}

pub fn does_get_attacked(
    board: &mut Board,
    defender: EntityId,
    source: &DamageSource,
    hit: bool,
) -> Verdict {
    chain(board, defender)
        .into_iter()
        .fold(Verdict::pass(hit), |verdict, (holder, feature)| {
            let answer = feature.does_get_attacked(board, &holder, source, verdict.allowed);
            verdict.and(answer)
        })
}

pub fn does_execute_skill(board: &mut Board, executor: EntityId, skill: &SkillData) -> Verdict {
    chain(board, executor)
        .into_iter()
        .fold(Verdict::allow(), |verdict, (holder, feature)| {
            let answer = feature.does_execute_skill(board, &holder, skill);
            verdict.and(answer)
        })
}

// ============================================================================
// Modifiers
// ============================================================================

pub fn modify_attacking_damage(
    board: &mut Board,
    attacker: EntityId,
    source: &DamageSource,
    target: EntityId,
    amount: f32,
) -> f32 {
    chain(board, attacker)
        .into_iter()
        .fold(amount, |amount, (holder, feature)| {
            feature.modify_attacking_damage(board, &holder, source, target, amount)
        })
}

pub fn modify_receiving_damage(
    board: &mut Board,
    defender: EntityId,
    source: &DamageSource,
    amount: f32,
) -> f32 {
    chain(board, defender)
        .into_iter()
        .fold(amount, |amount, (holder, feature)| {
            feature.modify_receiving_damage(board, &holder, source, amount)
        })
}

// ============================================================================
// Notifications
// ============================================================================

pub fn notify_tick(board: &mut Board, entity: EntityId) {
    for (holder, feature) in chain(board, entity) {
        feature.on_tick(board, &holder);
    }
}

pub fn notify_attack(
    board: &mut Board,
    attacker: EntityId,
    source: &DamageSource,
    target: EntityId,
    outcome: &AttackOutcome,
) {
    for (holder, feature) in chain(board, attacker) {
        feature.on_attack(board, &holder, source, target, outcome);
    }
}

pub fn notify_attacked(
    board: &mut Board,
    defender: EntityId,
    source: &DamageSource,
    outcome: &AttackOutcome,
) {
    for (holder, feature) in chain(board, defender) {
        feature.on_attacked(board, &holder, source, outcome);
    }
}

pub fn notify_execute_skill(board: &mut Board, executor: EntityId, skill: &SkillData) {
    for (holder, feature) in chain(board, executor) {
        feature.on_execute_skill(board, &holder, skill);
    }
}

pub fn notify_injured(board: &mut Board, entity: EntityId, source: &DamageSource, amount: f32) {
    for (holder, feature) in chain(board, entity) {
        feature.on_injured(board, &holder, source, amount);
    }
}
