//! Attack resolution and damage application.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{DamageSource, DamageType};
use crate::feature::dispatch;
use crate::skill::{SkillArgument, SkillData};
use crate::state::{Board, BodyPartPath, ChangeEvent, EntityId, Vitals};

/// Result of one resolved attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Final hit state after every feature weighed in.
    pub hit: bool,
    /// Damage after modifiers; zero on a miss.
    pub amount: f32,
    /// Last reason given by a feature, for display.
    pub reason: Option<String>,
    /// Whether damage actually landed as an injury or health loss.
    pub injured: bool,
    /// Body part aimed at, when the attack named one.
    pub part: Option<BodyPartPath>,
}

/// Resolves an attack skill instance against its first target.
///
/// # Order
///
/// 1. `can_target` gate
/// 2. raw damage from the skill
/// 3. the skill's own hit roll
/// 4. attacker's `does_attack` chain
/// 5. defender's `does_get_attacked` chain
/// 6. on a hit: attacker's then defender's damage modifiers
/// 7. damage applied to the aimed part, the body root or flat health
/// 8. `on_attack`, `on_attacked`, then `on_injured` if damage landed
///
/// Steps 4 and 5 always ask every feature, even once the answer is a miss.
/// Returns `None` when the skill is not an attack or has no valid target.
pub fn resolve_attack(board: &mut Board, data: &SkillData) -> Option<AttackOutcome> {
    let behavior = data.skill.attack()?;
    let attacker = data.executor;
    let Some(target) = data.first_target() else {
        tracing::debug!(skill = data.skill.id(), "attack without a target");
        return None;
    };

    // Step 1: gate
    if !behavior.can_target(board, data, target) {
        tracing::debug!(skill = data.skill.id(), %target, "target rejected");
        return None;
    }

    // Step 2: raw damage
    let (raw, damage_type) = behavior.damage(board, data, target);

    // Step 3: primary hit roll
    let rolled = behavior.does_hit(board, data, target);

    let source = DamageSource {
        damage_type,
        attacker: Some(attacker),
        contact: Some(attacker),
        skill: Some(Arc::clone(&data.skill)),
        args: data.args.clone(),
    };

    // Steps 4-5: feature chains, iterated in full
    let offence = dispatch::does_attack(board, attacker, &source, target, rolled);
    let defence = dispatch::does_get_attacked(board, target, &source, offence.allowed);
    let hit = offence.allowed && defence.allowed;
    let reason = defence.reason.or(offence.reason);

    let part = data.args.iter().find_map(|arg| match arg {
        SkillArgument::BodyPart(part) if part.entity.id == target => Some(part.path.clone()),
        _ => None,
    });

    // Steps 6-7: modify and apply
    let mut amount = 0.0;
    let mut injured = false;
    if hit {
        amount = dispatch::modify_attacking_damage(board, attacker, &source, target, raw);
        amount = dispatch::modify_receiving_damage(board, target, &source, amount);
        injured = apply_damage(board, target, part.as_ref(), damage_type, amount).is_some();
    }

    let outcome = AttackOutcome {
        hit,
        amount,
        reason,
        injured,
        part,
    };
    board.record(ChangeEvent::AttackResolved {
        attacker,
        target,
        skill: data.skill.id().to_string(),
        hit,
        amount,
        reason: outcome.reason.clone(),
    });
    tracing::debug!(
        skill = data.skill.id(),
        %attacker,
        %target,
        hit,
        amount,
        "attack resolved"
    );

    // Step 8: notifications
    dispatch::notify_attack(board, attacker, &source, target, &outcome);
    dispatch::notify_attacked(board, target, &source, &outcome);
    if injured {
        dispatch::notify_injured(board, target, &source, amount);
    }
    if hit {
        behavior.on_hit(board, data, &outcome);
    }
    Some(outcome)
}

/// Deals `amount` outside an attack: receiving modifiers, damage, `on_injured`.
///
/// Used by conditions and scripted effects. Returns the damage that landed.
pub fn inflict(
    board: &mut Board,
    target: EntityId,
    source: &DamageSource,
    amount: f32,
) -> Option<f32> {
    let amount = dispatch::modify_receiving_damage(board, target, source, amount);
    let landed = apply_damage(board, target, None, source.damage_type, amount)?;
    dispatch::notify_injured(board, target, source, landed);
    Some(landed)
}

/// Applies damage to the part at `part` (the body root when `None`), or to
/// flat health. Returns the damage that landed; `None` when the target has
/// no vitals, the amount is not positive, or the part is already destroyed.
pub fn apply_damage(
    board: &mut Board,
    target: EntityId,
    part: Option<&BodyPartPath>,
    damage_type: DamageType,
    amount: f32,
) -> Option<f32> {
    if amount <= 0.0 || !amount.is_finite() {
        return None;
    }
    let entity = board.entity_mut(target)?;
    let event = match &mut entity.vitals {
        Vitals::Body(body) => {
            let path = part.cloned().unwrap_or_default();
            if !body.is_part_alive(&path) {
                return None;
            }
            let injury = body.injure(&path, damage_type, amount)?;
            ChangeEvent::InjuryAdded {
                entity: target,
                part: path,
                injury,
            }
        }
        Vitals::Health { current, .. } => {
            if *current <= 0.0 {
                return None;
            }
            let old = *current;
            *current = (old - amount).max(0.0);
            ChangeEvent::HealthChanged {
                entity: target,
                old,
                new: *current,
            }
        }
        Vitals::None => return None,
    };
    let landed = match &event {
        ChangeEvent::InjuryAdded { injury, .. } => injury.severity,
        ChangeEvent::HealthChanged { old, new, .. } => old - new,
        _ => amount,
    };
    board.record(event);
    Some(landed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::state::{Body, Entity, EntityKind};

    #[test]
    fn flat_health_is_clamped_at_zero() {
        let mut board = Board::new("table", EngineConfig::default());
        let door = board.spawn(Entity::new(EntityKind::Prop, "door").with_vitals(Vitals::health(4.0)));
        assert_eq!(apply_damage(&mut board, door, None, DamageType::Blunt, 6.0), Some(4.0));
        assert_eq!(board.entity(door).and_then(|e| e.vitals.current_health()), Some(0.0));
        assert_eq!(apply_damage(&mut board, door, None, DamageType::Blunt, 1.0), None);
    }

    #[test]
    fn body_damage_lands_on_the_root_by_default() {
        let mut board = Board::new("table", EngineConfig::default());
        let orc = board.spawn(
            Entity::new(EntityKind::Creature, "orc").with_vitals(Vitals::Body(Body::humanoid(10.0))),
        );
        inflict(&mut board, orc, &DamageSource::environmental(DamageType::Fire), 3.0);
        let events = board.drain_changes();
        assert!(events.iter().any(|e| matches!(
            e,
            ChangeEvent::InjuryAdded { part, injury, .. }
                if part.is_root() && injury.severity == 3.0
        )));
    }

    #[test]
    fn zero_damage_lands_nothing() {
        let mut board = Board::new("table", EngineConfig::default());
        let door = board.spawn(Entity::new(EntityKind::Prop, "door").with_vitals(Vitals::health(4.0)));
        board.drain_changes();
        assert_eq!(apply_damage(&mut board, door, None, DamageType::Blunt, 0.0), None);
        assert!(board.drain_changes().is_empty());
    }
}
