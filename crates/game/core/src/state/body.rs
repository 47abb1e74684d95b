//! Creature anatomy: a tree of body parts carrying injuries.
//!
//! A part's health is its maximum minus the severity of its injuries, or zero
//! when any ancestor part is dead. Parts are addressed by [`BodyPartPath`], the
//! list of child indices walked from the root.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::DamageType;
use crate::state::ItemId;

bitflags::bitflags! {
    /// Anatomical properties of a body part.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PartFlags: u8 {
        /// The creature dies when this part reaches zero health.
        const VITAL = 1 << 0;
        /// Reachable from outside the body (targetable, can hold armour).
        const EXTERNAL = 1 << 1;
        /// Can hold items.
        const GRASPING = 1 << 2;
    }
}

/// Damage recorded against a body part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Injury {
    pub damage_type: DamageType,
    pub severity: f32,
}

impl Injury {
    pub fn new(damage_type: DamageType, severity: f32) -> Self {
        Self {
            damage_type,
            severity,
        }
    }
}

/// Equipment slot hosted by a body part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSlot {
    pub name: String,
    pub item: Option<ItemId>,
}

/// Path from the root part to a descendant, as child indices.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyPartPath(pub Vec<u8>);

impl BodyPartPath {
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: u8) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

impl fmt::Display for BodyPartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// A node of the anatomy tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub name: String,
    pub max_health: f32,
    pub flags: PartFlags,
    pub injuries: Vec<Injury>,
    pub slots: Vec<EquipmentSlot>,
    /// Multipliers applied to incoming damage, looked up along the damage
    /// type's lineage (most specific entry wins).
    pub damage_modifiers: BTreeMap<DamageType, f32>,
    pub children: Vec<BodyPart>,
}

impl BodyPart {
    pub fn new(name: impl Into<String>, max_health: f32) -> Self {
        Self {
            name: name.into(),
            max_health,
            flags: PartFlags::EXTERNAL,
            injuries: Vec::new(),
            slots: Vec::new(),
            damage_modifiers: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: PartFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_child(mut self, child: BodyPart) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(EquipmentSlot {
            name: name.into(),
            item: None,
        });
        self
    }

    pub fn with_damage_modifier(mut self, damage_type: DamageType, multiplier: f32) -> Self {
        self.damage_modifiers.insert(damage_type, multiplier);
        self
    }

    /// Health ignoring ancestors: max health minus injury severities.
    pub fn own_health(&self) -> f32 {
        let taken: f32 = self.injuries.iter().map(|i| i.severity).sum();
        (self.max_health - taken).max(0.0)
    }

    /// Multiplier applied to incoming damage of `damage_type`.
    pub fn damage_multiplier(&self, damage_type: DamageType) -> f32 {
        damage_type
            .lineage()
            .find_map(|ty| self.damage_modifiers.get(&ty).copied())
            .unwrap_or(1.0)
    }

    pub fn is_external(&self) -> bool {
        self.flags.contains(PartFlags::EXTERNAL)
    }
}

/// Anatomy tree of a creature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    root: BodyPart,
}

impl Body {
    pub fn new(root: BodyPart) -> Self {
        Self { root }
    }

    /// Small humanoid template used by tests and quick spawns.
    pub fn humanoid(max_health: f32) -> Self {
        let limb = |name: &str| BodyPart::new(name, max_health * 0.5);
        let torso = BodyPart::new("torso", max_health)
            .with_flags(PartFlags::VITAL | PartFlags::EXTERNAL)
            .with_slot("chest")
            .with_child(
                BodyPart::new("head", max_health * 0.5)
                    .with_flags(PartFlags::VITAL | PartFlags::EXTERNAL)
                    .with_slot("helmet"),
            )
            .with_child(
                limb("left_arm").with_child(
                    BodyPart::new("left_hand", max_health * 0.25)
                        .with_flags(PartFlags::EXTERNAL | PartFlags::GRASPING)
                        .with_slot("left_hand"),
                ),
            )
            .with_child(
                limb("right_arm").with_child(
                    BodyPart::new("right_hand", max_health * 0.25)
                        .with_flags(PartFlags::EXTERNAL | PartFlags::GRASPING)
                        .with_slot("right_hand"),
                ),
            )
            .with_child(limb("left_leg"))
            .with_child(limb("right_leg"));
        Self::new(torso)
    }

    pub fn root(&self) -> &BodyPart {
        &self.root
    }

    pub fn part(&self, path: &BodyPartPath) -> Option<&BodyPart> {
        path.0
            .iter()
            .try_fold(&self.root, |part, &i| part.children.get(i as usize))
    }

    pub fn part_mut(&mut self, path: &BodyPartPath) -> Option<&mut BodyPart> {
        path.0
            .iter()
            .try_fold(&mut self.root, |part, &i| part.children.get_mut(i as usize))
    }

    /// Computed health of the part at `path`; zero if an ancestor is dead.
    pub fn health(&self, path: &BodyPartPath) -> Option<f32> {
        let mut part = &self.root;
        for &i in &path.0 {
            if part.own_health() <= 0.0 {
                // Still resolve the path so unknown paths stay `None`.
                return self.part(path).map(|_| 0.0);
            }
            part = part.children.get(i as usize)?;
        }
        Some(part.own_health())
    }

    pub fn is_part_alive(&self, path: &BodyPartPath) -> bool {
        self.health(path).is_some_and(|h| h > 0.0)
    }

    /// Depth-first list of every part with its path.
    pub fn parts(&self) -> Vec<(BodyPartPath, &BodyPart)> {
        let mut out = Vec::new();
        let mut stack = vec![(BodyPartPath::root(), &self.root)];
        while let Some((path, part)) = stack.pop() {
            for (i, child) in part.children.iter().enumerate().rev() {
                stack.push((path.child(i as u8), child));
            }
            out.push((path, part));
        }
        out
    }

    pub fn find(&self, name: &str) -> Option<BodyPartPath> {
        self.parts()
            .into_iter()
            .find(|(_, part)| part.name == name)
            .map(|(path, _)| path)
    }

    /// Equipment slot named `name`, on whichever part hosts it.
    pub fn slot(&self, name: &str) -> Option<&EquipmentSlot> {
        self.parts()
            .into_iter()
            .find_map(|(_, part)| part.slots.iter().find(|slot| slot.name == name))
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut EquipmentSlot> {
        let path = self.parts().into_iter().find_map(|(path, part)| {
            part.slots.iter().any(|slot| slot.name == name).then_some(path)
        })?;
        self.part_mut(&path)?
            .slots
            .iter_mut()
            .find(|slot| slot.name == name)
    }

    /// A creature is dead once any vital part has no health left.
    pub fn is_dead(&self) -> bool {
        self.parts().into_iter().any(|(path, part)| {
            part.flags.contains(PartFlags::VITAL) && !self.is_part_alive(&path)
        })
    }

    /// Records an injury of `amount` on the part at `path`, scaled by the
    /// part's damage modifiers. Returns `None` when nothing was recorded.
    pub fn injure(
        &mut self,
        path: &BodyPartPath,
        damage_type: DamageType,
        amount: f32,
    ) -> Option<Injury> {
        let part = self.part_mut(path)?;
        let severity = amount * part.damage_multiplier(damage_type);
        if severity <= 0.0 || !severity.is_finite() {
            return None;
        }
        let injury = Injury::new(damage_type, severity);
        part.injuries.push(injury.clone());
        Some(injury)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_subtracts_injury_severities() {
        let mut body = Body::humanoid(20.0);
        let arm = body.find("left_arm").expect("left arm");
        body.injure(&arm, DamageType::Slash, 4.0);
        body.injure(&arm, DamageType::Blunt, 3.0);
        assert_eq!(body.health(&arm), Some(3.0));
    }

    #[test]
    fn dead_ancestor_zeroes_descendants() {
        let mut body = Body::humanoid(20.0);
        let arm = body.find("left_arm").expect("left arm");
        let hand = body.find("left_hand").expect("left hand");
        assert_eq!(body.health(&hand), Some(5.0));

        body.injure(&arm, DamageType::Slash, 50.0);
        assert_eq!(body.health(&hand), Some(0.0));
        assert!(!body.is_part_alive(&hand));
        assert!(!body.is_dead(), "arms are not vital");
    }

    #[test]
    fn damage_modifiers_follow_type_lineage() {
        let mut body = Body::new(
            BodyPart::new("shell", 10.0).with_damage_modifier(DamageType::Sharp, 0.5),
        );
        let root = BodyPartPath::root();
        let injury = body.injure(&root, DamageType::Slash, 4.0).expect("injury");
        assert_eq!(injury.severity, 2.0);
        let injury = body.injure(&root, DamageType::Blunt, 4.0).expect("injury");
        assert_eq!(injury.severity, 4.0);
    }

    #[test]
    fn vital_part_death_kills_creature() {
        let mut body = Body::humanoid(10.0);
        let head = body.find("head").expect("head");
        body.injure(&head, DamageType::Blunt, 5.0);
        assert!(body.is_dead());
    }

    #[test]
    fn unknown_path_resolves_to_none() {
        let body = Body::humanoid(10.0);
        assert!(body.part(&BodyPartPath(vec![9])).is_none());
        assert!(body.health(&BodyPartPath(vec![9])).is_none());
    }
}
