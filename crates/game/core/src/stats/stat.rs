//! A single named stat and its modifier stack.
//!
//! The final value is computed in a fixed kind order:
//! `OverrideBase → Flat → Percent → Multiplier → FlatPostMods → Caps → Bounds → OverrideFinal`
//!
//! Within a kind, insertion order only matters for the override kinds (the
//! latest inserted wins) and for the order multipliers are applied, which is
//! commutative anyway. Updating an existing modifier id keeps its position.

use serde::{Deserialize, Serialize};

use super::modifier::{ModifierKind, StatModifier};

/// Named numeric attribute with optional bounds and a modifier stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    base: f32,
    min: Option<f32>,
    max: Option<f32>,
    modifiers: Vec<StatModifier>,
}

/// Result of upserting a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
    Unchanged,
}

impl Stat {
    pub fn new(base: f32) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn min(&self) -> Option<f32> {
        self.min
    }

    pub fn max(&self) -> Option<f32> {
        self.max
    }

    pub fn modifiers(&self) -> &[StatModifier] {
        &self.modifiers
    }

    pub fn modifier(&self, id: &str) -> Option<&StatModifier> {
        self.modifiers.iter().find(|m| m.id == id)
    }

    pub(crate) fn set_base(&mut self, base: f32) -> bool {
        if self.base == base {
            return false;
        }
        self.base = base;
        true
    }

    pub(crate) fn set_bounds(&mut self, min: Option<f32>, max: Option<f32>) -> bool {
        if self.min == min && self.max == max {
            return false;
        }
        self.min = min;
        self.max = max;
        true
    }

    pub(crate) fn upsert(&mut self, modifier: StatModifier) -> Upsert {
        match self.modifiers.iter_mut().find(|m| m.id == modifier.id) {
            Some(existing) if *existing == modifier => Upsert::Unchanged,
            Some(existing) => {
                *existing = modifier;
                Upsert::Updated
            }
            None => {
                self.modifiers.push(modifier);
                Upsert::Added
            }
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<StatModifier> {
        let index = self.modifiers.iter().position(|m| m.id == id)?;
        Some(self.modifiers.remove(index))
    }

    fn of_kind(&self, kind: ModifierKind) -> impl Iterator<Item = f32> + '_ {
        self.modifiers
            .iter()
            .filter(move |m| m.kind == kind)
            .map(|m| m.value)
    }

    /// Final value after applying every modifier. Pure and side-effect free.
    pub fn final_value(&self) -> f32 {
        // Step 1: Base, possibly overridden
        let base = self
            .of_kind(ModifierKind::OverrideBase)
            .last()
            .unwrap_or(self.base);

        // Step 2: Flat bonuses
        let mut value = base + self.of_kind(ModifierKind::Flat).sum::<f32>();

        // Step 3: Percentages, summed then applied once
        let percent: f32 = self.of_kind(ModifierKind::Percent).sum();
        if percent != 0.0 {
            value *= 1.0 + percent / 100.0;
        }

        // Step 4: Multipliers, sequentially
        value = self
            .of_kind(ModifierKind::Multiplier)
            .fold(value, |acc, m| acc * m);

        // Step 5: Post-multiplier flat bonuses
        value += self.of_kind(ModifierKind::FlatPostMods).sum::<f32>();

        // Step 6: Caps
        if let Some(cap) = self.of_kind(ModifierKind::CapMax).reduce(f32::min) {
            value = value.min(cap);
        }
        if let Some(floor) = self.of_kind(ModifierKind::CapMin).reduce(f32::max) {
            value = value.max(floor);
        }

        // Step 7: Stat bounds
        if let Some(max) = self.max {
            value = value.min(max);
        }
        if let Some(min) = self.min {
            value = value.max(min);
        }

        // Step 8: Final override ignores everything above
        self.of_kind(ModifierKind::OverrideFinal)
            .last()
            .unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_with(base: f32, modifiers: &[StatModifier]) -> Stat {
        let mut stat = Stat::new(base);
        for m in modifiers {
            stat.upsert(m.clone());
        }
        stat
    }

    #[test]
    fn flat_bonuses_commute() {
        let a = StatModifier::flat("a", 5.0);
        let b = StatModifier::flat("b", 3.0);
        let ab = stat_with(10.0, &[a.clone(), b.clone()]);
        let ba = stat_with(10.0, &[b, a]);
        assert_eq!(ab.final_value(), 18.0);
        assert_eq!(ab.final_value(), ba.final_value());
    }

    #[test]
    fn override_final_wins_over_percent_in_any_order() {
        let percent = StatModifier::percent("p", 50.0);
        let fixed = StatModifier::new("o", 7.0, ModifierKind::OverrideFinal);
        assert_eq!(stat_with(10.0, &[percent.clone(), fixed.clone()]).final_value(), 7.0);
        assert_eq!(stat_with(10.0, &[fixed, percent]).final_value(), 7.0);
    }

    #[test]
    fn kind_order_is_fixed() {
        // ((4 override + 2 flat) * 1.5 percent * 2 multiplier) + 1 post = 19, capped to 15
        let stat = stat_with(
            100.0,
            &[
                StatModifier::new("post", 1.0, ModifierKind::FlatPostMods),
                StatModifier::multiplier("double", 2.0),
                StatModifier::percent("half", 50.0),
                StatModifier::flat("two", 2.0),
                StatModifier::new("base", 4.0, ModifierKind::OverrideBase),
            ],
        );
        assert_eq!(stat.final_value(), 19.0);

        let capped = stat_with(
            100.0,
            &[
                StatModifier::new("base", 4.0, ModifierKind::OverrideBase),
                StatModifier::new("cap", 15.0, ModifierKind::CapMax),
                StatModifier::flat("big", 20.0),
            ],
        );
        assert_eq!(capped.final_value(), 15.0);
    }

    #[test]
    fn latest_override_base_wins() {
        let stat = stat_with(
            1.0,
            &[
                StatModifier::new("first", 5.0, ModifierKind::OverrideBase),
                StatModifier::new("second", 9.0, ModifierKind::OverrideBase),
            ],
        );
        assert_eq!(stat.final_value(), 9.0);
    }

    #[test]
    fn bounds_clamp_but_final_override_escapes() {
        let mut stat = Stat::new(50.0).with_bounds(Some(0.0), Some(20.0));
        assert_eq!(stat.final_value(), 20.0);
        stat.upsert(StatModifier::flat("debuff", -80.0));
        assert_eq!(stat.final_value(), 0.0);
        stat.upsert(StatModifier::new("god", 99.0, ModifierKind::OverrideFinal));
        assert_eq!(stat.final_value(), 99.0);
    }

    #[test]
    fn upsert_replaces_instead_of_stacking() {
        let mut stat = Stat::new(0.0);
        assert_eq!(stat.upsert(StatModifier::flat("a", 1.0)), Upsert::Added);
        assert_eq!(stat.upsert(StatModifier::flat("a", 1.0)), Upsert::Unchanged);
        assert_eq!(stat.upsert(StatModifier::flat("a", 4.0)), Upsert::Updated);
        assert_eq!(stat.final_value(), 4.0);
        assert!(stat.remove("a").is_some());
        assert!(stat.remove("a").is_none());
    }

    #[test]
    fn final_value_depends_only_on_final_set() {
        let mut churned = Stat::new(3.0);
        churned.upsert(StatModifier::percent("p", 10.0));
        churned.upsert(StatModifier::flat("tmp", 100.0));
        churned.upsert(StatModifier::flat("f", 2.0));
        churned.remove("tmp");

        let direct = stat_with(
            3.0,
            &[StatModifier::flat("f", 2.0), StatModifier::percent("p", 10.0)],
        );
        assert_eq!(churned.final_value(), direct.final_value());
    }
}
