//! Attachable behaviours: buffs, conditions and scripted hooks.
//!
//! A [`Feature`] is shared content (`Arc<dyn Feature>`); all per-holder state
//! lives in the holder's [`FeatureData`] so one compendium entry can be
//! attached to many entities at once.
//!
//! Hooks receive the board and a reference to the holder that owns the
//! feature. They run in the holder's insertion order, see [`dispatch`].

pub mod arbitrary;
pub mod condition;
pub mod damage_over_time;
pub mod dispatch;
pub mod holder;
pub mod parrying;
pub mod simple;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

pub use arbitrary::ArbitraryFeature;
pub use condition::SimpleCondition;
pub use damage_over_time::DamageOverTimeCondition;
pub use holder::{FeatureChange, FeatureEntry, FeatureHolder};
pub use parrying::ParryingFeature;
pub use simple::SimpleFeature;

use crate::combat::{AttackOutcome, DamageSource};
use crate::content::{ContentError, Fields, json::display_value};
use crate::refs::FeatureContainerRef;
use crate::skill::SkillData;
use crate::state::{Board, EntityId, Tick};
use crate::stats::StatModifier;
use crate::wire::{WireError, WireReader, WireWriter};

// ============================================================================
// Verdict
// ============================================================================

/// Answer of a decision hook, with an optional reason for the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Keeps the incoming state, used as the neutral answer of a chain link.
    pub const fn pass(allowed: bool) -> Self {
        Self {
            allowed,
            reason: None,
        }
    }

    /// AND of both answers; the later reason wins when present.
    pub fn and(self, next: Verdict) -> Verdict {
        Verdict {
            allowed: self.allowed && next.allowed,
            reason: next.reason.or(self.reason),
        }
    }
}

// ============================================================================
// Feature Data
// ============================================================================

/// Per-holder byte store for auxiliary feature state (start ticks, flags).
///
/// Keys are namespaced by feature id by convention (`"{id}:start_tick"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureData {
    values: BTreeMap<String, Vec<u8>>,
}

impl FeatureData {
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let bytes: [u8; 8] = self.get(key)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    pub fn set_u64(&mut self, key: impl Into<String>, value: u64) {
        self.set(key, value.to_le_bytes().to_vec());
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let bytes: [u8; 8] = self.get(key)?.try_into().ok()?;
        Some(f64::from_le_bytes(bytes))
    }

    pub fn set_f64(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, value.to_le_bytes().to_vec());
    }

    /// Numeric entries under `prefix`, with the prefix stripped.
    pub fn numbers_with_prefix(&self, prefix: &str) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .filter_map(|(key, bytes)| {
                let name = key.strip_prefix(prefix)?;
                let bytes: [u8; 8] = bytes.as_slice().try_into().ok()?;
                Some((name.to_string(), f64::from_le_bytes(bytes)))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Feature Metadata
// ============================================================================

/// Fields shared by every feature kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMeta {
    pub id: String,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Whether players may switch the feature on and off themselves.
    pub toggleable: bool,
    /// Modifiers applied to the holder's stats while enabled, by stat name.
    pub modifiers: BTreeMap<String, Vec<StatModifier>>,
}

impl FeatureMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_modifier(mut self, stat: impl Into<String>, modifier: StatModifier) -> Self {
        self.modifiers.entry(stat.into()).or_default().push(modifier);
        self
    }

    /// Name shown to players, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// `[id][name?][icon?][groupCount:u8]{[stat][modCount:u8]{modifier}}[description?][toggleable]`
    pub fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(&self.id)?;
        w.put_opt_str(self.name.as_deref())?;
        w.put_opt_str(self.icon.as_deref())?;
        w.put_count("modifier groups", self.modifiers.len())?;
        for (stat, modifiers) in &self.modifiers {
            w.put_str(stat)?;
            crate::wire::put_list(w, "stat modifiers", modifiers)?;
        }
        w.put_opt_str(self.description.as_deref())?;
        w.put(&self.toggleable)
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let id = r.take_string()?;
        let name = r.take_opt_string()?;
        let icon = r.take_opt_string()?;
        let groups = r.take_count()?;
        let mut modifiers = BTreeMap::new();
        for _ in 0..groups {
            let stat = r.take_string()?;
            modifiers.insert(stat, crate::wire::take_list(r)?);
        }
        let description = r.take_opt_string()?;
        let toggleable = r.take()?;
        Ok(Self {
            id,
            name,
            icon,
            description,
            toggleable,
            modifiers,
        })
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        Ok(Self {
            id: fields.entry().to_string(),
            name: fields.display_str("name")?,
            icon: fields.display_str("icon")?,
            description: fields.display_str("description")?,
            toggleable: fields.bool_or("toggleable", false)?,
            modifiers: fields.modifiers()?,
        })
    }

    /// Common JSON fields, tagged with `kind`.
    pub fn to_json(&self, kind: &str) -> Map<String, Json> {
        let mut obj = Map::new();
        obj.insert("type".into(), Json::String(kind.to_string()));
        obj.insert("name".into(), display_value(self.name.as_deref()));
        obj.insert("icon".into(), display_value(self.icon.as_deref()));
        obj.insert(
            "description".into(),
            display_value(self.description.as_deref()),
        );
        obj.insert("toggleable".into(), Json::Bool(self.toggleable));
        if !self.modifiers.is_empty() {
            obj.insert(
                "modifiers".into(),
                serde_json::to_value(&self.modifiers).unwrap_or(Json::Null),
            );
        }
        obj
    }
}

// ============================================================================
// Feature Trait
// ============================================================================

/// Attachable behaviour. Every hook has a permissive default.
///
/// Decision hooks receive the current chain state (`hit`/`allowed`) and answer
/// with a [`Verdict`]; the dispatcher ANDs all answers. Modify hooks transform
/// an amount in sequence. Notification hooks run after state changed.
pub trait Feature: Send + Sync + fmt::Debug {
    fn meta(&self) -> &FeatureMeta;

    /// Stable wire type name, e.g. `vtt.feature.SimpleFeature`.
    fn type_name(&self) -> &'static str;

    /// Compendium `type` tag.
    fn kind(&self) -> &'static str;

    fn id(&self) -> &str {
        &self.meta().id
    }

    /// Hidden features are not shown to players other than the holder's owner.
    fn hidden(&self) -> bool {
        false
    }

    /// Timed conditions are imposed on a holder; only a game master lifts them.
    fn is_condition(&self) -> bool {
        false
    }

    /// Full wire record: type name, common header, then [`Self::encode_fields`].
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.type_name())?;
        self.meta().encode(w)?;
        self.encode_fields(w)
    }

    fn encode_fields(&self, _w: &mut WireWriter) -> Result<(), WireError> {
        Ok(())
    }

    fn to_json(&self) -> Json;

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn on_enable(&self, _data: &mut FeatureData, _tick: Tick) {}

    fn on_disable(&self, _data: &mut FeatureData) {}

    fn on_tick(&self, _board: &mut Board, _holder: &FeatureContainerRef) {}

    // ------------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------------

    /// Holder is the defender.
    fn does_get_attacked(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        hit: bool,
    ) -> Verdict {
        Verdict::pass(hit)
    }

    /// Holder is the attacker.
    fn does_attack(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        _target: EntityId,
        hit: bool,
    ) -> Verdict {
        Verdict::pass(hit)
    }

    /// Holder is the executor.
    fn does_execute_skill(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _skill: &SkillData,
    ) -> Verdict {
        Verdict::allow()
    }

    // ------------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------------

    fn modify_receiving_damage(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        amount: f32,
    ) -> f32 {
        amount
    }

    fn modify_attacking_damage(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        _target: EntityId,
        amount: f32,
    ) -> f32 {
        amount
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    fn on_attacked(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        _outcome: &AttackOutcome,
    ) {
    }

    fn on_attack(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        _target: EntityId,
        _outcome: &AttackOutcome,
    ) {
    }

    fn on_execute_skill(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _skill: &SkillData,
    ) {
    }

    fn on_injured(
        &self,
        _board: &mut Board,
        _holder: &FeatureContainerRef,
        _source: &DamageSource,
        _amount: f32,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ModifierKind;

    #[test]
    fn verdicts_and_combine_with_last_reason() {
        let combined = Verdict::allow()
            .and(Verdict::deny("parried"))
            .and(Verdict::pass(true))
            .and(Verdict {
                allowed: true,
                reason: Some("lucky".into()),
            });
        assert!(!combined.allowed);
        assert_eq!(combined.reason.as_deref(), Some("lucky"));
    }

    #[test]
    fn feature_data_numbers() {
        let mut data = FeatureData::default();
        data.set_u64("burn:start_tick", 12);
        data.set_f64("thorns:count", 2.5);
        data.set_f64("thorns:rage", 1.0);
        assert_eq!(data.get_u64("burn:start_tick"), Some(12));
        assert_eq!(data.get_u64("missing"), None);
        let thorns = data.numbers_with_prefix("thorns:");
        assert_eq!(thorns.len(), 2);
        assert_eq!(thorns["count"], 2.5);
    }

    #[test]
    fn meta_header_roundtrip() {
        let meta = FeatureMeta::new("rage")
            .named("Rage")
            .with_modifier("strength", StatModifier::new("r", 2.0, ModifierKind::Flat))
            .with_modifier("armor", StatModifier::percent("r", -10.0));
        let mut w = WireWriter::new();
        meta.encode(&mut w).expect("encode");
        let bytes = w.finish();
        let mut r = WireReader::new(&bytes);
        assert_eq!(FeatureMeta::decode(&mut r).expect("decode"), meta);
        r.finish().expect("consumed");
    }
}
