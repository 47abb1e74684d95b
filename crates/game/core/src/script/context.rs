//! Inputs and outputs of a script run.
//!
//! Scripts never touch the board. They read a [`ScriptContext`] snapshot and
//! return a value plus a list of requested [`Effect`]s that the engine applies
//! afterwards through [`apply_effects`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::combat::{self, DamageSource, DamageType};
use crate::refs::FeatureContainerRef;
use crate::state::{Board, ChangeEvent, EntityId, Tick};

// ============================================================================
// Values
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
    #[default]
    Null,
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Bool(b) => *b,
            Self::Str(s) => !s.is_empty(),
            Self::Null => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Which participant a script refers to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// The entity holding the feature, or executing the skill.
    Holder,
    /// The attacker, when there is one.
    Source,
    /// The defender or the skill's first target.
    Target,
}

// ============================================================================
// Context
// ============================================================================

/// Read-only copy of the parts of an entity scripts may inspect.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub stats: BTreeMap<String, f32>,
    pub features: BTreeSet<String>,
}

impl EntityView {
    pub fn capture(board: &Board, id: EntityId) -> Option<Self> {
        let entity = board.entity(id)?;
        Some(Self {
            id,
            stats: entity.stats.values(),
            features: entity
                .features
                .iter()
                .filter(|entry| entry.enabled)
                .map(|entry| entry.feature.id().to_string())
                .collect(),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScriptContext {
    pub tick: Tick,
    pub elapsed: Option<u64>,
    pub amount: Option<f32>,
    pub hit: Option<bool>,
    pub interrupted: Option<bool>,
    pub layer: Option<String>,
    pub args: usize,
    pub tags: BTreeSet<String>,
    pub damage_type: Option<DamageType>,
    /// Values stored by `set_data`, already stripped of their namespace.
    pub data: BTreeMap<String, f64>,
    roles: BTreeMap<Role, EntityView>,
}

impl ScriptContext {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Captures `id` from `board` under `role`; missing entities are skipped.
    pub fn with_entity(mut self, role: Role, board: &Board, id: Option<EntityId>) -> Self {
        if let Some(view) = id.and_then(|id| EntityView::capture(board, id)) {
            self.roles.insert(role, view);
        }
        self
    }

    pub fn with_view(mut self, role: Role, view: EntityView) -> Self {
        self.roles.insert(role, view);
        self
    }

    pub fn with_source(mut self, source: &DamageSource) -> Self {
        self.damage_type = Some(source.damage_type);
        if let Some(skill) = &source.skill {
            self.tags.extend(skill.meta().tags.iter().cloned());
        }
        self.args = source.args.len();
        self
    }

    pub fn with_amount(mut self, amount: f32) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_hit(mut self, hit: bool) -> Self {
        self.hit = Some(hit);
        self
    }

    pub fn view(&self, role: Role) -> Option<&EntityView> {
        self.roles.get(&role)
    }
}

// ============================================================================
// Effects
// ============================================================================

/// A state change requested by a script.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Damage {
        role: Role,
        amount: f32,
        damage_type: Option<DamageType>,
    },
    Log(String),
    RemoveSelf,
    SetData {
        key: String,
        value: f64,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptOutcome {
    pub value: Value,
    pub effects: Vec<Effect>,
}

/// Where effects land.
#[derive(Clone, Debug)]
pub struct EffectScope {
    pub roles: BTreeMap<Role, EntityId>,
    /// Feature running the script, for `remove_self` and `set_data`.
    pub feature: Option<(FeatureContainerRef, String)>,
    /// Skill instance running the script, for `remove_self`.
    pub skill: Option<(EntityId, u64)>,
    pub damage_type: DamageType,
}

impl EffectScope {
    pub fn new(damage_type: DamageType) -> Self {
        Self {
            roles: BTreeMap::new(),
            feature: None,
            skill: None,
            damage_type,
        }
    }

    pub fn with_role(mut self, role: Role, id: Option<EntityId>) -> Self {
        if let Some(id) = id {
            self.roles.insert(role, id);
        }
        self
    }
}

/// Prefix of the feature data keys scripts read and write.
pub fn data_prefix(feature: &str) -> String {
    format!("{feature}:var:")
}

/// Namespaced feature data key used by `set_data`/`data`.
pub fn data_key(feature: &str, key: &str) -> String {
    format!("{}{key}", data_prefix(feature))
}

/// Applies requested effects in order.
pub fn apply_effects(board: &mut Board, scope: &EffectScope, effects: Vec<Effect>) {
    let holder = scope.roles.get(&Role::Holder).copied();
    for effect in effects {
        match effect {
            Effect::Damage {
                role,
                amount,
                damage_type,
            } => {
                let Some(&target) = scope.roles.get(&role) else {
                    tracing::debug!(target: "vtt::script", %role, "damage target not present");
                    continue;
                };
                let damage_type = damage_type.unwrap_or(scope.damage_type);
                let source = match holder {
                    Some(attacker) => DamageSource::from_attacker(damage_type, attacker),
                    None => DamageSource::environmental(damage_type),
                };
                combat::inflict(board, target, &source, amount);
            }
            Effect::Log(text) => {
                tracing::info!(target: "vtt::script", entity = ?holder, "{text}");
                board.record(ChangeEvent::Message {
                    entity: holder,
                    text,
                });
            }
            Effect::RemoveSelf => {
                if let Some((container, id)) = &scope.feature {
                    board.remove_feature_later(container.clone(), id.clone());
                } else if let Some((executor, instance)) = scope.skill {
                    board.run_task_later(0, move |board| {
                        board.interrupt_skill(executor, instance);
                    });
                }
            }
            Effect::SetData { key, value } => {
                let Some((container, id)) = &scope.feature else {
                    tracing::debug!(target: "vtt::script", %key, "set_data outside a feature");
                    continue;
                };
                if let Some(data) = board.feature_data_mut(container) {
                    data.set_f64(&data_key(id, &key), value);
                }
            }
        }
    }
}
