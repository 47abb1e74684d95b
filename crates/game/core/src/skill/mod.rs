//! Timed actions performed by entities.
//!
//! A [`Skill`] is shared compendium content. Each use creates a [`SkillData`]
//! instance bound to an executor, its arguments and the layers it occupies;
//! the board drives the instance through its lifecycle:
//!
//! ```text
//! bind args -> can_be_used -> start -> (delay) -> execute [x duration] -> complete
//!                                          \-> cancel / interrupt
//! ```
//!
//! Every hook has a permissive default so simple skills only override what
//! they need.

pub mod arbitrary;
pub mod argument;
pub mod attack;
pub mod data;
pub mod lifecycle;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

pub use arbitrary::ArbitrarySkill;
pub use argument::{ArgumentType, SkillArgument};
pub use attack::AttackSkill;
pub use data::{ActiveSkill, SkillData};

use crate::combat::{AttackOutcome, DamageType};
use crate::content::{ContentError, Fields, json::display_value};
use crate::error::{ErrorSeverity, GameError};
use crate::state::{Board, EntityId, Tick};
use crate::wire::{WireError, WireReader, WireWriter};

// ============================================================================
// Errors
// ============================================================================

/// Why a skill could not be bound, started or cancelled.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SkillError {
    #[error("entity {0} does not exist")]
    UnknownExecutor(EntityId),

    #[error("expected at most {expected} arguments, got {got}")]
    TooManyArguments { expected: usize, got: usize },

    #[error("argument {slot} is a {found}, expected one of {expected:?}")]
    ArgumentType {
        slot: usize,
        found: ArgumentType,
        expected: Vec<ArgumentType>,
    },

    #[error("argument {slot} cannot be used: {reason}")]
    UnusableArgument { slot: usize, reason: String },

    #[error("skill cannot be used: {0}")]
    Unavailable(String),

    #[error("skill denied by a feature{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Denied(Option<String>),

    #[error("skill `{skill}` is cooling down until {until}")]
    CoolingDown { skill: String, until: Tick },

    #[error("layer `{0}` is already busy")]
    LayerBusy(String),

    #[error("skill occupies {requested} layers, at most {max} allowed")]
    TooManyLayers { requested: usize, max: usize },

    #[error("no active skill instance {0}")]
    NotActive(u64),

    #[error("skill instance {0} refuses to be cancelled")]
    NotCancellable(u64),
}

impl GameError for SkillError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CoolingDown { .. }
            | Self::LayerBusy(_)
            | Self::UnknownExecutor(_)
            | Self::NotActive(_) => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownExecutor(_) => "SKILL_UNKNOWN_EXECUTOR",
            Self::TooManyArguments { .. } => "SKILL_TOO_MANY_ARGUMENTS",
            Self::ArgumentType { .. } => "SKILL_ARGUMENT_TYPE",
            Self::UnusableArgument { .. } => "SKILL_UNUSABLE_ARGUMENT",
            Self::Unavailable(_) => "SKILL_UNAVAILABLE",
            Self::Denied(_) => "SKILL_DENIED",
            Self::CoolingDown { .. } => "SKILL_COOLING_DOWN",
            Self::LayerBusy(_) => "SKILL_LAYER_BUSY",
            Self::TooManyLayers { .. } => "SKILL_TOO_MANY_LAYERS",
            Self::NotActive(_) => "SKILL_NOT_ACTIVE",
            Self::NotCancellable(_) => "SKILL_NOT_CANCELLABLE",
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Argument types accepted by one slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentSlot {
    pub accepts: Vec<ArgumentType>,
}

impl ArgumentSlot {
    pub fn new(accepts: impl IntoIterator<Item = ArgumentType>) -> Self {
        Self {
            accepts: accepts.into_iter().collect(),
        }
    }

    pub fn accepts(&self, argument: &SkillArgument) -> bool {
        self.accepts.contains(&argument.argument_type())
    }
}

/// Fields shared by every skill kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkillMeta {
    pub id: String,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Layer the skill runs on; the board's default layer when unset.
    pub layer: Option<String>,
    /// Qualification tags such as `melee`, `magic` or `projectile`.
    pub tags: BTreeSet<String>,
    pub arguments: Vec<ArgumentSlot>,
}

impl SkillMeta {
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

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_slot(mut self, slot: ArgumentSlot) -> Self {
        self.arguments.push(slot);
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// `[id][name?][icon?][layer?][description?][tagCount:u8]{tag}[slotCount:u8]{[n:u8]{type:u8}}`
    pub fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(&self.id)?;
        w.put_opt_str(self.name.as_deref())?;
        w.put_opt_str(self.icon.as_deref())?;
        w.put_opt_str(self.layer.as_deref())?;
        w.put_opt_str(self.description.as_deref())?;
        w.put_count("skill tags", self.tags.len())?;
        for tag in &self.tags {
            w.put_str(tag)?;
        }
        w.put_count("argument slots", self.arguments.len())?;
        for slot in &self.arguments {
            w.put_count("accepted argument types", slot.accepts.len())?;
            for kind in &slot.accepts {
                w.put(&kind.as_byte())?;
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let id = r.take_string()?;
        let name = r.take_opt_string()?;
        let icon = r.take_opt_string()?;
        let layer = r.take_opt_string()?;
        let description = r.take_opt_string()?;
        let tags = (0..r.take_count()?)
            .map(|_| r.take_string())
            .collect::<Result<_, _>>()?;
        let slots = r.take_count()?;
        let mut arguments = Vec::with_capacity(slots);
        for _ in 0..slots {
            let accepts = (0..r.take_count()?)
                .map(|_| {
                    let byte = r.take::<u8>()?;
                    ArgumentType::from_repr(byte).ok_or(WireError::UnknownDiscriminant {
                        what: "argument type",
                        value: byte,
                    })
                })
                .collect::<Result<_, _>>()?;
            arguments.push(ArgumentSlot { accepts });
        }
        Ok(Self {
            id,
            name,
            icon,
            description,
            layer,
            tags,
            arguments,
        })
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        Ok(Self {
            id: fields.entry().to_string(),
            name: fields.display_str("name")?,
            icon: fields.display_str("icon")?,
            description: fields.display_str("description")?,
            layer: fields
                .optional_str("layer")?
                .filter(|layer| !layer.is_empty())
                .map(str::to_string),
            tags: fields.string_set("tags")?,
            arguments: fields.parse("arguments")?.unwrap_or_default(),
        })
    }

    pub fn to_json(&self, kind: &str) -> Map<String, Json> {
        let mut obj = Map::new();
        obj.insert("type".into(), Json::String(kind.to_string()));
        obj.insert("name".into(), display_value(self.name.as_deref()));
        obj.insert("icon".into(), display_value(self.icon.as_deref()));
        obj.insert(
            "description".into(),
            display_value(self.description.as_deref()),
        );
        if let Some(layer) = &self.layer {
            obj.insert("layer".into(), Json::String(layer.clone()));
        }
        obj.insert(
            "tags".into(),
            Json::Array(self.tags.iter().cloned().map(Json::String).collect()),
        );
        obj.insert(
            "arguments".into(),
            serde_json::to_value(&self.arguments).unwrap_or(Json::Null),
        );
        obj
    }
}

// ============================================================================
// Skill Trait
// ============================================================================

/// Damage contract of attack skills, consumed by the combat pipeline.
pub trait AttackBehavior {
    /// Whether `target` may be attacked at all.
    fn can_target(&self, _board: &Board, _data: &SkillData, _target: EntityId) -> bool {
        true
    }

    /// Raw amount and type before feature modifiers.
    fn damage(&self, board: &Board, data: &SkillData, target: EntityId) -> (f32, DamageType);

    /// Primary hit roll, before features weigh in.
    fn does_hit(&self, _board: &mut Board, _data: &SkillData, _target: EntityId) -> bool {
        true
    }

    /// Runs after the pipeline applied a hit.
    fn on_hit(&self, _board: &mut Board, _data: &SkillData, _outcome: &AttackOutcome) {}
}

/// Performable action. Lifecycle hooks are called by the board in order.
pub trait Skill: Send + Sync + fmt::Debug {
    fn meta(&self) -> &SkillMeta;

    /// Stable wire type name, e.g. `vtt.skill.AttackSkill`.
    fn type_name(&self) -> &'static str;

    /// Compendium `type` tag.
    fn kind(&self) -> &'static str;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(self.type_name())?;
        self.meta().encode(w)?;
        self.encode_fields(w)
    }

    fn encode_fields(&self, _w: &mut WireWriter) -> Result<(), WireError> {
        Ok(())
    }

    fn to_json(&self) -> Json;

    /// Present on skills whose execution runs the attack pipeline.
    fn attack(&self) -> Option<&dyn AttackBehavior> {
        None
    }

    // ------------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------------

    /// Type check of `args` against the declared slots, in order.
    ///
    /// Fewer arguments than slots is accepted; extra arguments are not.
    fn validate_arguments(&self, args: &[SkillArgument]) -> Result<(), SkillError> {
        let slots = &self.meta().arguments;
        if args.len() > slots.len() {
            return Err(SkillError::TooManyArguments {
                expected: slots.len(),
                got: args.len(),
            });
        }
        for (slot, (argument, accepted)) in args.iter().zip(slots).enumerate() {
            if !accepted.accepts(argument) {
                return Err(SkillError::ArgumentType {
                    slot,
                    found: argument.argument_type(),
                    expected: accepted.accepts.clone(),
                });
            }
        }
        Ok(())
    }

    /// Context-aware check of a single argument, for pickers and validation.
    fn can_use_argument(
        &self,
        _board: &Board,
        _executor: EntityId,
        _slot: usize,
        _argument: &SkillArgument,
    ) -> Result<(), String> {
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn can_be_used(&self, _board: &Board, _data: &SkillData) -> Result<(), String> {
        Ok(())
    }

    /// Immediate feedback when the skill is started.
    fn start(&self, _board: &mut Board, _data: &SkillData) {}

    /// Ticks between start and the first execution.
    fn delay(&self, _board: &Board, _data: &SkillData) -> u64 {
        0
    }

    /// Ticks the executor waits after completion before using it again.
    fn cooldown(&self, _board: &Board, _data: &SkillData) -> u64 {
        0
    }

    /// Extra executions, one per tick, after the first.
    fn duration(&self, _board: &Board, _data: &SkillData) -> u64 {
        0
    }

    /// Layers the instance occupies; empty means the skill's own layer.
    fn layers(&self, _board: &Board, _data: &SkillData) -> Vec<String> {
        Vec::new()
    }

    /// Runs once per occupied layer each time the instance is due.
    fn execute(&self, board: &mut Board, data: &SkillData, _layer: &str) {
        if self.attack().is_some() {
            crate::combat::resolve_attack(board, data);
        }
    }

    fn can_cancel(&self, _board: &Board, _data: &SkillData) -> bool {
        true
    }

    /// Cleanup. `interrupted` distinguishes forced interruption from a
    /// voluntary cancel.
    fn cancel(&self, _board: &mut Board, _data: &SkillData, _interrupted: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::EntityRef;
    use crate::state::{BodyPartPath, Vec3};

    #[derive(Debug)]
    struct Poke(SkillMeta);

    impl Skill for Poke {
        fn meta(&self) -> &SkillMeta {
            &self.0
        }

        fn type_name(&self) -> &'static str {
            "test.Poke"
        }

        fn kind(&self) -> &'static str {
            "poke"
        }

        fn to_json(&self) -> Json {
            Json::Object(self.0.to_json("poke"))
        }
    }

    fn poke() -> Poke {
        Poke(
            SkillMeta::new("poke")
                .with_slot(ArgumentSlot::new([ArgumentType::Entity, ArgumentType::BodyPart]))
                .with_slot(ArgumentSlot::new([ArgumentType::Boolean])),
        )
    }

    #[test]
    fn rejects_more_arguments_than_slots() {
        let args = vec![
            SkillArgument::Entity(EntityRef::new("t", EntityId(1))),
            SkillArgument::Boolean(true),
            SkillArgument::Boolean(false),
        ];
        assert_eq!(
            poke().validate_arguments(&args),
            Err(SkillError::TooManyArguments {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn rejects_wrong_type_even_with_right_arity() {
        let args = vec![
            SkillArgument::Position(Vec3::ZERO),
            SkillArgument::Boolean(true),
        ];
        assert!(matches!(
            poke().validate_arguments(&args),
            Err(SkillError::ArgumentType {
                slot: 0,
                found: ArgumentType::Position,
                ..
            })
        ));
    }

    #[test]
    fn accepts_any_declared_type_and_short_lists() {
        let part = EntityRef::new("t", EntityId(1)).body_part(BodyPartPath(vec![0]));
        assert!(poke()
            .validate_arguments(&[SkillArgument::BodyPart(part), SkillArgument::Boolean(true)])
            .is_ok());
        assert!(poke().validate_arguments(&[]).is_ok());
    }

    #[test]
    fn meta_header_roundtrip() {
        let meta = SkillMeta::new("slash")
            .named("Slash")
            .on_layer("hands")
            .with_tag("melee")
            .with_slot(ArgumentSlot::new([ArgumentType::Entity]));
        let mut w = WireWriter::new();
        meta.encode(&mut w).expect("encode");
        let bytes = w.finish();
        let mut r = WireReader::new(&bytes);
        assert_eq!(SkillMeta::decode(&mut r).expect("decode"), meta);
        r.finish().expect("consumed");
    }
}
