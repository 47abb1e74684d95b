//! Deterministic behaviour engine for a virtual tabletop.
//!
//! `vtt-core` defines the simulation rules shared by the authoritative server
//! and observing clients: entities on a [`Board`], stats with layered
//! modifiers, attachable [`Feature`]s, timed [`Skill`]s, creature bodies and
//! the damage pipeline that ties them together. Every polymorphic object can be
//! addressed by a reference type and round-tripped through the [`wire`] codec
//! or the compendium JSON form in [`content`].
//!
//! All state mutation flows through [`Board`]; callers that live on other
//! threads must funnel their requests through a single writer (the runtime's
//! simulation worker) rather than sharing a board.
pub mod combat;
pub mod config;
pub mod content;
pub mod error;
pub mod feature;
pub mod refs;
pub mod registry;
pub mod script;
pub mod skill;
pub mod state;
pub mod stats;
pub mod wire;

pub use combat::{AttackOutcome, DamageSource, DamageType};
pub use config::EngineConfig;
pub use content::ContentError;
pub use error::{ErrorSeverity, GameError};
pub use feature::{Feature, FeatureData, FeatureHolder, FeatureMeta, Verdict};
pub use refs::{
    BodyPartRef, EntityRef, FeatureContainerRef, ItemRef, SkillSourceRef, SkillTreeEntryRef,
};
pub use registry::{CompendiumEntry, ContentRegistry};
pub use script::{Script, ScriptContext, ScriptError};
pub use skill::{
    ArgumentSlot, ArgumentType, AttackBehavior, Skill, SkillArgument, SkillData, SkillError,
    SkillMeta,
};
pub use state::{
    Board, Body, BodyPart, BodyPartPath, ChangeEvent, Entity, EntityId, EntityKind,
    EntitySnapshot, Floor, Injury, Item, ItemId, ItemProperty, PlayerId, Tick, Vec3, Vitals,
};
pub use stats::{ModifierKind, Stat, StatBlock, StatChange, StatModifier};
pub use wire::{WireCodec, WireError, WireReader, WireRegistry, WireWriter};
