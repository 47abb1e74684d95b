//! Stat system: named numeric attributes with layered modifier stacks.
//!
//! # Calculation order
//!
//! ```text
//! OverrideBase → Flat → Percent → Multiplier → FlatPostMods → CapMax/CapMin → bounds → OverrideFinal
//! ```
//!
//! The order is part of the game rules. Modifiers are grouped by kind and the
//! groups are applied in this order regardless of insertion order.

pub mod block;
pub mod modifier;
pub mod stat;

pub use block::{StatBlock, StatChange};
pub use modifier::{ModifierKind, StatModifier};
pub use stat::Stat;

/// Well-known stat names read by the engine itself.
pub mod names {
    /// Attack skills scale their damage by this stat (default 1).
    pub const ATTACK: &str = "attack";
    pub const ACCURACY: &str = "accuracy";
    pub const EVASION: &str = "evasion";
    /// Spent by attack skills.
    pub const STAMINA: &str = "stamina";
    /// Maximum distance this entity can see. Unlimited when absent.
    pub const SIGHT: &str = "sight";
}
