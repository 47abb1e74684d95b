//! Damage types and attack resolution.
//!
//! Hit chance is a pure function of two stats. Everything else here walks the
//! feature chains of attacker and defender, so it takes the board mutably.
//!
//! # Core Functions
//!
//! - `resolve_attack`: full attack pipeline for an attack skill instance
//! - `inflict`: damage outside an attack (conditions, scripted effects)
//! - `apply_damage`: injury or health loss, no hooks
//! - `calculate_hit_chance`: accuracy vs evasion

pub mod damage;
pub mod hit;
pub mod pipeline;

pub use damage::{DamageSource, DamageType};
pub use hit::{calculate_hit_chance, check_hit};
pub use pipeline::{AttackOutcome, apply_damage, inflict, resolve_attack};
