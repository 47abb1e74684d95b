//! Post-command hook system for runtime orchestration.
//!
//! After every command and every tick the simulation worker hands the
//! journal entries it just drained to the registered hooks. A hook may react
//! by mutating the board further and by emitting runtime events of its own.
//!
//! # Execution Order
//!
//! Hooks run sorted by priority (lower first). Journal entries recorded by a
//! hook are published after all hooks have run; they do not re-trigger hooks
//! in the same pass.

mod context;
mod death;
mod registry;

pub use context::HookContext;
pub use death::DeathHook;
pub use registry::HookRegistry;

use thiserror::Error;

use crate::events::Event;

/// Defines the criticality level of a hook for error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCriticality {
    /// Failure is returned to the caller of the command.
    Critical,

    /// Failure is logged as an error and the remaining hooks still run.
    Important,

    /// Failure is logged at debug level.
    Optional,
}

#[derive(Debug, Error)]
#[error("hook `{hook}` failed: {message}")]
pub struct HookError {
    pub hook: &'static str,
    pub message: String,
}

impl HookError {
    pub fn new(hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
        }
    }
}

/// Reaction to what a command or tick changed.
pub trait PostCommandHook: Send + Sync {
    /// Returns a human-readable name for this hook (used in logging and debugging).
    fn name(&self) -> &'static str;

    /// Lower values execute first.
    fn priority(&self) -> i32 {
        0
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Important
    }

    /// Cheap check against the drained journal entries.
    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool;

    /// Reacts to the changes. Returned events are published on the bus.
    fn execute(&self, ctx: &mut HookContext<'_>) -> Result<Vec<Event>, HookError>;
}
