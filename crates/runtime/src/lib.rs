//! Authoritative board hosting for the tabletop engine.
//!
//! This crate runs a `vtt-core` [`Board`](vtt_core::Board) on a single tokio
//! task and lets any number of clients talk to it through a cloneable
//! [`RuntimeHandle`]. Consumers embed [`Runtime`] to host a board, submit
//! [`Request`]s on behalf of an [`Actor`], and subscribe to [`Event`]s by
//! [`Topic`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`hooks`] provides post-command hooks (death detection)
//! - `workers` keeps the simulation task internal to the crate
pub mod api;
pub mod events;
pub mod hooks;
pub mod runtime;

mod workers;

pub use api::{Actor, CommandOutcome, Request, Result, RuntimeError, RuntimeHandle};
pub use events::{Event, EventBus, Topic};
pub use hooks::{DeathHook, HookContext, HookCriticality, HookError, HookRegistry, PostCommandHook};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
