//! Public API surface for runtime consumers.
//!
//! Re-exports the handle, command vocabulary and error types so clients can
//! depend on `vtt_runtime::api` without reaching into worker internals.

mod command;
mod errors;
mod handle;

pub use command::{Actor, CommandOutcome, Request};
pub use errors::{Result, RuntimeError};
pub use handle::RuntimeHandle;
