//! Topic-based event bus for runtime events.
//!
//! The simulation worker drains the board's change journal after every
//! command and tick and republishes each entry on the topic it belongs to, so
//! a client interested in combat never wakes up for stat churn.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{Event, Topic};
