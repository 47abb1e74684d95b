//! Death detection.

use std::collections::BTreeSet;
use std::sync::Mutex;

use vtt_core::EntityId;

use super::{HookContext, HookCriticality, HookError, PostCommandHook};
use crate::events::Event;

/// Announces deaths and interrupts whatever the dead were doing.
///
/// An entity is reported once; further injuries to a corpse are ignored.
#[derive(Debug, Default)]
pub struct DeathHook {
    reported: Mutex<BTreeSet<EntityId>>,
}

impl DeathHook {
    pub const NAME: &'static str = "death";

    pub fn new() -> Self {
        Self::default()
    }
}

impl PostCommandHook for DeathHook {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Important
    }

    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool {
        !ctx.damaged_entities().is_empty()
    }

    fn execute(&self, ctx: &mut HookContext<'_>) -> Result<Vec<Event>, HookError> {
        let mut reported = self
            .reported
            .lock()
            .map_err(|_| HookError::new(Self::NAME, "reported set poisoned"))?;

        let mut events = Vec::new();
        for id in ctx.damaged_entities() {
            let Some(entity) = ctx.board.entity(id) else {
                continue;
            };
            if !entity.is_dead() || !reported.insert(id) {
                continue;
            }
            let name = entity.name.clone();
            let interrupted = ctx.board.interrupt_skills(id);
            tracing::info!(
                target: "runtime::hooks",
                entity = %id,
                %name,
                interrupted,
                "creature died"
            );
            events.push(Event::CreatureDied { entity: id, name });
        }
        Ok(events)
    }
}
