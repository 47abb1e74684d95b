//! Execution context provided to hooks during evaluation.

use vtt_core::{Board, ChangeEvent, ContentRegistry, EntityId};

/// What a hook gets to look at and touch.
pub struct HookContext<'a> {
    /// Board after the command or tick (and any earlier hooks) applied.
    pub board: &'a mut Board,

    /// Compendium the board's content was loaded from.
    pub registry: &'a ContentRegistry,

    /// Journal entries produced by the command or tick.
    pub changes: &'a [ChangeEvent],
}

impl HookContext<'_> {
    /// Entities whose health or injuries changed, deduplicated, in order.
    pub fn damaged_entities(&self) -> Vec<EntityId> {
        let mut seen = Vec::new();
        for change in self.changes {
            let entity = match change {
                ChangeEvent::HealthChanged { entity, .. }
                | ChangeEvent::InjuryAdded { entity, .. } => *entity,
                _ => continue,
            };
            if !seen.contains(&entity) {
                seen.push(entity);
            }
        }
        seen
    }
}
