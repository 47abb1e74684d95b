//! Event payloads and their topics.

use serde::{Deserialize, Serialize};
use vtt_core::{ChangeEvent, EntityId, Tick};

/// Topics for event routing.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Stat base, modifier and bound changes.
    Stats,
    /// Feature attach, detach, enable and disable.
    Features,
    /// Skill lifecycle.
    Skills,
    /// Attacks, injuries, health and deaths.
    Combat,
    /// Entities entering or leaving, items, messages and the clock.
    Board,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Stats,
        Topic::Features,
        Topic::Skills,
        Topic::Combat,
        Topic::Board,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A journal entry recorded by the engine.
    Change(ChangeEvent),

    /// The board clock advanced; `tick` is the new current tick.
    Ticked { tick: Tick },

    /// A creature's body lost a vital part, or a prop's health ran out.
    CreatureDied { entity: EntityId, name: String },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Change(change) => change_topic(change),
            Event::Ticked { .. } => Topic::Board,
            Event::CreatureDied { .. } => Topic::Combat,
        }
    }
}

fn change_topic(change: &ChangeEvent) -> Topic {
    match change {
        ChangeEvent::Stat { .. } => Topic::Stats,
        ChangeEvent::Feature { .. } => Topic::Features,
        ChangeEvent::SkillStarted { .. }
        | ChangeEvent::SkillExecuted { .. }
        | ChangeEvent::SkillCancelled { .. }
        | ChangeEvent::SkillCompleted { .. } => Topic::Skills,
        ChangeEvent::HealthChanged { .. }
        | ChangeEvent::InjuryAdded { .. }
        | ChangeEvent::AttackResolved { .. } => Topic::Combat,
        ChangeEvent::EntityAdded { .. }
        | ChangeEvent::EntityRemoved { .. }
        | ChangeEvent::ItemGiven { .. }
        | ChangeEvent::ItemEquipped { .. }
        | ChangeEvent::Message { .. } => Topic::Board,
    }
}

impl From<ChangeEvent> for Event {
    fn from(change: ChangeEvent) -> Self {
        Event::Change(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_entries_route_by_kind() {
        let injury = Event::Change(ChangeEvent::HealthChanged {
            entity: EntityId(1),
            old: 5.0,
            new: 2.0,
        });
        assert_eq!(injury.topic(), Topic::Combat);

        let message = Event::from(ChangeEvent::Message {
            entity: None,
            text: "door creaks".into(),
        });
        assert_eq!(message.topic(), Topic::Board);

        let skill = Event::from(ChangeEvent::SkillCompleted {
            entity: EntityId(1),
            skill: "slash".into(),
            instance: 7,
        });
        assert_eq!(skill.topic(), Topic::Skills);
    }
}
