use std::sync::Arc;

use serde_json::Value as Json;

use super::condition::{clear_start, elapsed, expire_when_due, stamp_start};
use super::{Feature, FeatureData, FeatureMeta};
use crate::combat::{self, DamageSource, DamageType};
use crate::content::{ContentError, Fields};
use crate::refs::FeatureContainerRef;
use crate::registry::ContentRegistry;
use crate::state::{Board, Tick};
use crate::wire::{WireError, WireReader, WireWriter};

/// Condition dealing `damage` every `interval` ticks for `ticks` ticks.
///
/// Damage lands at elapsed ticks `0, interval, 2*interval, ...` strictly
/// below `ticks`. Holders that cannot take damage are left untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageOverTimeCondition {
    meta: FeatureMeta,
    ticks: u32,
    damage: f32,
    damage_type: DamageType,
    interval: u32,
}

impl DamageOverTimeCondition {
    pub const TYPE_NAME: &'static str = "vtt.feature.DamageOverTimeCondition";
    pub const KIND: &'static str = "damage_over_time";

    pub fn new(
        meta: FeatureMeta,
        ticks: u32,
        damage: f32,
        damage_type: DamageType,
        interval: u32,
    ) -> Self {
        Self {
            meta,
            ticks,
            damage,
            damage_type,
            interval: interval.max(1),
        }
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        let damage_type = fields
            .required_str("damage_over_type")?
            .parse()
            .map_err(|_| fields.invalid("damage_over_type", "unknown damage type"))?;
        Ok(Self::new(
            FeatureMeta::from_json(fields)?,
            fields.required_u32("ticks")?,
            fields.required_f32("damage")?,
            damage_type,
            fields.u32_or("interval", 1)?,
        ))
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        _registry: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        let meta = FeatureMeta::decode(r)?;
        let ticks = r.take()?;
        let damage = r.take()?;
        let damage_type = r.take_string()?;
        let damage_type = damage_type.parse().map_err(|_| WireError::Invalid {
            what: "damage type",
            reason: damage_type,
        })?;
        let interval = r.take()?;
        Ok(Arc::new(Self::new(meta, ticks, damage, damage_type, interval)))
    }
}

impl Feature for DamageOverTimeCondition {
    fn meta(&self) -> &FeatureMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn is_condition(&self) -> bool {
        true
    }

    /// `[ticks:u32][damage:f32][type:string][interval:u32]`
    fn encode_fields(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put(&self.ticks)?;
        w.put(&self.damage)?;
        w.put_str(self.damage_type.as_ref())?;
        w.put(&self.interval)
    }

    fn to_json(&self) -> Json {
        let mut obj = self.meta.to_json(Self::KIND);
        obj.insert("ticks".into(), Json::from(self.ticks));
        obj.insert("damage".into(), Json::from(self.damage));
        obj.insert(
            "damage_over_type".into(),
            Json::String(self.damage_type.to_string()),
        );
        obj.insert("interval".into(), Json::from(self.interval));
        Json::Object(obj)
    }

    fn on_enable(&self, data: &mut FeatureData, tick: Tick) {
        stamp_start(data, self.id(), tick);
    }

    fn on_disable(&self, data: &mut FeatureData) {
        clear_start(data, self.id());
    }

    fn on_tick(&self, board: &mut Board, holder: &FeatureContainerRef) {
        let Some(elapsed) = elapsed(board, holder, self.id()) else {
            return;
        };
        if elapsed < u64::from(self.ticks) && elapsed % u64::from(self.interval) == 0 {
            let source = DamageSource::environmental(self.damage_type);
            combat::inflict(board, holder.entity().id, &source, self.damage);
        }
        expire_when_due(board, holder, self.id(), self.ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::state::{ChangeEvent, Entity, EntityKind, Vitals};

    fn burning() -> Arc<dyn Feature> {
        Arc::new(DamageOverTimeCondition::new(
            FeatureMeta::new("burning"),
            6,
            1.0,
            DamageType::Fire,
            2,
        ))
    }

    fn damage_events(board: &mut Board) -> usize {
        board
            .drain_changes()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    ChangeEvent::HealthChanged { .. } | ChangeEvent::InjuryAdded { .. }
                )
            })
            .count()
    }

    #[test]
    fn damages_three_times_over_six_ticks() {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(
            Entity::new(EntityKind::Prop, "barrel").with_vitals(Vitals::health(20.0)),
        );
        board.add_feature(board.entity_ref(id), burning());
        board.drain_changes();

        for _ in 0..10 {
            board.process_tick();
        }
        assert_eq!(damage_events(&mut board), 3);
        assert_eq!(
            board.entity(id).and_then(|e| e.vitals.current_health()),
            Some(17.0)
        );
        assert!(!board.has_feature(board.entity_ref(id), "burning"));
    }

    #[test]
    fn targets_without_vitals_take_nothing() {
        let mut board = Board::new("table", EngineConfig::default());
        let id = board.spawn(Entity::new(EntityKind::Prop, "statue"));
        board.add_feature(board.entity_ref(id), burning());
        for _ in 0..10 {
            board.process_tick();
        }
        assert_eq!(damage_events(&mut board), 0);
    }

    #[test]
    fn zero_interval_means_every_tick() {
        let dot = DamageOverTimeCondition::new(FeatureMeta::new("x"), 3, 1.0, DamageType::Cold, 0);
        assert_eq!(dot.interval, 1);
    }
}
