//! Timed features.
//!
//! A condition stamps the current tick into its holder's data when enabled and
//! clears it when disabled. Each tick it compares the elapsed ticks against
//! its duration and, once due, schedules its own removal as a zero-delay
//! deferred task so the holder's feature list is never mutated mid-dispatch.
//!
//! Enabled at `T` with `ticks = 5`: still attached through `T + 4`, removed
//! while processing `T + 5`.

use std::sync::Arc;

use serde_json::Value as Json;

use super::{Feature, FeatureData, FeatureMeta};
use crate::content::{ContentError, Fields};
use crate::refs::FeatureContainerRef;
use crate::registry::ContentRegistry;
use crate::state::{Board, Tick};
use crate::wire::{WireError, WireReader, WireWriter};

pub fn start_tick_key(id: &str) -> String {
    format!("{id}:start_tick")
}

pub fn stamp_start(data: &mut FeatureData, id: &str, tick: Tick) {
    data.set_u64(start_tick_key(id), tick.0);
}

pub fn clear_start(data: &mut FeatureData, id: &str) {
    data.remove(&start_tick_key(id));
}

/// Ticks since `id` was enabled on `holder`, if it carries a start tick.
pub fn elapsed(board: &Board, holder: &FeatureContainerRef, id: &str) -> Option<u64> {
    let start = board.feature_data(holder)?.get_u64(&start_tick_key(id))?;
    Some(board.current_tick().since(Tick(start)))
}

/// Schedules removal once `elapsed >= ticks`. Returns true when due.
pub fn expire_when_due(board: &mut Board, holder: &FeatureContainerRef, id: &str, ticks: u32) -> bool {
    match elapsed(board, holder, id) {
        Some(elapsed) if elapsed >= u64::from(ticks) => {
            board.remove_feature_later(holder.clone(), id.to_string());
            true
        }
        _ => false,
    }
}

/// Condition lasting `ticks` ticks, optionally hidden from other players.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleCondition {
    meta: FeatureMeta,
    ticks: u32,
    hidden: bool,
}

impl SimpleCondition {
    pub const TYPE_NAME: &'static str = "vtt.feature.SimpleCondition";
    pub const KIND: &'static str = "condition";

    pub fn new(meta: FeatureMeta, ticks: u32) -> Self {
        Self {
            meta,
            ticks,
            hidden: false,
        }
    }

    pub fn hidden_from_others(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        Ok(Self {
            meta: FeatureMeta::from_json(fields)?,
            ticks: fields.required_u32("ticks")?,
            hidden: fields.bool_or("hidden", false)?,
        })
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        _registry: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        let meta = FeatureMeta::decode(r)?;
        let ticks = r.take()?;
        let hidden = r.take()?;
        Ok(Arc::new(Self {
            meta,
            ticks,
            hidden,
        }))
    }
}

impl Feature for SimpleCondition {
    fn meta(&self) -> &FeatureMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn hidden(&self) -> bool {
        self.hidden
    }

    fn is_condition(&self) -> bool {
        true
    }

    /// `[ticks:u32][hidden:bool]`
    fn encode_fields(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put(&self.ticks)?;
        w.put(&self.hidden)
    }

    fn to_json(&self) -> Json {
        let mut obj = self.meta.to_json(Self::KIND);
        obj.insert("ticks".into(), Json::from(self.ticks));
        obj.insert("hidden".into(), Json::Bool(self.hidden));
        Json::Object(obj)
    }

    fn on_enable(&self, data: &mut FeatureData, tick: Tick) {
        stamp_start(data, self.id(), tick);
    }

    fn on_disable(&self, data: &mut FeatureData) {
        clear_start(data, self.id());
    }

    fn on_tick(&self, board: &mut Board, holder: &FeatureContainerRef) {
        expire_when_due(board, holder, self.id(), self.ticks);
    }
}
