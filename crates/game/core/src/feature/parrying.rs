use std::sync::Arc;

use serde_json::Value as Json;

use super::{Feature, FeatureMeta};
use crate::combat::DamageSource;
use crate::content::{ContentError, Fields};
use crate::refs::FeatureContainerRef;
use crate::registry::ContentRegistry;
use crate::state::Board;
use crate::wire::{WireError, WireReader};

/// One-shot defence: nullifies the next melee or projectile hit the holder
/// can see coming, then removes itself once the current tick completes.
#[derive(Clone, Debug, PartialEq)]
pub struct ParryingFeature {
    meta: FeatureMeta,
}

impl ParryingFeature {
    pub const TYPE_NAME: &'static str = "vtt.feature.ParryingFeature";
    pub const KIND: &'static str = "parrying";

    pub const PARRYABLE_TAGS: [&'static str; 2] = ["melee", "projectile"];

    pub fn new(meta: FeatureMeta) -> Self {
        Self { meta }
    }

    pub fn from_json(fields: Fields<'_>) -> Result<Self, ContentError> {
        Ok(Self::new(FeatureMeta::from_json(fields)?))
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        _registry: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        Ok(Arc::new(Self::new(FeatureMeta::decode(r)?)))
    }

    fn consumed_key(&self) -> String {
        format!("{}:consumed", self.id())
    }

    fn can_parry(&self, board: &Board, holder: &FeatureContainerRef, source: &DamageSource) -> bool {
        let tagged = Self::PARRYABLE_TAGS.iter().any(|tag| source.has_tag(tag));
        if !tagged || source.has_tag("magic") {
            return false;
        }
        let Some(contact) = source.contact_entity() else {
            return false;
        };
        let consumed = board
            .feature_data(holder)
            .is_some_and(|data| data.contains(&self.consumed_key()));
        !consumed && board.can_see(holder.entity().id, contact)
    }
}

impl Feature for ParryingFeature {
    fn meta(&self) -> &FeatureMeta {
        &self.meta
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn to_json(&self) -> Json {
        Json::Object(self.meta.to_json(Self::KIND))
    }

    fn on_disable(&self, data: &mut super::FeatureData) {
        data.remove(&self.consumed_key());
    }

    fn modify_receiving_damage(
        &self,
        board: &mut Board,
        holder: &FeatureContainerRef,
        source: &DamageSource,
        amount: f32,
    ) -> f32 {
        if !self.can_parry(board, holder, source) {
            return amount;
        }
        if let Some(data) = board.feature_data_mut(holder) {
            data.set(self.consumed_key(), vec![1]);
        }
        board.remove_feature_later(holder.clone(), self.id().to_string());
        tracing::debug!(holder = %holder, feature = self.id(), "parried");
        0.0
    }
}
