use std::sync::Arc;

use serde_json::Value as Json;

use super::{Feature, FeatureMeta};
use crate::content::{ContentError, Fields};
use crate::registry::ContentRegistry;
use crate::wire::{WireError, WireReader};

/// Flavour feature: stat modifiers and text, no behaviour.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleFeature {
    meta: FeatureMeta,
}

impl SimpleFeature {
    pub const TYPE_NAME: &'static str = "vtt.feature.SimpleFeature";
    pub const KIND: &'static str = "simple";

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
}

impl Feature for SimpleFeature {
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
}
