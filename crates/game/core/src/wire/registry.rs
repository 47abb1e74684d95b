//! Type-name tagged decoding of features and skills.
//!
//! Every concrete content type registers a decoder under its wire type name.
//! Decoders receive the [`ContentRegistry`] so scripted content can be
//! resolved by id instead of rebuilt from bytes.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{WireError, WireReader, WireWriter};
use crate::feature::{
    ArbitraryFeature, DamageOverTimeCondition, Feature, ParryingFeature, SimpleCondition,
    SimpleFeature,
};
use crate::registry::ContentRegistry;
use crate::skill::{ArbitrarySkill, AttackSkill, Skill};

pub type FeatureDecoder =
    fn(&mut WireReader<'_>, &ContentRegistry) -> Result<Arc<dyn Feature>, WireError>;
pub type SkillDecoder =
    fn(&mut WireReader<'_>, &ContentRegistry) -> Result<Arc<dyn Skill>, WireError>;

/// Closed table from wire type name to decoder.
#[derive(Clone, Debug, Default)]
pub struct WireRegistry {
    features: BTreeMap<&'static str, FeatureDecoder>,
    skills: BTreeMap<&'static str, SkillDecoder>,
}

impl WireRegistry {
    /// Registry without any types; see [`standard`](Self::standard).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every type the engine ships with.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_feature(SimpleFeature::TYPE_NAME, SimpleFeature::decode);
        registry.register_feature(SimpleCondition::TYPE_NAME, SimpleCondition::decode);
        registry.register_feature(
            DamageOverTimeCondition::TYPE_NAME,
            DamageOverTimeCondition::decode,
        );
        registry.register_feature(ParryingFeature::TYPE_NAME, ParryingFeature::decode);
        registry.register_feature(ArbitraryFeature::TYPE_NAME, ArbitraryFeature::decode);

        registry.register_skill(AttackSkill::TYPE_NAME, AttackSkill::decode);
        registry.register_skill(ArbitrarySkill::TYPE_NAME, ArbitrarySkill::decode);
        registry.register_skill(ArbitrarySkill::ATTACK_TYPE_NAME, ArbitrarySkill::decode);
        registry
    }

    pub fn register_feature(&mut self, type_name: &'static str, decoder: FeatureDecoder) {
        self.features.insert(type_name, decoder);
    }

    pub fn register_skill(&mut self, type_name: &'static str, decoder: SkillDecoder) {
        self.skills.insert(type_name, decoder);
    }

    pub fn feature_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.keys().copied()
    }

    pub fn skill_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.skills.keys().copied()
    }

    /// Writes `feature`, refusing types this registry could not read back.
    pub fn encode_feature(&self, w: &mut WireWriter, feature: &dyn Feature) -> Result<(), WireError> {
        if !self.features.contains_key(feature.type_name()) {
            return Err(WireError::UnknownType(feature.type_name().to_string()));
        }
        feature.encode(w)
    }

    pub fn decode_feature(
        &self,
        r: &mut WireReader<'_>,
        content: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        let type_name = r.take_string()?;
        let decoder = self
            .features
            .get(type_name.as_str())
            .ok_or(WireError::UnknownType(type_name))?;
        decoder(r, content)
    }

    pub fn encode_skill(&self, w: &mut WireWriter, skill: &dyn Skill) -> Result<(), WireError> {
        if !self.skills.contains_key(skill.type_name()) {
            return Err(WireError::UnknownType(skill.type_name().to_string()));
        }
        skill.encode(w)
    }

    pub fn decode_skill(
        &self,
        r: &mut WireReader<'_>,
        content: &ContentRegistry,
    ) -> Result<Arc<dyn Skill>, WireError> {
        let type_name = r.take_string()?;
        let decoder = self
            .skills
            .get(type_name.as_str())
            .ok_or(WireError::UnknownType(type_name))?;
        decoder(r, content)
    }

    /// Complete feature record from `bytes`; trailing bytes are an error.
    pub fn feature_from_bytes(
        &self,
        bytes: &[u8],
        content: &ContentRegistry,
    ) -> Result<Arc<dyn Feature>, WireError> {
        let mut r = WireReader::new(bytes);
        let feature = self.decode_feature(&mut r, content)?;
        r.finish()?;
        Ok(feature)
    }

    pub fn skill_from_bytes(
        &self,
        bytes: &[u8],
        content: &ContentRegistry,
    ) -> Result<Arc<dyn Skill>, WireError> {
        let mut r = WireReader::new(bytes);
        let skill = self.decode_skill(&mut r, content)?;
        r.finish()?;
        Ok(skill)
    }

    pub fn feature_to_bytes(&self, feature: &dyn Feature) -> Result<Vec<u8>, WireError> {
        let mut w = WireWriter::new();
        self.encode_feature(&mut w, feature)?;
        Ok(w.finish())
    }

    pub fn skill_to_bytes(&self, skill: &dyn Skill) -> Result<Vec<u8>, WireError> {
        let mut w = WireWriter::new();
        self.encode_skill(&mut w, skill)?;
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureMeta;

    #[test]
    fn unknown_type_name_is_fatal() {
        let mut w = WireWriter::new();
        w.put_str("vtt.feature.Nonexistent").expect("encode");
        let err = WireRegistry::standard()
            .feature_from_bytes(&w.finish(), &ContentRegistry::new())
            .expect_err("unknown");
        assert!(matches!(err, WireError::UnknownType(name) if name == "vtt.feature.Nonexistent"));
    }

    #[test]
    fn unregistered_types_are_not_written() {
        let feature = SimpleFeature::new(FeatureMeta::new("plain"));
        assert!(WireRegistry::empty().feature_to_bytes(&feature).is_err());
        assert!(WireRegistry::standard().feature_to_bytes(&feature).is_ok());
    }

    #[test]
    fn standard_registry_lists_every_shipped_type() {
        let registry = WireRegistry::standard();
        assert_eq!(registry.feature_types().count(), 5);
        assert_eq!(registry.skill_types().count(), 3);
    }
}
