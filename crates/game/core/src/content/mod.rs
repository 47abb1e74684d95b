//! Compendium authoring form.
//!
//! Every feature and skill kind reads itself from a JSON object keyed by a
//! `"type"` tag and writes itself back with `to_json`. A malformed entry
//! yields a [`ContentError`] for that entry alone; loaders log it and move on.

pub mod json;

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ErrorSeverity, GameError};
use crate::feature::{
    ArbitraryFeature, DamageOverTimeCondition, Feature, ParryingFeature, SimpleCondition,
    SimpleFeature,
};
use crate::script::ScriptError;
use crate::skill::{ArbitrarySkill, AttackSkill, Skill};

pub use json::Fields;

/// A single compendium entry could not be built.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("entry `{entry}` is not a JSON object")]
    NotAnObject { entry: String },

    #[error("entry `{entry}` is missing `{field}`")]
    MissingField { entry: String, field: &'static str },

    #[error("entry `{entry}` has an invalid `{field}`: {reason}")]
    InvalidField {
        entry: String,
        field: String,
        reason: String,
    },

    #[error("entry `{entry}` has unknown type `{kind}`")]
    UnknownKind { entry: String, kind: String },

    #[error("entry `{entry}` declares unknown hook `{hook}`")]
    UnknownHook { entry: String, hook: String },

    #[error("entry `{entry}` hook `{hook}` does not compile: {source}")]
    Script {
        entry: String,
        hook: String,
        #[source]
        source: ScriptError,
    },
}

impl GameError for ContentError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnObject { .. } => "CONTENT_NOT_AN_OBJECT",
            Self::MissingField { .. } => "CONTENT_MISSING_FIELD",
            Self::InvalidField { .. } => "CONTENT_INVALID_FIELD",
            Self::UnknownKind { .. } => "CONTENT_UNKNOWN_KIND",
            Self::UnknownHook { .. } => "CONTENT_UNKNOWN_HOOK",
            Self::Script { .. } => "CONTENT_SCRIPT",
        }
    }
}

/// Keys shared by every entry; anything else on an arbitrary entry is a hook.
pub const COMMON_KEYS: &[&str] = &[
    "type",
    "name",
    "icon",
    "description",
    "toggleable",
    "modifiers",
    "tags",
    "layer",
    "arguments",
];

/// Builds a feature from its compendium entry.
pub fn feature_from_json(id: &str, value: &Value) -> Result<Arc<dyn Feature>, ContentError> {
    let fields = Fields::new(id, value)?;
    let feature: Arc<dyn Feature> = match fields.required_str("type")? {
        SimpleFeature::KIND => Arc::new(SimpleFeature::from_json(fields)?),
        SimpleCondition::KIND => Arc::new(SimpleCondition::from_json(fields)?),
        DamageOverTimeCondition::KIND => Arc::new(DamageOverTimeCondition::from_json(fields)?),
        ParryingFeature::KIND => Arc::new(ParryingFeature::from_json(fields)?),
        ArbitraryFeature::KIND => Arc::new(ArbitraryFeature::from_json(fields)?),
        other => {
            return Err(ContentError::UnknownKind {
                entry: id.to_string(),
                kind: other.to_string(),
            });
        }
    };
    Ok(feature)
}

/// Builds a skill from its compendium entry.
pub fn skill_from_json(id: &str, value: &Value) -> Result<Arc<dyn Skill>, ContentError> {
    let fields = Fields::new(id, value)?;
    let skill: Arc<dyn Skill> = match fields.required_str("type")? {
        ArbitrarySkill::KIND => Arc::new(ArbitrarySkill::from_json(fields, false)?),
        ArbitrarySkill::ATTACK_KIND => Arc::new(ArbitrarySkill::from_json(fields, true)?),
        AttackSkill::KIND => Arc::new(AttackSkill::from_json(fields)?),
        other => {
            return Err(ContentError::UnknownKind {
                entry: id.to_string(),
                kind: other.to_string(),
            });
        }
    };
    Ok(skill)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_kind_is_rejected() {
        let err = feature_from_json("x", &json!({ "type": "mystery" })).expect_err("unknown");
        assert!(matches!(err, ContentError::UnknownKind { kind, .. } if kind == "mystery"));
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let err = feature_from_json("x", &json!({ "type": "simple", "name": "Blessed" }))
            .expect_err("icon missing");
        assert!(matches!(err, ContentError::MissingField { field: "icon", .. }));
    }

    #[test]
    fn every_feature_kind_survives_json() {
        let entries = [
            json!({ "type": "simple", "name": "Blessed", "icon": "", "description": "",
                    "modifiers": { "luck": [{ "id": "bless", "value": 1.0, "kind": "Flat" }] } }),
            json!({ "type": "condition", "name": "Stunned", "icon": "stun.png",
                    "description": "Cannot act", "ticks": 3, "hidden": true }),
            json!({ "type": "damage_over_time", "name": "Burning", "icon": "", "description": "",
                    "ticks": 6, "damage": 1.5, "damage_over_type": "fire", "interval": 2 }),
            json!({ "type": "parrying", "name": "Parry", "icon": "", "description": "" }),
            json!({ "type": "arbitrary", "name": "Thorns", "icon": "", "description": "",
                    "onAttacked": "damage(source, 1)" }),
        ];
        for (i, entry) in entries.iter().enumerate() {
            let id = format!("f{i}");
            let feature = feature_from_json(&id, entry).expect("parses");
            let again = feature_from_json(&id, &feature.to_json()).expect("reparses");
            assert_eq!(again.to_json(), feature.to_json(), "entry {i}");
            assert_eq!(again.type_name(), feature.type_name());
        }
    }

    #[test]
    fn every_skill_kind_survives_json() {
        let entries = [
            json!({ "type": "basic_attack", "name": "Slash", "icon": "", "description": "",
                    "tags": ["melee"], "damage_type": "slash", "damage_multiplier": 1.5,
                    "delay": 1, "cooldown": 2, "stamina_cost": 3.0,
                    "arguments": [["Entity", "BodyPart"]] }),
            json!({ "type": "attack", "name": "Bite", "icon": "", "description": "",
                    "tags": ["melee"], "damage_type": "pierce",
                    "damage": "stat(holder, \"attack\") * 2", "doesHit": "true" }),
            json!({ "type": "arbitrary", "name": "Shout", "icon": "", "description": "",
                    "execute": "log(\"hey\")", "delay": "2" }),
        ];
        for (i, entry) in entries.iter().enumerate() {
            let id = format!("s{i}");
            let skill = skill_from_json(&id, entry).expect("parses");
            let again = skill_from_json(&id, &skill.to_json()).expect("reparses");
            assert_eq!(again.to_json(), skill.to_json(), "entry {i}");
        }
    }

    #[test]
    fn layer_is_optional_and_kept_when_set() {
        let bare = json!({ "type": "attack", "name": "Bite", "icon": "", "description": "",
                           "damage_type": "pierce", "damage": "2" });
        let skill = skill_from_json("bite", &bare).expect("no layer needed");
        assert_eq!(skill.meta().layer, None);
        assert!(skill.to_json().get("layer").is_none());
        skill_from_json("bite", &skill.to_json()).expect("reparses without layer");

        let layered = json!({ "type": "basic_attack", "name": "Slash", "icon": "",
                              "description": "", "damage_type": "slash", "layer": "hands" });
        let skill = skill_from_json("slash", &layered).expect("parses");
        let again = skill_from_json("slash", &skill.to_json()).expect("reparses");
        assert_eq!(again.meta().layer.as_deref(), Some("hands"));
    }

    #[test]
    fn broken_script_is_a_content_error() {
        let err = skill_from_json(
            "x",
            &json!({ "type": "arbitrary", "name": "", "icon": "", "description": "",
                     "execute": "damage(target," }),
        )
        .expect_err("does not compile");
        assert!(matches!(err, ContentError::Script { hook, .. } if hook == "execute"));
    }

    #[test]
    fn unknown_hook_is_a_content_error() {
        let err = feature_from_json(
            "x",
            &json!({ "type": "arbitrary", "name": "", "icon": "", "description": "",
                     "onSneeze": "1" }),
        )
        .expect_err("unknown hook");
        assert!(matches!(err, ContentError::UnknownHook { hook, .. } if hook == "onSneeze"));
    }
}
