//! Binary round-trips of polymorphic content through the wire registry.

use std::sync::Arc;

use serde_json::json;
use vtt_core::feature::{
    DamageOverTimeCondition, ParryingFeature, SimpleCondition, SimpleFeature,
};
use vtt_core::refs::SkillSourceRef;
use vtt_core::skill::AttackSkill;
use vtt_core::{
    ArgumentType, BodyPartPath, ContentRegistry, DamageType, EntityId, EntityRef, Feature,
    FeatureMeta, Skill, SkillArgument, SkillData, SkillMeta, StatModifier, Vec3, WireCodec,
    WireError, WireReader, WireRegistry, WireWriter,
};

fn features() -> Vec<Arc<dyn Feature>> {
    let blessed = FeatureMeta::new("blessed")
        .named("Blessed")
        .with_modifier("accuracy", StatModifier::flat("bonus", 2.0))
        .with_modifier("accuracy", StatModifier::percent("focus", 10.0));
    vec![
        Arc::new(SimpleFeature::new(blessed)),
        Arc::new(SimpleCondition::new(FeatureMeta::new("stunned"), 5)),
        Arc::new(DamageOverTimeCondition::new(
            FeatureMeta::new("burning"),
            6,
            1.5,
            DamageType::Fire,
            2,
        )),
        Arc::new(ParryingFeature::new(FeatureMeta::new("parry"))),
    ]
}

#[test]
fn concrete_features_keep_their_observable_state() {
    let wire = WireRegistry::standard();
    let content = ContentRegistry::new();
    for feature in features() {
        let bytes = wire.feature_to_bytes(feature.as_ref()).expect("encode");
        let decoded = wire.feature_from_bytes(&bytes, &content).expect("decode");
        assert_eq!(decoded.type_name(), feature.type_name());
        assert_eq!(decoded.to_json(), feature.to_json(), "{}", feature.id());
    }
}

#[test]
fn attack_skill_keeps_its_parameters() {
    let wire = WireRegistry::standard();
    let skill = AttackSkill::new(
        SkillMeta::new("cleave").with_tag("melee"),
        DamageType::Slash,
    )
    .with_multiplier(1.5)
    .with_timing(2, 4)
    .with_stamina_cost(3.0);
    let bytes = wire.skill_to_bytes(&skill).expect("encode");
    let decoded = wire
        .skill_from_bytes(&bytes, &ContentRegistry::new())
        .expect("decode");
    assert_eq!(decoded.to_json(), skill.to_json());
    assert_eq!(decoded.meta().arguments.len(), 1);
}

#[test]
fn scripted_content_resolves_to_the_registered_instance() {
    let wire = WireRegistry::standard();
    let mut content = ContentRegistry::new();
    let feature = content
        .load_feature(
            "glow",
            &json!({ "type": "arbitrary", "name": "Glow", "icon": "", "description": "",
                     "onTick": "log(\"hum\")" }),
        )
        .expect("feature compiles");
    let skill = content
        .load_skill(
            "bite",
            &json!({ "type": "attack", "name": "Bite", "icon": "", "description": "",
                     "damage_type": "pierce", "damage": "2" }),
        )
        .expect("skill compiles");

    let bytes = wire.feature_to_bytes(feature.as_ref()).expect("encode");
    let decoded = wire.feature_from_bytes(&bytes, &content).expect("decode");
    assert!(Arc::ptr_eq(&feature, &decoded));

    let bytes = wire.skill_to_bytes(skill.as_ref()).expect("encode");
    let decoded = wire.skill_from_bytes(&bytes, &content).expect("decode");
    assert!(Arc::ptr_eq(&skill, &decoded));

    let err = wire
        .skill_from_bytes(&bytes, &ContentRegistry::new())
        .expect_err("not loaded here");
    assert!(matches!(err, WireError::UnknownContent { id, .. } if id == "bite"));
}

#[test]
fn skill_data_survives_the_wire() {
    let wire = WireRegistry::standard();
    let content = ContentRegistry::new();
    let goblin = EntityRef::new("table", EntityId(4));
    let skill: Arc<dyn Skill> = Arc::new(AttackSkill::new(SkillMeta::new("stab"), DamageType::Pierce));
    let mut data = SkillData::new(
        77,
        skill,
        EntityId(1),
        vec![SkillArgument::BodyPart(goblin.body_part(BodyPartPath(vec![2, 0])))],
        SkillSourceRef::Item(EntityRef::new("table", EntityId(1)).item(vtt_core::ItemId(9))),
    );
    data.layers = vec!["main".into(), "off_hand".into()];

    let mut w = WireWriter::new();
    data.encode(&mut w, &wire).expect("encode");
    let bytes = w.finish();
    let mut r = WireReader::new(&bytes);
    let decoded = SkillData::decode(&mut r, &wire, &content).expect("decode");
    r.finish().expect("fully consumed");
    assert_eq!(decoded, data);
}

#[test]
fn arguments_lead_with_their_type_name() {
    let args = [
        SkillArgument::Position(Vec3::new(1.0, 2.0, 3.0)),
        SkillArgument::Entity(EntityRef::new("table", EntityId(2))),
        SkillArgument::Boolean(true),
    ];
    for arg in args {
        let bytes = arg.to_bytes().expect("encode");
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.take_string().expect("type"), arg.argument_type().type_name());
        assert_eq!(SkillArgument::from_bytes(&bytes).expect("decode"), arg);
    }
    assert_eq!(
        ArgumentType::Boolean.type_name(),
        "vtt.skill.argument.Boolean"
    );
}

#[test]
fn truncated_records_fail_loudly() {
    let wire = WireRegistry::standard();
    let feature = SimpleCondition::new(FeatureMeta::new("stunned"), 5);
    let bytes = wire.feature_to_bytes(&feature).expect("encode");
    assert!(wire
        .feature_from_bytes(&bytes[..bytes.len() - 2], &ContentRegistry::new())
        .is_err());
}
