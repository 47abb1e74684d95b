use std::fs;

use serde_json::json;
use tempfile::tempdir;
use vtt_content::{CompendiumLoader, CompendiumWriter, ConfigLoader, ContentFactory};
use vtt_core::{ContentRegistry, EngineConfig, Feature, Skill};

fn sample() -> serde_json::Value {
    json!({
        "features": {
            "stunned": {
                "type": "condition", "name": "Stunned", "icon": "stun.png",
                "description": "Cannot act", "ticks": 2
            },
            "burning": {
                "type": "damage_over_time", "name": "Burning", "icon": "", "description": "",
                "ticks": 6, "damage": 1, "interval": 2, "damage_over_type": "fire"
            },
            "broken": { "type": "condition", "name": "Broken", "icon": "", "description": "" },
            "weird": { "type": "mystery" },
            "glow": {
                "type": "arbitrary", "name": "Glow", "icon": "", "description": "",
                "onTick": "log(\"hum\")"
            }
        },
        "skills": {
            "slash": {
                "type": "basic_attack", "name": "Slash", "icon": "", "description": "",
                "damage_type": "slash", "tags": ["melee"]
            },
            "bad_script": {
                "type": "arbitrary", "name": "Bad", "icon": "", "description": "",
                "execute": "log("
            }
        }
    })
}

#[test]
fn bad_entries_are_skipped_not_fatal() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("compendium.json");
    fs::write(&path, sample().to_string()).expect("write");

    let (registry, report) = CompendiumLoader::load(&path).expect("file loads");
    assert_eq!(report.features, 3);
    assert_eq!(report.skills, 1);

    let mut skipped: Vec<_> = report.skipped.iter().map(|s| s.id.as_str()).collect();
    skipped.sort_unstable();
    assert_eq!(skipped, ["bad_script", "broken", "weird"]);

    assert!(registry.entry::<dyn Feature>("glow").is_some());
    assert!(registry.entry::<dyn Skill>("slash").is_some());
    assert!(registry.entry::<dyn Skill>("bad_script").is_none());
}

#[test]
fn invalid_top_level_json_fails_the_load() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("compendium.json");
    fs::write(&path, "{ not json").expect("write");
    assert!(CompendiumLoader::load(&path).is_err());
    assert!(CompendiumLoader::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn saved_compendium_loads_back_identically() {
    let dir = tempdir().expect("tempdir");
    let mut original = ContentRegistry::new();
    CompendiumLoader::apply(
        serde_json::from_value(sample()).expect("shape"),
        &mut original,
    );

    let factory = ContentFactory::new(dir.path());
    factory.save_compendium(&original).expect("save");
    let (reloaded, report) = factory.load_compendium().expect("reload");

    assert!(report.skipped.is_empty());
    assert_eq!(CompendiumWriter::to_file(&reloaded), CompendiumWriter::to_file(&original));
}

#[test]
fn engine_config_reads_partial_toml() {
    let config = ConfigLoader::parse("script_step_budget = 50\n").expect("parses");
    assert_eq!(config.script_step_budget, 50);
    assert_eq!(config.max_skill_layers, EngineConfig::DEFAULT_MAX_SKILL_LAYERS);
    assert!(ConfigLoader::parse("max_skill_layers = 0").is_err());

    let dir = tempdir().expect("tempdir");
    assert_eq!(
        ContentFactory::new(dir.path()).load_config().expect("defaults"),
        EngineConfig::default()
    );
}
