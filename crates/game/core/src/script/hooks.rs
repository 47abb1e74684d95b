//! Named hook tables for scripted features and skills.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;

use serde_json::{Map, Value as Json};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::{Script, ScriptContext, ScriptOutcome};
use crate::content::{COMMON_KEYS, ContentError, Fields};

/// Hook points of a scripted feature.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum FeatureHook {
    OnTick,
    DoesGetAttacked,
    DoesAttack,
    DoesExecuteSkill,
    ModifyReceivingDamage,
    ModifyAttackingDamage,
    OnAttacked,
    OnAttack,
    OnExecuteSkill,
    OnInjured,
}

/// Hook points of a scripted skill.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum SkillHook {
    Execute,
    Start,
    Cancel,
    CanCancel,
    Delay,
    Cooldown,
    Duration,
    /// Comma separated layer names.
    Layers,
    /// Gate evaluated by `can_be_used`.
    Condition,
    Damage,
    DoesHit,
    OnHit,
    OnAttack,
    CanTarget,
}

pub trait HookName: Copy + Ord + Debug + FromStr + AsRef<str> + Send + Sync + 'static {}

impl HookName for FeatureHook {}
impl HookName for SkillHook {}

/// Compiled scripts keyed by hook. Absent hooks fall back to engine defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct HookTable<H: HookName> {
    scripts: BTreeMap<H, Script>,
}

impl<H: HookName> Default for HookTable<H> {
    fn default() -> Self {
        Self {
            scripts: BTreeMap::new(),
        }
    }
}

impl<H: HookName> HookTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hook: H, script: Script) {
        self.scripts.insert(hook, script);
    }

    /// Compiles every non-common key of `fields` as a hook.
    ///
    /// `reserved` lists extra kind-specific keys that are not hooks.
    pub fn from_fields(fields: Fields<'_>, reserved: &[&str]) -> Result<Self, ContentError> {
        let mut table = Self::new();
        for (key, value) in fields.object() {
            if COMMON_KEYS.contains(&key.as_str()) || reserved.contains(&key.as_str()) {
                continue;
            }
            let hook = key.parse::<H>().map_err(|_| ContentError::UnknownHook {
                entry: fields.entry().to_string(),
                hook: key.clone(),
            })?;
            let source = value
                .as_str()
                .ok_or_else(|| fields.invalid(key, "hook bodies must be strings"))?;
            let script = Script::compile(source).map_err(|source| ContentError::Script {
                entry: fields.entry().to_string(),
                hook: key.clone(),
                source,
            })?;
            table.insert(hook, script);
        }
        Ok(table)
    }

    pub fn get(&self, hook: H) -> Option<&Script> {
        self.scripts.get(&hook)
    }

    pub fn contains(&self, hook: H) -> bool {
        self.scripts.contains_key(&hook)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Runs `hook` if present. Evaluation failures are logged and reported as
    /// absent so the caller falls back to its default.
    pub fn run(&self, hook: H, ctx: &ScriptContext, budget: u32) -> Option<ScriptOutcome> {
        let script = self.scripts.get(&hook)?;
        match script.run(ctx, budget) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(
                    target: "vtt::script",
                    hook = hook.as_ref(),
                    source = script.source(),
                    error = %err,
                    "hook failed, using default"
                );
                None
            }
        }
    }

    /// Writes each hook's source back under its name.
    pub fn write_json(&self, obj: &mut Map<String, Json>) {
        for (hook, script) in &self.scripts {
            obj.insert(
                hook.as_ref().to_string(),
                Json::String(script.source().to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::script::Value;
    use crate::state::Tick;

    #[test]
    fn hook_names_are_camel_case() {
        assert_eq!(FeatureHook::ModifyReceivingDamage.to_string(), "modifyReceivingDamage");
        assert_eq!("canCancel".parse::<SkillHook>(), Ok(SkillHook::CanCancel));
    }

    #[test]
    fn table_compiles_hooks_and_skips_common_keys() {
        let entry = json!({ "type": "arbitrary", "name": "x", "onTick": "1 + 1",
                            "damage_type": "fire" });
        let fields = Fields::new("x", &entry).expect("object");
        let table = HookTable::<FeatureHook>::from_fields(fields, &["damage_type"]).expect("table");
        assert_eq!(table.len(), 1);
        let outcome = table
            .run(FeatureHook::OnTick, &ScriptContext::new(Tick(0)), 100)
            .expect("ran");
        assert_eq!(outcome.value, Value::Number(2.0));
        assert!(table.run(FeatureHook::OnAttack, &ScriptContext::new(Tick(0)), 100).is_none());
    }

    #[test]
    fn failing_hook_falls_back() {
        let mut table = HookTable::new();
        table.insert(SkillHook::Delay, Script::compile("1 / 0").expect("compiles"));
        assert!(table.run(SkillHook::Delay, &ScriptContext::new(Tick(0)), 100).is_none());
    }
}
