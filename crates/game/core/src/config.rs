/// Engine configuration constants and tunable parameters.
///
/// Loaded from TOML by `vtt-content`'s `ConfigLoader`; every field has a
/// default so partial files are accepted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of AST nodes a single scripted hook may evaluate.
    /// Scripts exceeding the budget fail and fall back to the engine default.
    pub script_step_budget: u32,

    /// Maximum number of features attached to a single holder.
    pub max_features_per_holder: usize,

    /// Maximum number of parallel layers a single skill instance may occupy.
    pub max_skill_layers: usize,

    /// Layer used by skills that do not declare one.
    pub default_skill_layer: String,
}

impl EngineConfig {
    pub const DEFAULT_SCRIPT_STEP_BUDGET: u32 = 10_000;
    pub const DEFAULT_MAX_FEATURES: usize = 64;
    pub const DEFAULT_MAX_SKILL_LAYERS: usize = 4;
    pub const DEFAULT_SKILL_LAYER: &'static str = "main";

    pub fn new() -> Self {
        Self {
            script_step_budget: Self::DEFAULT_SCRIPT_STEP_BUDGET,
            max_features_per_holder: Self::DEFAULT_MAX_FEATURES,
            max_skill_layers: Self::DEFAULT_MAX_SKILL_LAYERS,
            default_skill_layer: Self::DEFAULT_SKILL_LAYER.to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
