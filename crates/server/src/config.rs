//! Server configuration structures and loaders.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use vtt_runtime::RuntimeConfig;

/// Configuration required to host one board.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub runtime: RuntimeConfig,
    /// Directory holding `engine.toml` and `compendium.json`.
    pub data_dir: PathBuf,
    /// Write the compendium back to `data_dir` on shutdown.
    pub save_on_exit: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            data_dir: PathBuf::from("data"),
            save_on_exit: false,
        }
    }
}

impl ServerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `VTT_DATA_DIR` - Content directory (default: `data`)
    /// - `VTT_BOARD_NAME` - Name of the hosted board (default: `main`)
    /// - `VTT_TICK_MS` - Tick period in milliseconds, `0` for manual ticks (default: 500)
    /// - `VTT_COMMAND_BUFFER` - Command queue size (default: 32)
    /// - `VTT_EVENT_BUFFER` - Per-topic event buffer (default: 256)
    /// - `VTT_SAVE_ON_EXIT` - Save the compendium on shutdown (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = read("VTT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = read("VTT_BOARD_NAME") {
            config.runtime.board_name = name;
        }
        if let Some(ms) = read("VTT_TICK_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.runtime.tick_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(capacity) = read("VTT_COMMAND_BUFFER").and_then(|v| v.parse::<usize>().ok()) {
            config.runtime.command_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read("VTT_EVENT_BUFFER").and_then(|v| v.parse::<usize>().ok()) {
            config.runtime.event_buffer_size = capacity.max(1);
        }
        if let Some(enable) = read("VTT_SAVE_ON_EXIT").and_then(|v| v.parse::<bool>().ok()) {
            config.save_on_exit = enable;
        }

        config
    }
}
