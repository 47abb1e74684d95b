//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels,
//! and exposes a builder-based API for hosting one board.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vtt_content::ContentFactory;
use vtt_core::{Board, ContentRegistry, EngineConfig};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::EventBus;
use crate::hooks::{HookRegistry, PostCommandHook};
use crate::workers::{Command, SimulationWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub board_name: String,
    pub engine: EngineConfig,
    /// Board clock period. `None` disables the timer.
    pub tick_interval: Option<Duration>,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            board_name: "main".to_string(),
            engine: EngineConfig::default(),
            tick_interval: Some(Duration::from_millis(500)),
            event_buffer_size: 256,
            command_buffer_size: 32,
        }
    }
}

/// Hosts one board.
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    command_tx: mpsc::Sender<Command>,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Stops the worker once queued commands are done, even while handles
    /// are still alive.
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the worker already stopped.
        let _ = self.command_tx.send(Command::Shutdown).await;
        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    board: Option<Board>,
    registry: Option<ContentRegistry>,
    content_dir: Option<PathBuf>,
    hooks: Option<HookRegistry>,
    extra_hooks: Vec<Arc<dyn PostCommandHook>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            board: None,
            registry: None,
            content_dir: None,
            hooks: None,
            extra_hooks: Vec::new(),
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide an initial board. Otherwise an empty one named after the config.
    pub fn board(mut self, board: Board) -> Self {
        self.board = Some(board);
        self
    }

    /// Provide an already loaded compendium.
    pub fn registry(mut self, registry: ContentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Load engine config and compendium from `dir` at build time. An
    /// explicit [`registry`](Self::registry) takes precedence over the
    /// directory's compendium.
    pub fn content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(dir.into());
        self
    }

    /// Replace the hook set. Defaults to [`HookRegistry::default_hooks`].
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Add one hook on top of the configured set.
    pub fn hook(mut self, hook: Arc<dyn PostCommandHook>) -> Self {
        self.extra_hooks.push(hook);
        self
    }

    /// Spawns the simulation worker. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Runtime> {
        let RuntimeBuilder {
            mut config,
            board,
            registry,
            content_dir,
            hooks,
            extra_hooks,
        } = self;

        // Step 1: content
        let mut loaded = None;
        if let Some(dir) = content_dir {
            let factory = ContentFactory::new(dir);
            config.engine = factory
                .load_config()
                .map_err(|e| RuntimeError::Content(format!("{e:#}")))?;
            if registry.is_none() {
                let (compendium, report) = factory
                    .load_compendium()
                    .map_err(|e| RuntimeError::Content(format!("{e:#}")))?;
                tracing::info!(
                    target: "runtime::worker",
                    loaded = report.loaded(),
                    skipped = report.skipped.len(),
                    "compendium ready"
                );
                loaded = Some(compendium);
            }
        }
        let registry = registry.or(loaded).unwrap_or_default();

        // Step 2: board and hooks
        let board =
            board.unwrap_or_else(|| Board::new(config.board_name.clone(), config.engine.clone()));
        let mut hooks = hooks.unwrap_or_default();
        for hook in extra_hooks {
            hooks.register(hook);
        }

        // Step 3: channels and worker
        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size.max(1));
        let worker = SimulationWorker::new(
            board,
            registry,
            hooks,
            command_rx,
            event_bus.clone(),
            config.tick_interval,
        );
        let sim_worker_handle = tokio::spawn(worker.run());

        Ok(Runtime {
            handle: RuntimeHandle::new(command_tx.clone(), event_bus),
            command_tx,
            sim_worker_handle,
        })
    }
}
