//! Hook registry for managing and executing post-command hooks.

use std::sync::Arc;

use tracing::{debug, error};

use super::{DeathHook, HookContext, HookCriticality, HookError, PostCommandHook};
use crate::events::Event;

/// Ordered set of post-command hooks.
#[derive(Clone)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn PostCommandHook>>,
}

impl HookRegistry {
    /// Creates a registry; hooks are sorted by priority (lower values first).
    pub fn new(mut hooks: Vec<Arc<dyn PostCommandHook>>) -> Self {
        hooks.sort_by_key(|h| h.priority());
        Self { hooks }
    }

    pub fn empty() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Creates a registry with the default set of hooks.
    ///
    /// Default hooks include:
    /// - DeathHook: announces deaths and interrupts the dead's skills
    pub fn default_hooks() -> Self {
        Self::new(vec![Arc::new(DeathHook::new()) as Arc<dyn PostCommandHook>])
    }

    /// Adds `hook`, keeping priority order. Equal priorities keep insertion order.
    pub fn register(&mut self, hook: Arc<dyn PostCommandHook>) {
        let at = self
            .hooks
            .partition_point(|h| h.priority() <= hook.priority());
        self.hooks.insert(at, hook);
    }

    /// Runs every triggered hook and collects the events they emit.
    ///
    /// # Error Handling
    ///
    /// - `Critical`: returns the error immediately
    /// - `Important`: logs at error level and continues
    /// - `Optional`: logs at debug level and continues
    pub fn execute_hooks(&self, ctx: &mut HookContext<'_>) -> Result<Vec<Event>, HookError> {
        let mut events = Vec::new();
        for hook in &self.hooks {
            if !hook.should_trigger(ctx) {
                continue;
            }
            match hook.execute(ctx) {
                Ok(emitted) => events.extend(emitted),
                Err(e) => self.handle_hook_error(hook.as_ref(), e)?,
            }
        }
        Ok(events)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Returns an iterator over hook names and priorities (for debugging).
    pub fn hooks(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.hooks.iter().map(|h| (h.name(), h.priority()))
    }

    fn handle_hook_error(
        &self,
        hook: &dyn PostCommandHook,
        error: HookError,
    ) -> Result<(), HookError> {
        match hook.criticality() {
            HookCriticality::Critical => {
                error!(
                    target: "runtime::hooks",
                    hook = hook.name(),
                    criticality = "critical",
                    error = %error,
                    "Critical hook failed, aborting command"
                );
                return Err(error);
            }
            HookCriticality::Important => error!(
                target: "runtime::hooks",
                hook = hook.name(),
                criticality = "important",
                error = %error,
                "Hook failed, continuing"
            ),
            HookCriticality::Optional => debug!(
                target: "runtime::hooks",
                hook = hook.name(),
                criticality = "optional",
                error = %error,
                "Optional hook failed"
            ),
        }
        Ok(())
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::default_hooks()
    }
}
