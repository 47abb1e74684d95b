//! Board-driven skill lifecycle: start, scheduled execution, cancel.
//!
//! # Lifecycle
//!
//! 1. **Bind**: argument types are checked slot by slot, then each argument
//!    is asked [`Skill::can_use_argument`].
//! 2. **Gate**: cooldown, layer occupancy, [`Skill::can_be_used`] and the
//!    executor's `does_execute_skill` feature chain.
//! 3. **Start**: the instance is registered on the executor and
//!    [`Skill::start`] runs immediately.
//! 4. **Execute**: after [`Skill::delay`] ticks the instance executes once per
//!    occupied layer, then `on_execute_skill` fires on the executor's
//!    features. [`Skill::duration`] extra executions follow, one per tick.
//! 5. **Complete** or **Cancel**: layers are freed. Completion and voluntary
//!    cancellation start the cooldown; interruption does not.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{ActiveSkill, Skill, SkillArgument, SkillData, SkillError};
use crate::feature::dispatch;
use crate::refs::SkillSourceRef;
use crate::state::{Board, ChangeEvent, EntityId, Tick};

impl Board {
    /// Binds and starts `skill` for `executor`. Returns the instance id.
    pub fn start_skill(
        &mut self,
        executor: EntityId,
        skill: Arc<dyn Skill>,
        args: Vec<SkillArgument>,
        source: SkillSourceRef,
    ) -> Result<u64, SkillError> {
        if self.entity(executor).is_none() {
            return Err(SkillError::UnknownExecutor(executor));
        }

        // Step 1: argument binding
        skill.validate_arguments(&args)?;
        for (slot, argument) in args.iter().enumerate() {
            skill
                .can_use_argument(self, executor, slot, argument)
                .map_err(|reason| SkillError::UnusableArgument { slot, reason })?;
        }

        // Step 2: gates
        if let Some(until) = self.cooldown_until(executor, skill.id()) {
            return Err(SkillError::CoolingDown {
                skill: skill.id().to_string(),
                until,
            });
        }

        let instance = self.next_skill_instance(executor);
        let mut data = SkillData::new(instance, Arc::clone(&skill), executor, args, source);
        data.layers = self.resolve_layers(skill.as_ref(), &data)?;
        if let Some(busy) = data
            .layers
            .iter()
            .find(|layer| self.layer_busy(executor, layer))
        {
            return Err(SkillError::LayerBusy(busy.clone()));
        }

        skill.can_be_used(self, &data).map_err(SkillError::Unavailable)?;
        let verdict = dispatch::does_execute_skill(self, executor, &data);
        if !verdict.allowed {
            return Err(SkillError::Denied(verdict.reason));
        }

        // Step 3: start
        let delay = skill.delay(self, &data);
        let duration = skill.duration(self, &data);
        let now = self.current_tick();
        if let Some(entity) = self.entity_mut(executor) {
            entity.active_skills.push(ActiveSkill {
                data: data.clone(),
                started: now,
                next_execution: Some(now.after(delay)),
                remaining: duration,
                executions: 0,
            });
        }
        self.record(ChangeEvent::SkillStarted {
            entity: executor,
            skill: skill.id().to_string(),
            instance,
            layers: data.layers.clone(),
        });
        tracing::debug!(
            entity = %executor,
            skill = skill.id(),
            instance,
            delay,
            duration,
            "skill started"
        );
        skill.start(self, &data);

        // Step 4: schedule the first execution
        self.run_task_later(delay, move |board| board.fire_skill(executor, instance));
        Ok(instance)
    }

    /// Voluntary cancel. Runs cleanup and starts the cooldown.
    pub fn cancel_skill(&mut self, executor: EntityId, instance: u64) -> Result<(), SkillError> {
        let data = self
            .active_skill(executor, instance)
            .map(|active| active.data.clone())
            .ok_or(SkillError::NotActive(instance))?;
        if !data.skill.can_cancel(self, &data) {
            return Err(SkillError::NotCancellable(instance));
        }
        self.end_skill(&data, Some(false));
        Ok(())
    }

    /// Forced cancel. Runs cleanup but skips the cooldown.
    pub fn interrupt_skill(&mut self, executor: EntityId, instance: u64) -> bool {
        let Some(data) = self
            .active_skill(executor, instance)
            .map(|active| active.data.clone())
        else {
            return false;
        };
        if !data.skill.can_cancel(self, &data) {
            return false;
        }
        self.end_skill(&data, Some(true));
        true
    }

    /// Interrupts every active skill of `executor`. Returns how many stopped.
    pub fn interrupt_skills(&mut self, executor: EntityId) -> usize {
        let instances: Vec<u64> = self
            .entity(executor)
            .map(|entity| {
                entity
                    .active_skills
                    .iter()
                    .map(|active| active.data.instance)
                    .collect()
            })
            .unwrap_or_default();
        instances
            .into_iter()
            .filter(|instance| self.interrupt_skill(executor, *instance))
            .count()
    }

    pub fn active_skill(&self, executor: EntityId, instance: u64) -> Option<&ActiveSkill> {
        self.entity(executor)?
            .active_skills
            .iter()
            .find(|active| active.data.instance == instance)
    }

    /// Tick until which `skill` is cooling down for `executor`, if it still is.
    pub fn cooldown_until(&self, executor: EntityId, skill: &str) -> Option<Tick> {
        let until = *self.entity(executor)?.cooldowns.get(skill)?;
        (until > self.current_tick()).then_some(until)
    }

    pub fn layer_busy(&self, executor: EntityId, layer: &str) -> bool {
        self.entity(executor)
            .is_some_and(|entity| entity.active_skills.iter().any(|a| a.occupies(layer)))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn resolve_layers(&self, skill: &dyn Skill, data: &SkillData) -> Result<Vec<String>, SkillError> {
        let mut layers = skill.layers(self, data);
        if layers.is_empty() {
            layers.push(
                skill
                    .meta()
                    .layer
                    .clone()
                    .unwrap_or_else(|| self.config().default_skill_layer.clone()),
            );
        }
        let mut seen = BTreeSet::new();
        layers.retain(|layer| seen.insert(layer.clone()));

        let max = self.config().max_skill_layers;
        if layers.len() > max {
            return Err(SkillError::TooManyLayers {
                requested: layers.len(),
                max,
            });
        }
        Ok(layers)
    }

    /// Scheduled execution of `instance`. A no-op once it has ended.
    pub(crate) fn fire_skill(&mut self, executor: EntityId, instance: u64) {
        let Some(data) = self
            .active_skill(executor, instance)
            .map(|active| active.data.clone())
        else {
            return;
        };

        for layer in &data.layers {
            data.skill.execute(self, &data, layer);
            self.record(ChangeEvent::SkillExecuted {
                entity: executor,
                skill: data.skill.id().to_string(),
                instance,
                layer: layer.clone(),
            });
        }
        dispatch::notify_execute_skill(self, executor, &data);

        // The skill may have ended itself while executing.
        let now = self.current_tick();
        let Some(active) = self.entity_mut(executor).and_then(|entity| {
            entity
                .active_skills
                .iter_mut()
                .find(|active| active.data.instance == instance)
        }) else {
            return;
        };
        active.executions += 1;
        let repeat = active.remaining > 0;
        if repeat {
            active.remaining -= 1;
            active.next_execution = Some(now.after(1));
        } else {
            active.next_execution = None;
        }

        if repeat {
            self.run_task_later(1, move |board| board.fire_skill(executor, instance));
        } else {
            self.end_skill(&data, None);
        }
    }

    /// Removes the instance, then runs cleanup. `cancelled` is `None` for a
    /// normal completion and `Some(interrupted)` otherwise.
    fn end_skill(&mut self, data: &SkillData, cancelled: Option<bool>) {
        let executor = data.executor;
        let now = self.current_tick();
        let cooldown = match cancelled {
            Some(true) => 0,
            _ => data.skill.cooldown(self, data),
        };
        let Some(entity) = self.entity_mut(executor) else {
            return;
        };
        entity
            .active_skills
            .retain(|active| active.data.instance != data.instance);
        if cooldown > 0 {
            entity
                .cooldowns
                .insert(data.skill.id().to_string(), now.after(cooldown));
        }

        let skill = data.skill.id().to_string();
        match cancelled {
            None => {
                self.record(ChangeEvent::SkillCompleted {
                    entity: executor,
                    skill,
                    instance: data.instance,
                });
            }
            Some(interrupted) => {
                data.skill.cancel(self, data, interrupted);
                self.record(ChangeEvent::SkillCancelled {
                    entity: executor,
                    skill,
                    instance: data.instance,
                    interrupted,
                });
            }
        }
    }
}
