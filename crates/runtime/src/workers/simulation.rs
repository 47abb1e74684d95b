//! Simulation worker that owns the authoritative [`Board`].
//!
//! Every mutation of a board happens here, on one task: commands arrive over
//! an mpsc channel, the tick timer fires between them, and after each the
//! worker drains the change journal, runs the post-command hooks and
//! publishes the results on the event bus.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use vtt_core::{Board, ContentRegistry, EntitySnapshot, SkillSourceRef, Tick};

use crate::api::{Actor, CommandOutcome, Request, Result};
use crate::events::{Event, EventBus};
use crate::hooks::{HookContext, HookError, HookRegistry};

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Authorise and apply a client request.
    Submit {
        actor: Actor,
        request: Request,
        reply: oneshot::Sender<Result<CommandOutcome>>,
    },
    /// Entities the actor may see.
    Snapshot {
        actor: Actor,
        reply: oneshot::Sender<Vec<EntitySnapshot>>,
    },
    CurrentTick {
        reply: oneshot::Sender<Tick>,
    },
    /// Copy of the compendium as currently edited.
    Compendium {
        reply: oneshot::Sender<ContentRegistry>,
    },
    /// Stop after the commands already queued.
    Shutdown,
}

/// Background task that processes board commands and ticks.
pub struct SimulationWorker {
    board: Board,
    registry: ContentRegistry,
    hooks: HookRegistry,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    tick_interval: Option<Duration>,
}

impl SimulationWorker {
    /// Creates a new simulation worker.
    ///
    /// # Arguments
    ///
    /// * `tick_interval` - period of the board clock; `None` leaves ticking
    ///   to [`Request::AdvanceTick`]
    pub fn new(
        board: Board,
        registry: ContentRegistry,
        hooks: HookRegistry,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        tick_interval: Option<Duration>,
    ) -> Self {
        info!(
            target: "runtime::worker",
            board = board.name(),
            entities = board.entity_ids().len(),
            content = registry.len(),
            hooks = hooks.len(),
            "SimulationWorker initialized"
        );

        Self {
            board,
            registry,
            hooks,
            command_rx,
            event_bus,
            tick_interval,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut ticker = self.tick_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                _ = next_tick(&mut ticker) => {
                    if let Err(e) = self.advance() {
                        error!(target: "runtime::worker", error = %e, "tick hooks failed");
                    }
                }
            }
        }

        info!(
            target: "runtime::worker",
            board = self.board.name(),
            tick = %self.board.current_tick(),
            "SimulationWorker stopped"
        );
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                actor,
                request,
                reply,
            } => {
                let result = self.submit(actor, request);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Submit reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { actor, reply } => {
                if reply.send(self.visible_snapshots(actor)).is_err() {
                    debug!(target: "runtime::worker", "Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::CurrentTick { reply } => {
                let _ = reply.send(self.board.current_tick());
            }
            Command::Compendium { reply } => {
                let _ = reply.send(self.registry.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn submit(&mut self, actor: Actor, request: Request) -> Result<CommandOutcome> {
        if !request.is_authorized(&actor, &self.board) {
            debug!(
                target: "runtime::worker",
                player = actor.player.0,
                request = request.name(),
                subject = ?request.subject(),
                "ignoring unauthorised request"
            );
            return Ok(CommandOutcome::Ignored);
        }

        let name = request.name();
        let mut outcome = match request {
            Request::AdvanceTick => return Ok(CommandOutcome::Ticked(self.advance()?)),
            request => self.apply(actor, request),
        };
        let published = self.flush()?;
        if let CommandOutcome::Applied { changes } = &mut outcome {
            *changes = published;
        }

        debug!(target: "runtime::worker", request = name, ?outcome, "request handled");
        Ok(outcome)
    }

    /// Applies an authorised request to the board or compendium.
    fn apply(&mut self, actor: Actor, request: Request) -> CommandOutcome {
        let board = &mut self.board;
        match request {
            Request::Spawn(entity) => CommandOutcome::Spawned(board.spawn(*entity)),
            Request::Despawn(id) => {
                board.interrupt_skills(id);
                applied_if(board.remove_entity(id).is_some(), "no such entity")
            }
            Request::AdvanceTick => CommandOutcome::Ticked(board.current_tick()),

            Request::LoadFeature { id, json } => match self.registry.load_feature(&id, &json) {
                Ok(_) => applied(),
                Err(e) => {
                    warn!(target: "vtt::content", entry = %id, error = %e, "feature rejected");
                    CommandOutcome::rejected(e)
                }
            },
            Request::LoadSkill { id, json } => match self.registry.load_skill(&id, &json) {
                Ok(_) => applied(),
                Err(e) => {
                    warn!(target: "vtt::content", entry = %id, error = %e, "skill rejected");
                    CommandOutcome::rejected(e)
                }
            },
            Request::RemoveContent { id } => {
                let feature = self.registry.remove_feature(&id).is_some();
                let skill = self.registry.remove_skill(&id).is_some();
                applied_if(feature || skill, "no such compendium entry")
            }

            Request::SetStatBase {
                entity,
                stat,
                value,
            } => applied_if(board.set_stat_base(entity, &stat, value), "no such entity"),
            Request::AttachFeature { container, feature } => {
                let Some(feature) = self.registry.feature(&feature) else {
                    return CommandOutcome::rejected(format!("unknown feature `{feature}`"));
                };
                applied_if(
                    board.add_feature(container, feature),
                    "feature could not be attached",
                )
            }
            Request::DetachFeature { container, feature } => {
                let condition = board
                    .feature(&container, &feature)
                    .is_some_and(|attached| attached.is_condition());
                if condition && !actor.gm {
                    return CommandOutcome::rejected(format!(
                        "condition `{feature}` can only be lifted by a game master"
                    ));
                }
                applied_if(board.remove_feature(container, &feature), "feature not attached")
            }
            Request::ToggleFeature {
                container,
                feature,
                enabled,
            } => {
                // Owners may only flip features marked toggleable.
                if !actor.gm {
                    match board.feature(&container, &feature) {
                        None => return CommandOutcome::rejected("feature not attached"),
                        Some(attached) if !attached.meta().toggleable => {
                            return CommandOutcome::rejected(format!(
                                "feature `{feature}` is not toggleable"
                            ));
                        }
                        Some(_) => {}
                    }
                }
                let changed = if enabled {
                    board.enable_feature(container, &feature)
                } else {
                    board.disable_feature(container, &feature)
                };
                applied_if(changed, "feature not attached or already in that state")
            }
            Request::Equip { entity, item, slot } => {
                applied_if(board.equip(entity, item, &slot), "item cannot go there")
            }
            Request::Unequip { entity, item } => {
                applied_if(board.unequip(entity, item), "item is not equipped")
            }

            Request::UseSkill {
                executor,
                skill,
                args,
            } => {
                let granted = board
                    .available_skills(executor, &self.registry)
                    .into_iter()
                    .find(|(s, _)| s.id() == skill);
                let (skill, source) = match granted {
                    Some(found) => found,
                    // Game masters may use anything in the compendium.
                    None => match self.registry.skill(&skill).filter(|_| actor.gm) {
                        Some(found) => (found, SkillSourceRef::None),
                        None => {
                            return CommandOutcome::rejected(format!(
                                "skill `{skill}` is not available"
                            ));
                        }
                    },
                };
                match board.start_skill(executor, skill, args, source) {
                    Ok(instance) => CommandOutcome::SkillStarted { instance },
                    Err(e) => CommandOutcome::rejected(e),
                }
            }
            Request::CancelSkill { executor, instance } => {
                match board.cancel_skill(executor, instance) {
                    Ok(()) => applied(),
                    Err(e) => CommandOutcome::rejected(e),
                }
            }
        }
    }

    /// One clock step followed by a flush.
    fn advance(&mut self) -> std::result::Result<Tick, HookError> {
        self.board.process_tick();
        let tick = self.board.current_tick();
        self.event_bus.publish(Event::Ticked { tick });
        self.flush()?;
        Ok(tick)
    }

    /// Publishes the journal, runs hooks on it, then publishes whatever the
    /// hooks produced. Returns the number of journal entries published.
    fn flush(&mut self) -> std::result::Result<usize, HookError> {
        let changes = self.board.drain_changes();
        if changes.is_empty() {
            return Ok(0);
        }
        for change in &changes {
            self.event_bus.publish(Event::Change(change.clone()));
        }

        let mut ctx = HookContext {
            board: &mut self.board,
            registry: &self.registry,
            changes: &changes,
        };
        let events = self.hooks.execute_hooks(&mut ctx)?;

        let follow_up = self.board.drain_changes();
        for change in &follow_up {
            self.event_bus.publish(Event::Change(change.clone()));
        }
        for event in events {
            self.event_bus.publish(event);
        }
        Ok(changes.len() + follow_up.len())
    }

    /// Game masters see everything. Players see visible entities and their
    /// own; hidden features of entities they do not control are redacted.
    fn visible_snapshots(&self, actor: Actor) -> Vec<EntitySnapshot> {
        self.board
            .entities()
            .filter(|entity| {
                actor.gm || entity.visible || entity.owner == Some(actor.player)
            })
            .map(|entity| {
                let snapshot = entity.snapshot();
                if actor.controls(&self.board, entity.id) {
                    snapshot
                } else {
                    snapshot.redacted()
                }
            })
            .collect()
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn applied() -> CommandOutcome {
    CommandOutcome::Applied { changes: 0 }
}

fn applied_if(ok: bool, reason: &str) -> CommandOutcome {
    if ok {
        applied()
    } else {
        CommandOutcome::rejected(reason)
    }
}
