//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! submitting requests or streaming events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};
use vtt_core::{ContentRegistry, EntitySnapshot, Tick};

use super::errors::{Result, RuntimeError};
use super::{Actor, CommandOutcome, Request};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Submit `request` on behalf of `actor` and wait for it to be applied.
    pub async fn submit(&self, actor: Actor, request: Request) -> Result<CommandOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Submit {
            actor,
            request,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Entities `actor` may see, with other players' hidden features removed.
    pub async fn snapshot(&self, actor: Actor) -> Result<Vec<EntitySnapshot>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot {
            actor,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    pub async fn current_tick(&self) -> Result<Tick> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::CurrentTick { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// The compendium including edits made through [`Request::LoadFeature`]
    /// and friends, e.g. for saving it back to disk.
    pub async fn compendium(&self) -> Result<ContentRegistry> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Compendium { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use vtt_runtime::Topic;
    ///
    /// let mut combat = handle.subscribe(Topic::Combat);
    /// while let Ok(event) = combat.recv().await {
    ///     // Handle attacks, injuries and deaths
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
