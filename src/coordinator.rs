//! Single owner of the tally and the connection registry.
//!
//! Connection tasks never touch shared state directly. They send [`Event`]s
//! through a [`CoordinatorHandle`] and the coordinator task applies them one
//! at a time, so a vote's increment and the broadcast that follows it finish
//! before any other connect, vote or disconnect is looked at.

use crate::codec::encode_snapshot;
use crate::error::{AppError, SendFailure};
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::tally::{Tally, TallyStore};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub enum Event {
    Connect(ConnectionHandle),
    Vote(String),
    Disconnect(ConnectionId),
    Snapshot(oneshot::Sender<Tally>),
}

pub struct Coordinator {
    store: TallyStore,
    registry: ConnectionRegistry,
}

impl Coordinator {
    pub fn new(store: TallyStore) -> Self {
        Self {
            store,
            registry: ConnectionRegistry::new(),
        }
    }

    /// Moves the coordinator onto its own task and returns the only way to reach it.
    pub fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        tokio::spawn(self.run(rx));
        CoordinatorHandle { tx }
    }

    async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
        debug!("All event senders dropped, coordinator stopping");
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Connect(handle) => self.handle_new_connection(handle),
            Event::Vote(category) => {
                self.handle_vote(&category);
            }
            Event::Disconnect(id) => self.handle_disconnect(id),
            Event::Snapshot(reply) => {
                // The requester may have given up; nothing to do then.
                let _ = reply.send(self.store.snapshot());
            }
        }
    }

    /// Counts a vote and pushes the new tally to every client, the voter
    /// included. Returns false when the category is not declared, in which
    /// case nothing changes and nothing is sent.
    pub fn handle_vote(&mut self, category: &str) -> bool {
        if !self.store.is_declared(category) {
            debug!("Ignoring vote for unknown category {category:?}");
            return false;
        }

        let tally = self.store.increment(category);
        info!(
            "Vote for {category}, now {} (total {})",
            tally.get(category).unwrap_or_default(),
            tally.total()
        );
        self.broadcast(&tally);
        true
    }

    /// Registers the client and sends it the current tally, and only it.
    pub fn handle_new_connection(&mut self, handle: ConnectionHandle) {
        let frame = encode_snapshot(&self.store.snapshot());
        let id = handle.id();
        self.registry.register(handle.clone());
        info!("Client {id} connected ({} live)", self.registry.len());

        if let Err(failure) = handle.send(frame) {
            self.drop_connection(id, failure);
        }
    }

    pub fn handle_disconnect(&mut self, id: ConnectionId) {
        if self.registry.unregister(id) {
            info!("Client {id} disconnected ({} live)", self.registry.len());
        }
    }

    pub fn snapshot(&self) -> Tally {
        self.store.snapshot()
    }

    pub fn connections(&self) -> usize {
        self.registry.len()
    }

    fn broadcast(&mut self, tally: &Tally) {
        let frame = encode_snapshot(tally);
        let mut failed = Vec::new();

        self.registry.for_each(|handle| {
            if let Err(failure) = handle.send(frame.clone()) {
                failed.push((handle.id(), failure));
            }
        });

        for (id, failure) in failed {
            self.drop_connection(id, failure);
        }
    }

    // Slow consumers are disconnected: removing the handle drops the last
    // sender of its queue, which ends the writer task and closes the socket.
    fn drop_connection(&mut self, id: ConnectionId, failure: SendFailure) {
        if self.registry.unregister(id) {
            match failure {
                SendFailure::Full => warn!("Client {id} fell behind, dropping connection"),
                SendFailure::Closed => debug!("Client {id} already gone, unregistering"),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Event>,
}

impl CoordinatorHandle {
    pub async fn connect(&self, handle: ConnectionHandle) -> Result<(), AppError> {
        self.send(Event::Connect(handle)).await
    }

    pub async fn vote(&self, category: impl Into<String>) -> Result<(), AppError> {
        self.send(Event::Vote(category.into())).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> Result<(), AppError> {
        self.send(Event::Disconnect(id)).await
    }

    pub async fn snapshot(&self) -> Result<Tally, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Snapshot(reply)).await?;
        rx.await.map_err(|_| AppError::CoordinatorUnavailable)
    }

    async fn send(&self, event: Event) -> Result<(), AppError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AppError::CoordinatorUnavailable)
    }
}
