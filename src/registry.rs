use crate::error::SendFailure;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Identity of one client session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pushes encoded frames to one client's writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl ConnectionHandle {
    /// Creates a handle together with the receiving end its writer task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let handle = Self {
            id: ConnectionId::new(),
            outbound,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queues a frame without waiting.
    pub fn send(&self, frame: String) -> Result<(), SendFailure> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Full,
            TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    handles: HashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: ConnectionHandle) {
        self.handles.insert(handle.id(), handle);
    }

    /// Returns whether the handle was still registered.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.handles.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&ConnectionHandle),
    {
        self.handles.values().for_each(f);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
