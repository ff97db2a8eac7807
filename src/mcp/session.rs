//! Session bookkeeping for the stateful SSE transport.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::server::Dispatcher;

/// Messages queued per session before a slow reader applies backpressure.
pub const SESSION_CHANNEL_CAPACITY: usize = 32;

/// A live push channel plus the dispatcher serving it.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub channel: mpsc::Sender<Value>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Session {
    pub fn open(dispatcher: Arc<Dispatcher>) -> (Self, mpsc::Receiver<Value>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let session = Self {
            id: Uuid::new_v4().to_string(),
            channel: sender,
            dispatcher,
        };
        (session, receiver)
    }
}

pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Session>;
    /// Rejects an id that already has a live channel.
    fn put(&self, session: Session) -> Result<(), AppError>;
    fn delete(&self, id: &str) -> Option<Session>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<Session> {
        self.sessions().get(id).cloned()
    }

    fn put(&self, session: Session) -> Result<(), AppError> {
        let mut sessions = self.sessions();
        if sessions.contains_key(&session.id) {
            return Err(AppError::internal(format!(
                "session id collision: {}",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn delete(&self, id: &str) -> Option<Session> {
        self.sessions().remove(id)
    }

    fn len(&self) -> usize {
        self.sessions().len()
    }
}

/// Removes the session when the SSE stream that owns it is dropped.
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    id: String,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn SessionStore>, id: String) -> Self {
        Self { store, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.store.delete(&self.id).is_some() {
            info!(session_id = %self.id, "session closed");
        }
    }
}
