use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::auth::token::{SessionStatus, UserProfile};
use crate::error::ErrorCode;

// Session event channel capacity
pub const SESSION_EVENT_CAPACITY: usize = 64;
pub const SESSION_EVENT_BUFFER_SIZE: usize = 16;

/// Events emitted by an [`crate::AuthSession`] for presentation code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The state machine moved to a new status
    StatusChanged { status: SessionStatus },
    /// A login completed
    SignedIn { user: UserProfile },
    /// A login attempt ended without a session
    SignInFailed { code: ErrorCode, message: String },
    /// Local state was cleared; `revoked` tells whether the provider confirmed
    SignedOut { revoked: bool },
}

/// Timestamped event kept for late subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event: SessionEvent,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast stream of session events with a small replay buffer
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
    buffer: Mutex<VecDeque<RecordedEvent>>,
    buffer_size: usize,
}

impl SessionEvents {
    /// Create a new event stream with specified capacity
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Mutex::new(VecDeque::with_capacity(buffer_size)),
            buffer_size,
        }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn publish(&self, event: SessionEvent) {
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer.push_back(RecordedEvent {
                event: event.clone(),
                timestamp: Utc::now(),
            });
            while buffer.len() > self.buffer_size {
                buffer.pop_front();
            }
        }

        match self.sender.send(event) {
            Ok(receivers) => trace!(receivers, "Session event published"),
            Err(_) => trace!("No receivers for session event, message buffered"),
        }
    }

    /// Recently published events, oldest first
    pub fn recent(&self) -> Vec<RecordedEvent> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(SESSION_EVENT_CAPACITY, SESSION_EVENT_BUFFER_SIZE)
    }
}
