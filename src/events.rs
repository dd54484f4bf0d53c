//! Change notifications for UI-facing subscribers.
//!
//! Lossy broadcast fan-out: emission never blocks, and having no
//! subscribers is fine. Progress events fire after every settled mutation —
//! committed or rolled back — so displayed percentages never trail an
//! optimistic state that no longer exists.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::EngagementStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    TaskChanged {
        task_id: String,
    },
    TaskCreated {
        task_id: String,
    },
    TaskRemoved {
        task_id: String,
    },
    ProgressChanged {
        percent: u8,
        completed_weight: u32,
        total_weight: u32,
    },
    DecisionRecorded {
        status: EngagementStatus,
    },
}

/// Broadcasts engine events to all subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send an event to all subscribers. Ignores errors — no subscribers
    /// is fine.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Serialize an event as a notification payload for transports that
    /// forward engine events to clients as JSON.
    pub fn notification_json(event: &EngineEvent) -> String {
        serde_json::to_string(event).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
