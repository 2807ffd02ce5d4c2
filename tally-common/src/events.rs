//! Event types and the in-process event bus
//!
//! The store emits one [`ElectionEvent`] per persisted change. Subscribers
//! (the SSE endpoint, tests) receive every event emitted after they subscribe.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{
    CollectionPhase, ConflictSeverity, ConflictType, ConstituencyStatus, ElectionUpdate,
    NewsItem,
};

/// Persistence change notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElectionEvent {
    /// Canonical constituency record written
    ConstituencyUpdated {
        constituency_id: String,
        number: u32,
        status: ConstituencyStatus,
        trust_score: u8,
        timestamp: i64,
    },

    /// Constituency collection replaced from the static catalog
    ConstituenciesSeeded { count: usize, timestamp: i64 },

    /// Ticker entry appended
    UpdatePublished { update: ElectionUpdate },

    /// Report staged for review instead of publishing
    PendingUpdateStaged {
        pending_id: String,
        constituency_id: String,
        trust_score: u8,
        timestamp: i64,
    },

    /// Pending update approved or rejected
    PendingUpdateReviewed {
        pending_id: String,
        status: String,
        timestamp: i64,
    },

    /// Conflict recorded (resolved or pending)
    ConflictRecorded {
        conflict_id: String,
        constituency_id: String,
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        resolved: bool,
        timestamp: i64,
    },

    /// Conflict resolved by an operator
    ConflictResolved { conflict_id: String, timestamp: i64 },

    /// Singleton document merged (`status`, `summary`, `referendum`, `sources`)
    DocumentUpdated {
        document: String,
        timestamp: i64,
    },

    /// News item appended
    NewsPublished { item: NewsItem },

    /// System error logged
    SystemErrorLogged {
        error_id: String,
        message: String,
        timestamp: i64,
    },

    /// Collection phase changed between cycles
    PhaseChanged {
        old_phase: CollectionPhase,
        new_phase: CollectionPhase,
        timestamp: i64,
    },
}

impl ElectionEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ElectionEvent::ConstituencyUpdated { .. } => "ConstituencyUpdated",
            ElectionEvent::ConstituenciesSeeded { .. } => "ConstituenciesSeeded",
            ElectionEvent::UpdatePublished { .. } => "UpdatePublished",
            ElectionEvent::PendingUpdateStaged { .. } => "PendingUpdateStaged",
            ElectionEvent::PendingUpdateReviewed { .. } => "PendingUpdateReviewed",
            ElectionEvent::ConflictRecorded { .. } => "ConflictRecorded",
            ElectionEvent::ConflictResolved { .. } => "ConflictResolved",
            ElectionEvent::DocumentUpdated { .. } => "DocumentUpdated",
            ElectionEvent::NewsPublished { .. } => "NewsPublished",
            ElectionEvent::SystemErrorLogged { .. } => "SystemErrorLogged",
            ElectionEvent::PhaseChanged { .. } => "PhaseChanged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a `tokio::sync::broadcast` channel. Slow subscribers lag and lose
/// the oldest events rather than blocking writers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ElectionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ElectionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ElectionEvent,
    ) -> Result<usize, broadcast::error::SendError<ElectionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ElectionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
