//! Bounded event history for one breaker.

use std::collections::VecDeque;

use serde::Serialize;

use crate::resilience::CircuitState;

/// Something that happened to a breaker.
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakerEvent {
    StateChange {
        previous: CircuitState,
        next: CircuitState,
        reason: String,
        timestamp: u64,
    },
    CallSuccess {
        duration_ms: u64,
        slow: bool,
        timestamp: u64,
    },
    CallFailure {
        reason: String,
        duration_ms: u64,
        timestamp: u64,
    },
    CallRejected {
        reason: String,
        timestamp: u64,
    },
    ManualTrip {
        reason: String,
        timestamp: u64,
    },
    ManualReset {
        reason: String,
        timestamp: u64,
    },
}

impl BreakerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BreakerEvent::StateChange { .. } => "state_change",
            BreakerEvent::CallSuccess { .. } => "call_success",
            BreakerEvent::CallFailure { .. } => "call_failure",
            BreakerEvent::CallRejected { .. } => "call_rejected",
            BreakerEvent::ManualTrip { .. } => "manual_trip",
            BreakerEvent::ManualReset { .. } => "manual_reset",
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            BreakerEvent::StateChange { timestamp, .. }
            | BreakerEvent::CallSuccess { timestamp, .. }
            | BreakerEvent::CallFailure { timestamp, .. }
            | BreakerEvent::CallRejected { timestamp, .. }
            | BreakerEvent::ManualTrip { timestamp, .. }
            | BreakerEvent::ManualReset { timestamp, .. } => *timestamp,
        }
    }
}

/// Fixed-capacity FIFO of events. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct EventJournal {
    capacity: usize,
    events: VecDeque<BreakerEvent>,
}

impl EventJournal {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: BreakerEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Owned copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<BreakerEvent> {
        self.events.iter().cloned().collect()
    }

    /// The last `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<BreakerEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
