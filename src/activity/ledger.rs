//! Bounded recent-activity log
//!
//! Holds the most recent entries only; the oldest entry is evicted first once
//! the ledger is full. Synchronisation is left to the owner (the event hub
//! appends and broadcasts under one lock).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Entries kept before the oldest is evicted
pub const ACTIVITY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    System,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    /// Container (or other resource) the entry refers to
    pub container: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, message: impl Into<String>, container: Option<&str>) -> Self {
        Self {
            id: format!("log-{}", uuid::Uuid::new_v4().simple()),
            kind,
            message: message.into(),
            container: container.map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

pub struct ActivityLedger {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: ActivityEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ActivityLedger {
    fn default() -> Self {
        Self::new()
    }
}
