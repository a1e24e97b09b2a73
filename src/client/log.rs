//! Bounded activity log shown alongside the controls.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::driver::LogLevel;

/// Number of entries the activity log retains.
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
    /// Local time the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    #[must_use]
    pub fn new(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Utc::now(),
        }
    }
}

/// Ring of recent log entries, newest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Total entries ever pushed, survives `clear`.
    pushed: u64,
}

impl ActivityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    /// Create a log holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            pushed: 0,
        }
    }

    /// Record a new entry, evicting the oldest once full.
    pub fn push(&mut self, message: impl Into<String>, level: LogLevel) {
        self.push_entry(LogEntry::new(message, level));
    }

    pub fn push_entry(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        self.pushed += 1;
    }

    /// Entries from newest to oldest.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries of a single level, newest first.
    pub fn filter(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Monotonic count of pushes, used by renderers to spot new entries.
    #[must_use]
    pub fn pushed(&self) -> u64 {
        self.pushed
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
