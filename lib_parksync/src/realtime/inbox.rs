//! # Notification Log
//!
//! The ordered record behind the bell/inbox UI: newest first, capped, and
//! not deduplicated. Dedup only decides whether an event *surfaces*; every
//! accepted event is logged here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::message::{NotificationCategory, NotificationEvent};

/// Default number of entries the inbox keeps.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedNotification {
    /// Local id, unique within one log.
    pub id: u64,
    /// Backend id, present for entries backfilled over REST.
    pub server_id: Option<i64>,
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Category, for icons and styling.
    pub category: NotificationCategory,
    /// The live event that produced this entry, when it carried one.
    pub event: Option<NotificationEvent>,
    /// Event time if the backend sent one, otherwise when it was received.
    pub created_at: DateTime<Utc>,
    /// Whether the user has seen it.
    pub read: bool,
    /// Whether it surfaced as a visible alert when it arrived.
    pub surfaced: bool,
}

impl LoggedNotification {
    /// Builds an unread entry from a live event. The id is assigned on insertion.
    pub fn from_event(event: NotificationEvent, surfaced: bool, received_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            server_id: None,
            title: event.title.clone(),
            body: event.body.clone(),
            category: event.category,
            created_at: event.occurred_at().unwrap_or(received_at),
            event: Some(event),
            read: false,
            surfaced,
        }
    }
}

/// Capped, newest-first notification log.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    capacity: usize,
    entries: VecDeque<LoggedNotification>,
    next_id: u64,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl NotificationLog {
    /// Creates an empty log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            next_id: 1,
        }
    }

    /// Prepends a live event and drops the oldest entries beyond capacity.
    /// Returns the local id given to the entry.
    pub fn record(&mut self, event: NotificationEvent, surfaced: bool, received_at: DateTime<Utc>) -> u64 {
        self.push_front(LoggedNotification::from_event(event, surfaced, received_at))
    }

    /// Merges a REST-fetched list (newest first) behind the live entries.
    ///
    /// Live entries that arrived before the fetch completed stay on top;
    /// previously backfilled entries are replaced.
    pub fn backfill(&mut self, fetched: Vec<LoggedNotification>) {
        self.entries.retain(|entry| entry.server_id.is_none());
        for mut entry in fetched {
            if self.entries.len() >= self.capacity {
                break;
            }
            entry.id = self.allocate_id();
            self.entries.push_back(entry);
        }
    }

    /// Marks one entry read. Returns `true` if it existed and was unread.
    pub fn mark_read(&mut self, id: u64) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks everything read. Returns how many entries changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|entry| !entry.read) {
            entry.read = true;
            changed += 1;
        }
        changed
    }

    /// Empties the log.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of unread entries.
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.read).count()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LoggedNotification> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest first.
    pub fn entries(&self) -> Vec<LoggedNotification> {
        self.entries.iter().cloned().collect()
    }

    /// Looks up an entry by its backend id.
    pub fn find_by_server_id(&self, server_id: i64) -> Option<&LoggedNotification> {
        self.entries.iter().find(|entry| entry.server_id == Some(server_id))
    }

    /// Looks up an entry by its local id.
    pub fn get(&self, id: u64) -> Option<&LoggedNotification> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push_front(&mut self, mut entry: LoggedNotification) -> u64 {
        let id = self.allocate_id();
        entry.id = id;
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        id
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Badge text for the bell: nothing at zero, the count up to 99, then `99+`.
pub fn badge_label(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=99 => Some(unread.to_string()),
        _ => Some("99+".to_string()),
    }
}

/// Compact age of an entry: `now`, `{m}m`, `{h}h` or `{d}d`.
pub fn age_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else {
        format!("{}d", days)
    }
}
