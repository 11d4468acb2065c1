use std::collections::VecDeque;

use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::shared::LogLine;

pub const MAX_LOG_ENTRIES: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub is_error: bool,
}

/// The user-facing session log, most recent first. Every entry is also
/// mirrored into tracing.
#[derive(Debug, Default)]
pub struct LogStream {
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

impl LogStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, is_error: bool) {
        let message = message.into();
        if is_error {
            error!("{message}");
        } else {
            info!("{message}");
        }
        self.entries.push_front(LogEntry {
            id: self.next_id,
            message,
            timestamp: Local::now(),
            is_error,
        });
        self.next_id += 1;
        self.entries.truncate(MAX_LOG_ENTRIES);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, false);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, true);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.entries
            .iter()
            .map(|e| LogLine { time: e.timestamp, message: e.message.clone(), is_error: e.is_error })
            .collect()
    }
}
