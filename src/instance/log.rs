use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::utils::{split_lines, stamp_line};

pub const LOG_CAPACITY: usize = 500;

/// Bounded console history for one running server. Oldest lines are evicted
/// once the buffer holds more than its capacity.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    capacity: usize,
    lines: VecDeque<String>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity.min(LOG_CAPACITY)),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Splits `chunk` into lines, drops empty ones, and appends each with a
    /// capture timestamp.
    pub fn push_chunk(&mut self, chunk: &str, at: DateTime<Utc>) {
        for line in split_lines(chunk) {
            self.lines.push_back(stamp_line(line, at));
        }

        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// The most recent `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(start).cloned().collect()
    }
}
