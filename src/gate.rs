//! Business-hours gate. While closed the main loop parks, the engine flushes
//! and drops its file handles, and checkpoints are cleared.

use chrono::{NaiveDateTime, Timelike};

#[derive(Debug, Clone, Copy)]
pub struct BusinessHours {
    opening_hour: u32,
    closing_hour: u32,
}

impl BusinessHours {
    pub fn new(opening_hour: u32, closing_hour: u32) -> Self {
        Self {
            opening_hour,
            closing_hour,
        }
    }

    /// Open in `[opening_hour, closing_hour)` local time.
    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        let hour = now.hour();
        hour >= self.opening_hour && hour < self.closing_hour
    }
}
