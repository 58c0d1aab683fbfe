use chrono::{DateTime, Duration, Utc};

use crate::model::ScheduleId;

/// Used when the server omits `duration_minutes`.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// A start instant plus a duration in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestWindow {
    start: DateTime<Utc>,
    duration_minutes: u32,
}

impl TestWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// The window is closed strictly after its end instant.
    #[must_use]
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        now > self.end()
    }

    /// Whole seconds left until the end, floored, never negative.
    #[must_use]
    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.end() - now).num_seconds()).unwrap_or(0)
    }
}

/// Authoritative schedule as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: ScheduleId,
    pub test_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub job_title: Option<String>,
}

impl Schedule {
    #[must_use]
    pub fn window(&self) -> TestWindow {
        TestWindow::new(self.test_time, self.duration_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn closed_only_after_end() {
        let start = fixed_now();
        let window = TestWindow::new(start, 60);
        let end = start + Duration::minutes(60);
        assert_eq!(window.end(), end);
        assert!(!window.is_closed_at(end));
        assert!(window.is_closed_at(end + Duration::milliseconds(1)));
    }

    #[test]
    fn remaining_seconds_floor_partial_seconds() {
        let start = fixed_now();
        let window = TestWindow::new(start, 1);
        let now = start + Duration::milliseconds(500);
        assert_eq!(window.remaining_seconds_at(now), 59);
        assert_eq!(window.remaining_seconds_at(start + Duration::minutes(5)), 0);
    }
}
