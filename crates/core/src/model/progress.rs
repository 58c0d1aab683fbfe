use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TestWindow;

/// Local durable record that lets a reload resume a running attempt.
///
/// Keyed by schedule id in storage; at most one record per schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProgress {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl PersistedProgress {
    #[must_use]
    pub fn new(start_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start_time,
            duration_minutes,
        }
    }

    #[must_use]
    pub fn from_window(window: &TestWindow) -> Self {
        Self::new(window.start(), window.duration_minutes())
    }

    #[must_use]
    pub fn window(&self) -> TestWindow {
        TestWindow::new(self.start_time, self.duration_minutes)
    }

    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.window().end()
    }

    /// Expired from the end instant onward; a record is never resumed at `now == end`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time()
    }

    #[must_use]
    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> u64 {
        self.window().remaining_seconds_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn remaining_is_floor_of_millis_left() {
        let t0 = fixed_now();
        let record = PersistedProgress::new(t0, 60);
        let now = t0 + Duration::milliseconds(1_234_567);
        // (3_600_000 - 1_234_567) / 1000 = 2365.433
        assert_eq!(record.remaining_seconds_at(now), 2365);
        assert!(!record.is_expired_at(now));
    }

    #[test]
    fn expired_exactly_at_end() {
        let t0 = fixed_now();
        let record = PersistedProgress::new(t0, 30);
        assert!(record.is_expired_at(t0 + Duration::minutes(30)));
        assert!(!record.is_expired_at(t0 + Duration::minutes(30) - Duration::milliseconds(1)));
    }
}
