//! Remaining-time bookkeeping for a running attempt.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Expired,
    Cancelled,
}

/// Result of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting; carries the seconds left after this tick.
    Running(u64),
    /// Reached zero on this tick. Reported exactly once.
    Expired,
    /// Already expired or cancelled; nothing happened.
    Stopped,
}

/// Seconds counter that fires `Expired` once when it hits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    phase: Phase,
}

impl Countdown {
    #[must_use]
    pub fn new(remaining_seconds: u64) -> Self {
        Self {
            remaining: remaining_seconds,
            phase: Phase::Running,
        }
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Stopped;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.phase = Phase::Expired;
            return TickOutcome::Expired;
        }
        TickOutcome::Running(self.remaining)
    }

    /// Stop without expiring; later ticks report `Stopped`.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Cancelled;
        }
    }
}

/// Render seconds as `MM:SS`; minutes are not wrapped at 60.
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_once_and_never_goes_negative() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.tick(), TickOutcome::Running(1));
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        for _ in 0..5 {
            assert_eq!(countdown.tick(), TickOutcome::Stopped);
        }
        assert_eq!(countdown.remaining_seconds(), 0);
    }

    #[test]
    fn zero_start_expires_on_first_tick() {
        let mut countdown = Countdown::new(0);
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        assert_eq!(countdown.tick(), TickOutcome::Stopped);
    }

    #[test]
    fn cancelled_countdown_never_expires() {
        let mut countdown = Countdown::new(1);
        countdown.cancel();
        assert_eq!(countdown.tick(), TickOutcome::Stopped);
        assert_eq!(countdown.remaining_seconds(), 1);
        assert!(!countdown.is_running());
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(5400), "90:00");
        assert_eq!(format_clock(6_001), "100:01");
    }
}
