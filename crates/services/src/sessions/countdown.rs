use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use recruit_core::countdown::TickOutcome;
use recruit_core::model::SubmitReason;

use super::SharedSession;

const TICK: Duration = Duration::from_secs(1);

/// Spawns the 1 Hz countdown task for a session.
pub struct CountdownDriver;

impl CountdownDriver {
    /// Tick the session once a second; send `TimeExpired` once when it hits zero.
    ///
    /// The task ends by itself when the session leaves `Active`. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn spawn(state: SharedSession, triggers: UnboundedSender<SubmitReason>) -> CountdownHandle {
        let task = tokio::spawn(async move {
            let mut ticker = interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let outcome = match state.lock() {
                    Ok(mut session) => session.tick(),
                    Err(_) => {
                        warn!("session lock poisoned, stopping countdown");
                        break;
                    }
                };
                match outcome {
                    TickOutcome::Running(_) => {}
                    TickOutcome::Expired => {
                        debug!("countdown reached zero");
                        if triggers.send(SubmitReason::TimeExpired).is_err() {
                            debug!("session owner gone, expiry not delivered");
                        }
                        break;
                    }
                    TickOutcome::Stopped => break,
                }
            }
        });
        CountdownHandle { task }
    }
}

/// Owns the countdown task; stopping or dropping it aborts the task.
#[derive(Debug)]
pub struct CountdownHandle {
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recruit_core::model::{
        Question, QuestionId, ScheduleId, SessionStatus, TestSession, TestWindow,
    };
    use recruit_core::time::fixed_now;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::unbounded_channel;

    fn active_session(remaining: u64) -> SharedSession {
        let mut session = TestSession::loading(
            ScheduleId::new(7),
            TestWindow::new(fixed_now(), 60),
            remaining,
            "Test",
        );
        let question = Question::new(
            QuestionId::new(1),
            "2 + 2?",
            ["3".into(), "4".into(), "5".into(), "22".into()],
        )
        .unwrap();
        session.activate(vec![question]).unwrap();
        Arc::new(Mutex::new(session))
    }

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once() {
        let state = active_session(3);
        let (tx, mut rx) = unbounded_channel();
        let handle = CountdownDriver::spawn(state.clone(), tx);

        assert_eq!(rx.recv().await, Some(SubmitReason::TimeExpired));
        assert_eq!(rx.recv().await, None);
        assert_eq!(state.lock().unwrap().remaining_seconds(), 0);

        // Later ticks on the session never go below zero or fire again.
        assert_eq!(state.lock().unwrap().tick(), TickOutcome::Stopped);
        assert_eq!(state.lock().unwrap().remaining_seconds(), 0);
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_second() {
        let state = active_session(10);
        let (tx, _rx) = unbounded_channel();
        let _handle = CountdownDriver::spawn(state.clone(), tx);

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(state.lock().unwrap().remaining_seconds(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_session_leaves_active() {
        let state = active_session(5);
        let (tx, mut rx) = unbounded_channel();
        let _handle = CountdownDriver::spawn(state.clone(), tx);

        state
            .lock()
            .unwrap()
            .begin_submission(SubmitReason::Manual)
            .unwrap();
        assert_eq!(state.lock().unwrap().status(), SessionStatus::Submitting);

        assert_eq!(rx.recv().await, None);
        assert_eq!(state.lock().unwrap().remaining_seconds(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_aborts_the_task() {
        let state = active_session(5);
        let (tx, mut rx) = unbounded_channel();
        drop(CountdownDriver::spawn(state.clone(), tx));

        assert_eq!(rx.recv().await, None);
        assert_eq!(state.lock().unwrap().remaining_seconds(), 5);
    }
}
