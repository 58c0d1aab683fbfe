use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use recruit_core::model::{
    PersistedProgress, QuestionId, SelectedOption, SessionStatus, SubmitReason, TestSession,
};
use recruit_core::time::Clock;
use storage::repository::ProgressRepository;

use super::countdown::CountdownHandle;
use super::dispatcher::{SubmissionDispatcher, SubmitOutcome};
use super::guard::GuardHandle;
use super::resolver::Resolution;
use super::{SharedSession, lock_session};
use crate::error::SessionError;

/// A running attempt with its countdown task and proctoring listeners.
///
/// Automatic submission triggers (time out, violations) arrive through
/// [`ActiveTest::next_trigger`]; the owner decides when to act on them.
pub struct ActiveTest {
    state: SharedSession,
    resolution: Resolution,
    dispatcher: SubmissionDispatcher,
    progress: Arc<dyn ProgressRepository>,
    clock: Clock,
    triggers: UnboundedReceiver<SubmitReason>,
    countdown: Option<CountdownHandle>,
    guard: Option<GuardHandle>,
}

impl ActiveTest {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: SharedSession,
        resolution: Resolution,
        dispatcher: SubmissionDispatcher,
        progress: Arc<dyn ProgressRepository>,
        clock: Clock,
        triggers: UnboundedReceiver<SubmitReason>,
        countdown: CountdownHandle,
        guard: GuardHandle,
    ) -> Self {
        Self {
            state,
            resolution,
            dispatcher,
            progress,
            clock,
            triggers,
            countdown: Some(countdown),
            guard: Some(guard),
        }
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Copy of the current session state for rendering.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Poisoned` if the session lock is poisoned.
    pub fn snapshot(&self) -> Result<TestSession, SessionError> {
        Ok(lock_session(&self.state)?.clone())
    }

    /// Record an answer; the latest selection for a question wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` when the session does not accept answers
    /// or the question is not part of it.
    pub fn select(&self, question: QuestionId, option: SelectedOption) -> Result<(), SessionError> {
        lock_session(&self.state)?.select(question, option)?;
        Ok(())
    }

    /// Wait for the countdown or the guard to ask for submission.
    ///
    /// Returns `None` once both have been stopped.
    pub async fn next_trigger(&mut self) -> Option<SubmitReason> {
        self.triggers.recv().await
    }

    /// Whether the countdown and guard are still attached.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.guard.is_some() || self.countdown.is_some()
    }

    /// Stop monitoring and submit.
    ///
    /// The countdown and guard are not restarted if the submission fails; a
    /// retry goes through this method again.
    ///
    /// # Errors
    ///
    /// See [`SubmissionDispatcher::submit`].
    pub async fn submit(&mut self, reason: SubmitReason) -> Result<SubmitOutcome, SessionError> {
        self.stop_monitoring();
        self.dispatcher.submit(reason).await
    }

    /// Handle for submitting from another task.
    #[must_use]
    pub fn dispatcher(&self) -> SubmissionDispatcher {
        self.dispatcher.clone()
    }

    fn stop_monitoring(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.release();
        }
        if let Some(countdown) = self.countdown.take() {
            countdown.stop();
        }
    }

    /// Leave the attempt.
    ///
    /// Listeners and the countdown are always released. An unsubmitted attempt
    /// keeps its progress record while the window is open so a later run
    /// resumes it; an expired one loses it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the progress record cannot be updated.
    pub async fn teardown(mut self) -> Result<(), SessionError> {
        self.stop_monitoring();
        let (schedule_id, status, window) = {
            let session = lock_session(&self.state)?;
            (session.schedule_id(), session.status(), session.window())
        };

        match status {
            SessionStatus::Submitted => {}
            SessionStatus::Submitting => {
                debug!(schedule_id = %schedule_id, "leaving with a submission in flight");
            }
            SessionStatus::Loading | SessionStatus::Active | SessionStatus::Error => {
                let record = PersistedProgress::from_window(&window);
                if record.is_expired_at(self.clock.now()) {
                    self.progress.remove_progress(schedule_id).await?;
                    info!(schedule_id = %schedule_id, "attempt expired, progress cleared");
                } else {
                    self.progress.put_progress(schedule_id, &record).await?;
                    info!(schedule_id = %schedule_id, "attempt left open, progress kept");
                }
            }
        }
        Ok(())
    }
}
