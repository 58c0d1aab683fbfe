use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info};

use recruit_core::model::{PersistedProgress, Schedule, ScheduleId, TestSession, TestWindow};
use recruit_core::time::Clock;
use storage::repository::ProgressRepository;

use super::service::DEFAULT_JOB_TITLE;
use crate::api::RecruitApi;
use crate::error::SessionError;

/// Which branch the resolver took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Picked up a stored attempt; its start time is kept.
    Resumed,
    /// Started now and stored the new record.
    Fresh,
}

#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub schedule: Schedule,
    pub session: TestSession,
    pub resolution: Resolution,
}

/// Decides whether a schedule resumes a stored attempt or starts a new one.
pub struct SessionResolver {
    clock: Clock,
    api: Arc<dyn RecruitApi>,
    progress: Arc<dyn ProgressRepository>,
}

impl SessionResolver {
    #[must_use]
    pub fn new(
        clock: Clock,
        api: Arc<dyn RecruitApi>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            api,
            progress,
        }
    }

    /// Check the schedule window and produce a `Loading` session.
    ///
    /// Writes progress only on the fresh-start branch.
    ///
    /// # Errors
    ///
    /// - `InvalidSchedule` for id 0, before any request.
    /// - `ScheduleNotFound` / `ScheduleUnavailable` when the schedule cannot be fetched.
    /// - `WindowClosed` once `now` is past the schedule's end.
    /// - `Storage` on progress store failures.
    pub async fn resolve(&self, id: ScheduleId) -> Result<ResolvedSession, SessionError> {
        if !id.is_valid() {
            return Err(SessionError::InvalidSchedule(id));
        }

        let schedule = match self.api.schedule(id).await {
            Ok(response) => response.into_schedule(id),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                return Err(SessionError::ScheduleNotFound);
            }
            Err(err) => return Err(SessionError::ScheduleUnavailable(err)),
        };

        let now = self.clock.now();
        let window = schedule.window();
        if window.is_closed_at(now) {
            info!(schedule_id = %id, ended_at = %window.end(), "test window closed");
            return Err(SessionError::WindowClosed {
                ended_at: window.end(),
            });
        }

        let title = schedule
            .job_title
            .clone()
            .unwrap_or_else(|| DEFAULT_JOB_TITLE.to_owned());

        if let Some(stored) = self.progress.get_progress(id).await? {
            if !stored.is_expired_at(now) {
                let remaining = stored.remaining_seconds_at(now);
                info!(schedule_id = %id, remaining, "resuming stored attempt");
                let session = TestSession::loading(id, stored.window(), remaining, title);
                return Ok(ResolvedSession {
                    schedule,
                    session,
                    resolution: Resolution::Resumed,
                });
            }
            debug!(schedule_id = %id, "discarding expired progress record");
            self.progress.remove_progress(id).await?;
        }

        let fresh = TestWindow::new(now, schedule.duration_minutes);
        self.progress
            .put_progress(id, &PersistedProgress::from_window(&fresh))
            .await?;
        let remaining = fresh.remaining_seconds_at(now);
        info!(schedule_id = %id, remaining, "starting fresh attempt");
        let session = TestSession::loading(id, fresh, remaining, title);
        Ok(ResolvedSession {
            schedule,
            session,
            resolution: Resolution::Fresh,
        })
    }
}
