//! Running a proctored attempt: resolve the window, drive the countdown, guard
//! input, collect answers and submit them once.

mod active;
mod countdown;
mod dispatcher;
mod guard;
mod resolver;
mod service;

use std::sync::{Arc, Mutex, MutexGuard};

use recruit_core::model::TestSession;

use crate::error::SessionError;

pub use active::ActiveTest;
pub use countdown::{CountdownDriver, CountdownHandle};
pub use dispatcher::{SubmissionDispatcher, SubmitOutcome, submission_notice};
pub use guard::{EventBus, EventSource, GuardHandle, Listener, ListenerId, ProctorGuard};
pub use resolver::{Resolution, ResolvedSession, SessionResolver};
pub use service::{DEFAULT_JOB_TITLE, TestSessionService};

/// Session state shared by the countdown task, guard listeners and dispatcher.
pub type SharedSession = Arc<Mutex<TestSession>>;

pub(crate) fn lock_session(state: &SharedSession) -> Result<MutexGuard<'_, TestSession>, SessionError> {
    state.lock().map_err(|_| SessionError::Poisoned)
}
