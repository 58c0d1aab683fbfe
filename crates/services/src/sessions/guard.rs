use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use recruit_core::model::{SessionStatus, SubmitReason};
use recruit_core::proctor::{EventKind, ProctorEvent, Verdict, evaluate};

use super::SharedSession;

pub type ListenerId = u64;

/// Callback registered for one event kind. Returns what should happen to the event.
pub type Listener = Arc<dyn Fn(&ProctorEvent) -> Verdict + Send + Sync>;

/// Something that delivers input events to registered listeners.
///
/// Listeners stay registered until removed; nothing is detached implicitly.
pub trait EventSource: Send + Sync {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Returns whether the listener was still registered.
    fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool;
}

//
// ─── EVENT BUS ─────────────────────────────────────────────────────────────────
//

/// In-process `EventSource` the terminal client feeds and tests drive directly.
#[derive(Clone, Default)]
pub struct EventBus {
    next_id: Arc<AtomicU64>,
    listeners: Arc<Mutex<BTreeMap<EventKind, Vec<(ListenerId, Listener)>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener of its kind and merge their verdicts.
    ///
    /// With no listeners the event is allowed.
    pub fn dispatch(&self, event: &ProctorEvent) -> Verdict {
        let targets: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners
                .get(&event.kind())
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };
        targets
            .iter()
            .fold(Verdict::Allow, |verdict, listener| verdict.merge(listener(event)))
    }

    /// Total registrations across all kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl EventSource for EventBus {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, listener));
        id
    }

    fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }
}

//
// ─── GUARD ─────────────────────────────────────────────────────────────────────
//

/// Proctoring policy bound to one session.
pub struct ProctorGuard;

impl ProctorGuard {
    /// Register listeners for every proctored event kind.
    ///
    /// Violations are forwarded over `triggers` at most once, and only while the
    /// session is `Active`. The returned handle detaches everything it added.
    #[must_use]
    pub fn attach(
        source: Arc<dyn EventSource>,
        state: SharedSession,
        triggers: UnboundedSender<SubmitReason>,
    ) -> GuardHandle {
        let fired = Arc::new(AtomicBool::new(false));
        let listener: Listener = Arc::new(move |event: &ProctorEvent| {
            let verdict = evaluate(event);
            let Verdict::Violation(reason) = verdict else {
                return verdict;
            };
            let active = state
                .lock()
                .map(|session| session.status() == SessionStatus::Active)
                .unwrap_or(false);
            if !active {
                debug!(?event, "ignoring violation outside an active session");
                return Verdict::Suppress;
            }
            if !fired.swap(true, Ordering::SeqCst) {
                info!(reason = reason.annotation(), "proctoring violation");
                if triggers.send(reason).is_err() {
                    debug!("session owner gone, violation not delivered");
                }
            }
            verdict
        });

        let registrations = EventKind::ALL
            .iter()
            .map(|kind| (*kind, source.add_listener(*kind, Arc::clone(&listener))))
            .collect();
        GuardHandle {
            source,
            registrations,
        }
    }
}

/// Disposer for the guard's listeners. Released explicitly or on drop.
pub struct GuardHandle {
    source: Arc<dyn EventSource>,
    registrations: Vec<(EventKind, ListenerId)>,
}

impl GuardHandle {
    /// Detach every listener; later calls do nothing.
    pub fn release(&mut self) {
        for (kind, id) in self.registrations.drain(..) {
            self.source.remove_listener(kind, id);
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.registrations.is_empty()
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.release();
    }
}
