//! Alert dispatch.
//!
//! Every Warning or Critical reading gets exactly one delivery attempt on
//! its own detached thread. There is no retry, no dedup and no rate limit:
//! K qualifying readings produce K attempts, which may finish in any order.
//! Delivery failures are logged and dropped here; nothing is reported back
//! to the tick that submitted the attempt.
//!
//! The dispatcher counts attempts still running so a shutting-down process
//! can `drain` them before it exits.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::logging::{self, Component};
use crate::model::{LabeledReading, SeverityLabel};
use crate::notify::Notifier;

/// What the dispatcher decided for a reading. Says nothing about delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Safe reading, nothing sent.
    Skipped,
    /// A delivery attempt was handed to a background thread.
    Submitted,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// In-flight tracking
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Held by one attempt; releases its slot when dropped, whether the
/// attempt ran, panicked, or never started.
struct InFlightSlot(Arc<InFlight>);

impl InFlight {
    fn enter(this: &Arc<Self>) -> InFlightSlot {
        *this.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        InFlightSlot(Arc::clone(this))
    }

    fn current(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        self.0.idle.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    submitted: AtomicU64,
    in_flight: Arc<InFlight>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            submitted: AtomicU64::new(0),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Submits a delivery attempt for a non-Safe reading and returns
    /// without waiting for it.
    pub fn maybe_notify(&self, alert: &LabeledReading) -> Dispatch {
        self.submit_with(alert, spawn_detached)
    }

    fn submit_with<S>(&self, alert: &LabeledReading, spawn: S) -> Dispatch
    where
        S: FnOnce(Job) -> io::Result<()>,
    {
        if alert.label == SeverityLabel::Safe {
            return Dispatch::Skipped;
        }

        let notifier = Arc::clone(&self.notifier);
        let alert = alert.clone();
        let subject = alert.reading.disaster_label().to_string();

        // Counted before the spawn so a thread that cannot start is still
        // an attempt, and a failed one.
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let slot = InFlight::enter(&self.in_flight);

        let job: Job = Box::new(move || {
            let _slot = slot;
            deliver(notifier.as_ref(), &alert);
        });

        match spawn(job) {
            Ok(()) => logging::debug(
                Component::Dispatch,
                Some(&subject),
                "delivery attempt submitted",
            ),
            Err(e) => logging::error(
                Component::Dispatch,
                Some(&subject),
                &format!("delivery attempt failed, could not start thread: {}", e),
            ),
        }

        Dispatch::Submitted
    }

    /// Number of delivery attempts handed off so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Attempts that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    /// Waits up to `timeout` for every running attempt to finish.
    /// Returns `false` if some were still running when time ran out.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.in_flight.count.lock().unwrap_or_else(PoisonError::into_inner);

        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = match self.in_flight.idle.wait_timeout(count, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

fn spawn_detached(job: Job) -> io::Result<()> {
    thread::Builder::new()
        .name("alert-dispatch".to_string())
        .spawn(job)
        .map(|_detached| ())
}

fn deliver(notifier: &dyn Notifier, alert: &LabeledReading) {
    let subject = alert.reading.disaster_label();
    match notifier.notify(alert) {
        Ok(()) => logging::info(
            Component::Notify,
            Some(subject),
            &format!("{} alert sent (score {:.1})", alert.label, alert.score),
        ),
        Err(e) => logging::log_delivery_failure(subject, &e),
    }
}
