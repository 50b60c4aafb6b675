//! Delayed callbacks for nodes.
//!
//! A [`Clock`] holds at most one pending delay. Scheduling again before it
//! fires moves the deadline and replaces the message, so a burst of calls
//! fires once with the payload of the last call. The callback runs
//! [`Object::tick`](crate::Object::tick) on the clock's worker thread.
//!
//! A delay too long to represent as a deadline stays pending without ever
//! firing, until it is re-armed or cancelled.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::atom::Atom;
use crate::node::Node;

struct Scheduled {
    /// `None` when the delay is beyond any representable instant.
    deadline: Option<Instant>,
    maker: Weak<Node>,
    message: Vec<Atom>,
}

#[derive(Default)]
struct State {
    scheduled: Option<Scheduled>,
    running: bool,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// A re-armable one-shot timer.
///
/// The worker thread is started on the first [`delay`](Clock::delay) and
/// stops when the clock is dropped. The maker is held weakly; a delay that
/// outlives its node does nothing.
#[derive(Default)]
pub struct Clock {
    shared: Arc<Shared>,
}

impl Clock {
    /// Creates an idle clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `maker` to tick with `message` after `ms` milliseconds,
    /// replacing any pending delay.
    pub fn delay(&self, maker: &Weak<Node>, message: Vec<Atom>, ms: f64) {
        let deadline = deadline_after(ms);
        let mut state = self.shared.state.lock();
        state.scheduled = Some(Scheduled {
            deadline,
            maker: maker.clone(),
            message,
        });
        if !state.running {
            state.running = self.spawn();
        }
        self.shared.wake.notify_one();
    }

    /// Drops the pending delay, if any.
    pub fn cancel(&self) {
        self.shared.state.lock().scheduled = None;
        self.shared.wake.notify_one();
    }

    /// Returns `true` while a delay is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().scheduled.is_some()
    }

    fn spawn(&self) -> bool {
        let shared = Arc::clone(&self.shared);
        match std::thread::Builder::new()
            .name("patchwerk-clock".to_string())
            .spawn(move || run(&shared))
        {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("clock worker failed to start: {err}");
                false
            }
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.shutdown = true;
        state.scheduled = None;
        self.shared.wake.notify_all();
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("pending", &self.is_pending())
            .finish()
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock();
    while !state.shutdown {
        let Some(deadline) = state.scheduled.as_ref().and_then(|s| s.deadline) else {
            shared.wake.wait(&mut state);
            continue;
        };
        if Instant::now() < deadline {
            shared.wake.wait_until(&mut state, deadline);
            continue;
        }
        if let Some(due) = state.scheduled.take() {
            MutexGuard::unlocked(&mut state, || fire(due));
        }
    }
}

/// Deadline `ms` milliseconds from now. Negative and NaN delays are
/// immediate.
fn deadline_after(ms: f64) -> Option<Instant> {
    let wait = Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).ok()?;
    Instant::now().checked_add(wait)
}

fn fire(due: Scheduled) {
    if let Some(node) = due.maker.upgrade() {
        node.tick(&due.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_without_maker_is_silent() {
        let clock = Clock::new();
        clock.delay(&Weak::new(), vec![Atom::Int(1)], 1.0);
        std::thread::sleep(Duration::from_millis(50));
        assert!(!clock.is_pending());
    }

    #[test]
    fn cancel_disarms() {
        let clock = Clock::new();
        clock.delay(&Weak::new(), Vec::new(), 10_000.0);
        assert!(clock.is_pending());
        clock.cancel();
        assert!(!clock.is_pending());
    }

    #[test]
    fn unrepresentable_delays_stay_pending() {
        assert!(deadline_after(f64::INFINITY).is_none());
        assert!(deadline_after(1e300).is_none());
        assert!(deadline_after(f64::NAN).is_some());
        assert!(deadline_after(-5.0).is_some());

        let clock = Clock::new();
        clock.delay(&Weak::new(), vec![Atom::Int(1)], 1e300);
        std::thread::sleep(Duration::from_millis(20));
        assert!(clock.is_pending());
        clock.delay(&Weak::new(), vec![Atom::Int(2)], 1.0);
        std::thread::sleep(Duration::from_millis(50));
        assert!(!clock.is_pending());
    }
}
