//! Server lifecycle: health state, in-flight accounting, and drain.
//!
//! Health is swapped atomically through `ArcSwap`. Each inference request
//! holds an [`InFlightGuard`]; the last guard to drop while draining wakes
//! [`ShutdownController::drain`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// `Starting -> Ready -> Draining -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    Draining,
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Starting => "starting",
            HealthState::Ready => "ready",
            HealthState::Draining => "draining",
            HealthState::Stopped => "stopped",
        }
    }

    /// Only a ready server takes new inference requests.
    #[must_use]
    pub fn accepts_requests(self) -> bool {
        self == HealthState::Ready
    }
}

#[derive(Debug)]
struct InFlight {
    count: AtomicU64,
    idle: Notify,
}

/// Shared lifecycle handle for the transport and its handlers.
#[derive(Debug)]
pub struct ShutdownController {
    state: ArcSwap<HealthState>,
    in_flight: Arc<InFlight>,
    signal: watch::Sender<bool>,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            state: ArcSwap::from_pointee(HealthState::Starting),
            in_flight: Arc::new(InFlight {
                count: AtomicU64::new(0),
                idle: Notify::new(),
            }),
            signal,
        }
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.state.load()
    }

    pub fn set_ready(&self) {
        self.state.store(Arc::new(HealthState::Ready));
    }

    /// Stops admitting requests and notifies every shutdown receiver.
    /// Returns `false` if draining had already begun.
    pub fn trigger_shutdown(&self) -> bool {
        let previous = self.state.swap(Arc::new(HealthState::Draining));
        if matches!(*previous, HealthState::Draining | HealthState::Stopped) {
            self.state.store(previous);
            return false;
        }
        self.signal.send_replace(true);
        true
    }

    /// Resolves once shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Counts one in-flight request until the guard is dropped.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Waits until no request is in flight or `timeout` elapses.
    ///
    /// On success the state becomes `Stopped` and `true` is returned; on
    /// timeout the state stays `Draining`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight_count() == 0 {
                self.state.store(Arc::new(HealthState::Stopped));
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}
