//! Single-flight scan + aggregate cycles.
//!
//! `Idle -> Scanning -> Idle`. The requester flips the state under a mutex, so
//! a request that finds a scan in flight is coalesced into it instead of
//! queueing another one. Coalesced requests mark the cycle for one trailing
//! rerun, so a change made after the in-flight cycle read the registry still
//! shows up before the coordinator goes idle. The worker publishes each
//! finished snapshot by swapping an `Arc`, so readers only ever see complete
//! cycles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select};

use crate::aggregate::aggregate;
use crate::model::{CoreEvent, PortSnapshot, RefreshStatus};
use crate::registry::SharedRegistry;
use crate::scanner::SocketScanner;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CycleState {
    Idle,
    /// `rerun` is set when a request arrived while this cycle was running.
    Scanning { rerun: bool },
}

impl CycleState {
    fn is_scanning(self) -> bool {
        matches!(self, CycleState::Scanning { .. })
    }
}

struct Shared {
    scanner: SocketScanner,
    registry: SharedRegistry,
    state: Mutex<CycleState>,
    idle: Condvar,
    current: RwLock<Arc<PortSnapshot>>,
    events: Option<Sender<CoreEvent>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn run_cycle(&self) {
        let started = Instant::now();
        match panic::catch_unwind(AssertUnwindSafe(|| self.build_snapshot())) {
            Ok(snapshot) => {
                log::debug!(
                    "Refresh #{} finished in {:?} ({} in use)",
                    snapshot.generation,
                    started.elapsed(),
                    snapshot.in_use().count()
                );
                self.publish(snapshot);
            }
            Err(_) => log::error!("Refresh cycle panicked; keeping previous snapshot"),
        }
    }

    fn build_snapshot(&self) -> PortSnapshot {
        let facts = self.scanner.scan();
        // Read the registry after the scan so ports added mid-scan are included.
        let entries = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            registry.list().to_vec()
        };
        let generation = self.snapshot().generation + 1;
        PortSnapshot {
            generation,
            records: aggregate(&entries, &facts),
            taken_at: Instant::now(),
        }
    }

    fn publish(&self, snapshot: PortSnapshot) {
        let snapshot = Arc::new(snapshot);
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = snapshot.clone();
        }
        if let Some(events) = &self.events {
            let _ = events.send(CoreEvent::SnapshotUpdated(snapshot));
        }
    }

    /// Called by the worker after each cycle. Returns `true` when a coalesced
    /// request asks for another cycle; otherwise the coordinator goes idle.
    fn finish_or_rerun(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == (CycleState::Scanning { rerun: true }) {
            *state = CycleState::Scanning { rerun: false };
            return true;
        }
        *state = CycleState::Idle;
        drop(state);
        self.idle.notify_all();
        false
    }

    fn set_idle(&self) {
        *lock(&self.state) = CycleState::Idle;
        self.idle.notify_all();
    }

    fn snapshot(&self) -> Arc<PortSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
    jobs: Sender<()>,
}

impl RefreshCoordinator {
    pub fn new(
        scanner: SocketScanner,
        registry: SharedRegistry,
        events: Option<Sender<CoreEvent>>,
    ) -> Self {
        let shared = Arc::new(Shared {
            scanner,
            registry,
            state: Mutex::new(CycleState::Idle),
            idle: Condvar::new(),
            current: RwLock::new(Arc::new(PortSnapshot::empty())),
            events,
        });
        let (jobs, rx) = crossbeam_channel::unbounded();
        spawn_worker(shared.clone(), rx);
        Self { shared, jobs }
    }

    /// Queue a scan unless one is already running. Never blocks on the scan.
    ///
    /// A request that lands on a running scan returns `Coalesced` and makes
    /// the worker run exactly one more cycle once the current one finishes,
    /// however many requests pile up meanwhile.
    pub fn refresh(&self) -> RefreshStatus {
        {
            let mut state = lock(&self.shared.state);
            if let CycleState::Scanning { rerun } = &mut *state {
                log::trace!("Refresh coalesced into in-flight scan");
                *rerun = true;
                return RefreshStatus::Coalesced;
            }
            *state = CycleState::Scanning { rerun: false };
        }

        if self.jobs.send(()).is_err() {
            log::error!("Refresh worker is gone; staying idle");
            self.shared.set_idle();
        }
        RefreshStatus::Started
    }

    /// Refresh (or join the in-flight scan) and wait for its snapshot.
    pub fn refresh_blocking(&self) -> Arc<PortSnapshot> {
        self.refresh();
        self.wait_idle();
        self.current()
    }

    pub fn wait_idle(&self) {
        let mut state = lock(&self.shared.state);
        while state.is_scanning() {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn is_scanning(&self) -> bool {
        lock(&self.shared.state).is_scanning()
    }

    pub fn current(&self) -> Arc<PortSnapshot> {
        self.shared.snapshot()
    }

    /// Refresh once after `delay`, e.g. to let the OS release a socket after
    /// its owner was killed.
    pub fn schedule_refresh(&self, delay: Duration) -> thread::JoinHandle<RefreshStatus> {
        let coordinator = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            coordinator.refresh()
        })
    }

    /// Call `refresh` every `interval` until the returned `Ticker` is dropped.
    pub fn spawn_ticker(&self, interval: Duration) -> Ticker {
        let coordinator = self.clone();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::spawn(move || {
            let ticks = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(ticks) -> _ => {
                        if coordinator.refresh() == RefreshStatus::Coalesced {
                            log::trace!("Timer tick skipped, scan still running");
                        }
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
            log::debug!("Refresh ticker stopped");
        });
        Ticker {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

fn spawn_worker(shared: Arc<Shared>, rx: Receiver<()>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for () in rx.iter() {
            loop {
                shared.run_cycle();
                if !shared.finish_or_rerun() {
                    break;
                }
            }
        }
    })
}

/// Periodic refresh trigger. Dropping it stops the timer thread and waits
/// for it to exit; a scan already queued still runs.
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
