use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::warn;

use crate::aggregate::filter;
use crate::catalog::PortCatalog;
use crate::config::Config;
use crate::model::*;
use crate::platform::{SystemProcesses, SystemSockets};
use crate::refresh::{RefreshCoordinator, Ticker};
use crate::registry::{PortRegistry, RegistryError, SharedRegistry};
use crate::scanner::{SocketScanner, SocketTable};
use crate::terminator::{ProcessControl, ProcessTerminator};

/// Everything a front-end needs: the registry, the refresh cycle and the
/// kill path, wired together.
pub struct PortManager {
    config: Config,
    registry: SharedRegistry,
    coordinator: RefreshCoordinator,
    terminator: ProcessTerminator,
    worker: Sender<WorkerCommand>,
    events: Receiver<CoreEvent>,
    ticker: Option<Ticker>,
}

impl PortManager {
    pub fn with_system(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(SystemSockets), Arc::new(SystemProcesses))
    }

    pub fn new(
        config: Config,
        sockets: Arc<dyn SocketTable>,
        processes: Arc<dyn ProcessControl>,
    ) -> Result<Self> {
        let mut registry = PortRegistry::initialize(PortCatalog::builtin());
        for extra in &config.ports {
            match registry.add(extra.port, &extra.label) {
                Ok(()) => {}
                Err(RegistryError::DuplicatePort(port)) => {
                    warn!("Configured port {} is already in the catalog", port);
                }
                Err(err) => return Err(err).context("invalid port in configuration"),
            }
        }
        let registry = registry.into_shared();

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let coordinator = RefreshCoordinator::new(
            SocketScanner::new(sockets),
            registry.clone(),
            Some(events_tx.clone()),
        );
        let terminator = ProcessTerminator::new(processes);

        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        spawn_worker(
            worker_rx,
            events_tx,
            terminator.clone(),
            coordinator.clone(),
            config.refresh.kill_refresh_delay(),
        );

        Ok(Self {
            config,
            registry,
            coordinator,
            terminator,
            worker: worker_tx,
            events: events_rx,
            ticker: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ports(&self) -> Vec<PortEntry> {
        self.registry
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .list()
            .to_vec()
    }

    /// Register a custom port and refresh so it shows up right away.
    pub fn add_port(&self, port: u32, label: &str) -> Result<RefreshStatus, RegistryError> {
        self.registry
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .add(port, label)?;
        Ok(self.coordinator.refresh())
    }

    pub fn refresh(&self) -> RefreshStatus {
        self.coordinator.refresh()
    }

    pub fn refresh_blocking(&self) -> Arc<PortSnapshot> {
        self.coordinator.refresh_blocking()
    }

    pub fn wait_idle(&self) {
        self.coordinator.wait_idle();
    }

    pub fn snapshot(&self) -> Arc<PortSnapshot> {
        self.coordinator.current()
    }

    /// Latest snapshot narrowed by a search query.
    pub fn filtered(&self, query: &str) -> Vec<PortViewRecord> {
        filter(&self.snapshot().records, query)
    }

    /// Kill on the calling thread. On success a refresh follows after the
    /// configured settle delay.
    pub fn kill(&self, pid: u32) -> KillOutcome {
        let outcome = self.terminator.terminate(pid);
        if outcome.is_success() {
            self.coordinator
                .schedule_refresh(self.config.refresh.kill_refresh_delay());
        }
        outcome
    }

    /// Kill on the background worker; the result arrives as
    /// `CoreEvent::KillFinished`.
    pub fn request_kill(&self, pid: u32) {
        if self.worker.send(WorkerCommand::Kill { pid }).is_err() {
            warn!("Kill worker is gone; dropping kill of PID {}", pid);
        }
    }

    pub fn start_auto_refresh(&mut self) {
        if self.ticker.is_none() {
            self.coordinator.refresh();
            self.ticker = Some(self.coordinator.spawn_ticker(self.config.refresh.interval()));
        }
    }

    pub fn stop_auto_refresh(&mut self) {
        self.ticker.take();
    }

    pub fn events(&self) -> &Receiver<CoreEvent> {
        &self.events
    }
}

fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    events: Sender<CoreEvent>,
    terminator: ProcessTerminator,
    coordinator: RefreshCoordinator,
    settle: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for command in rx.iter() {
            match command {
                WorkerCommand::Kill { pid } => {
                    let outcome = terminator.terminate(pid);
                    let report = KillReport { pid, outcome };
                    if events.send(CoreEvent::KillFinished(report)).is_err() {
                        break;
                    }
                    if outcome.is_success() {
                        thread::sleep(settle);
                        coordinator.refresh();
                    }
                }
            }
        }
    })
}
