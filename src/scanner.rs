//! Listening-socket discovery.
//!
//! `SocketScanner::scan` never fails: an OS tool that cannot be started, exits
//! non-zero or prints nothing usable yields an empty map, so the periodic
//! refresh keeps running and every port simply reads as free for that cycle.
//! The cost is that a broken scanner looks exactly like an idle machine.
//! Failures are logged at `warn` level, and `try_scan` hands the error back to
//! callers who want to show it.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{ActiveSocketFact, RawListener};

pub const UNKNOWN_PROCESS: &str = "Unknown";

/// port -> owning process, at most one fact per port.
pub type SocketFacts = HashMap<u16, ActiveSocketFact>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to execute {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed: {stderr}")]
    CommandFailed { tool: &'static str, stderr: String },
    #[error("socket table unavailable: {0}")]
    Unavailable(String),
}

/// OS capability: enumerate listening sockets and resolve process names.
pub trait SocketTable: Send + Sync {
    /// Raw listener rows in whatever order the OS reports them.
    fn listening_sockets(&self) -> Result<Vec<RawListener>, ScanError>;

    /// `None` when the process is gone or cannot be inspected.
    fn process_name(&self, pid: u32) -> Option<String>;
}

#[derive(Clone)]
pub struct SocketScanner {
    table: Arc<dyn SocketTable>,
}

impl SocketScanner {
    pub fn new(table: Arc<dyn SocketTable>) -> Self {
        Self { table }
    }

    pub fn scan(&self) -> SocketFacts {
        match self.try_scan() {
            Ok(facts) => facts,
            Err(err) => {
                log::warn!("Port scan failed, treating all ports as free: {}", err);
                SocketFacts::new()
            }
        }
    }

    pub fn try_scan(&self) -> Result<SocketFacts, ScanError> {
        let rows = self.table.listening_sockets()?;
        log::trace!("Socket table returned {} listening rows", rows.len());
        Ok(self.resolve(rows))
    }

    /// First row per port wins, except that an owner-less row (pid 0, the
    /// socket belongs to a process we may not inspect) gives way to a later
    /// row for the same port that names its owner.
    fn resolve(&self, rows: Vec<RawListener>) -> SocketFacts {
        let mut facts = SocketFacts::new();
        let mut names: HashMap<u32, String> = HashMap::new();

        for row in rows {
            if let Some(existing) = facts.get(&row.port) {
                if existing.pid != 0 || row.pid == 0 {
                    continue;
                }
            }

            let process_name = if row.pid == 0 {
                UNKNOWN_PROCESS.to_string()
            } else {
                names
                    .entry(row.pid)
                    .or_insert_with(|| {
                        self.table
                            .process_name(row.pid)
                            .or(row.command)
                            .filter(|n| !n.is_empty())
                            .unwrap_or_else(|| UNKNOWN_PROCESS.to_string())
                    })
                    .clone()
            };

            facts.insert(
                row.port,
                ActiveSocketFact {
                    port: row.port,
                    transport: row.transport,
                    pid: row.pid,
                    process_name,
                },
            );
        }
        facts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::Transport;

    /// Scripted socket table for tests.
    #[derive(Default)]
    pub(crate) struct FakeTable {
        pub rows: Mutex<Option<Vec<RawListener>>>,
        pub names: Mutex<HashMap<u32, String>>,
        pub lookups: AtomicUsize,
    }

    impl FakeTable {
        pub fn with_rows(rows: Vec<RawListener>) -> Self {
            Self {
                rows: Mutex::new(Some(rows)),
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self::default()
        }

        pub fn name(self, pid: u32, name: &str) -> Self {
            self.names.lock().unwrap().insert(pid, name.to_string());
            self
        }
    }

    impl SocketTable for FakeTable {
        fn listening_sockets(&self) -> Result<Vec<RawListener>, ScanError> {
            self.rows
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ScanError::Unavailable("scripted failure".to_string()))
        }

        fn process_name(&self, pid: u32) -> Option<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.names.lock().unwrap().get(&pid).cloned()
        }
    }

    pub(crate) fn row(transport: Transport, port: u16, pid: u32) -> RawListener {
        RawListener {
            transport,
            port,
            pid,
            command: None,
        }
    }

    #[test]
    fn failure_degrades_to_empty() {
        let scanner = SocketScanner::new(Arc::new(FakeTable::failing()));
        assert!(scanner.scan().is_empty());
        assert!(scanner.try_scan().is_err());
    }

    #[test]
    fn first_seen_wins_for_duplicate_ports() {
        let table = FakeTable::with_rows(vec![
            row(Transport::Tcp, 3000, 11),
            row(Transport::Tcp, 3000, 22),
            row(Transport::Udp, 3000, 33),
        ])
        .name(11, "node")
        .name(22, "other");
        let facts = SocketScanner::new(Arc::new(table)).scan();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[&3000].pid, 11);
        assert_eq!(facts[&3000].process_name, "node");
    }

    #[test]
    fn missing_process_becomes_unknown() {
        let table = FakeTable::with_rows(vec![row(Transport::Tcp, 8080, 4242)]);
        let facts = SocketScanner::new(Arc::new(table)).scan();
        assert_eq!(facts[&8080].process_name, UNKNOWN_PROCESS);
        assert_eq!(facts[&8080].pid, 4242);
    }

    #[test]
    fn inline_command_used_when_lookup_fails() {
        let mut listener = row(Transport::Tcp, 5173, 77);
        listener.command = Some("vite".to_string());
        let facts = SocketScanner::new(Arc::new(FakeTable::with_rows(vec![listener]))).scan();
        assert_eq!(facts[&5173].process_name, "vite");
    }

    #[test]
    fn owner_less_socket_is_in_use_and_memoises_lookups() {
        let table = Arc::new(
            FakeTable::with_rows(vec![
                row(Transport::Tcp, 135, 0),
                row(Transport::Tcp, 5432, 9),
                row(Transport::Tcp, 5433, 9),
            ])
            .name(9, "postgres"),
        );
        let facts = SocketScanner::new(table.clone()).scan();
        assert_eq!(facts[&135].pid, 0);
        assert_eq!(facts[&135].process_name, UNKNOWN_PROCESS);
        assert_eq!(facts[&5433].process_name, "postgres");
        assert_eq!(table.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn named_owner_replaces_owner_less_row() {
        let table = FakeTable::with_rows(vec![
            row(Transport::Tcp, 8080, 0),
            row(Transport::Tcp, 8080, 31),
            row(Transport::Tcp, 8080, 0),
        ])
        .name(31, "java");
        let facts = SocketScanner::new(Arc::new(table)).scan();
        assert_eq!(facts[&8080].pid, 31);
        assert_eq!(facts[&8080].process_name, "java");
    }

    #[test]
    fn registered_port_held_by_other_user_reads_in_use() {
        let table = FakeTable::with_rows(crate::platform::parse::parse_ss(
            "tcp LISTEN 0 244 127.0.0.1:5432 0.0.0.0:*",
        ));
        let facts = SocketScanner::new(Arc::new(table)).scan();
        let entries = vec![crate::model::PortEntry {
            port: 5432,
            label: "PostgreSQL".to_string(),
            is_custom: false,
        }];
        let records = crate::aggregate::aggregate(&entries, &facts);
        assert!(records[0].in_use);
        assert_eq!(records[0].pid, 0);
        assert_eq!(records[0].process_name, UNKNOWN_PROCESS);
    }
}
