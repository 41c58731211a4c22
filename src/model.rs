use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

/// A port the user wants to watch, either from the built-in catalog or added
/// at runtime.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PortEntry {
    pub port: u16,
    pub label: String,
    pub is_custom: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("tcp") || raw.eq_ignore_ascii_case("tcp6") {
            Some(Transport::Tcp)
        } else if raw.eq_ignore_ascii_case("udp") || raw.eq_ignore_ascii_case("udp6") {
            Some(Transport::Udp)
        } else {
            None
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("TCP"),
            Transport::Udp => f.write_str("UDP"),
        }
    }
}

/// One listening socket as reported by the OS table, before name lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawListener {
    pub transport: Transport,
    pub port: u16,
    pub pid: u32,
    /// Name reported inline by the tool (lsof, ss), if any.
    pub command: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveSocketFact {
    pub port: u16,
    pub transport: Transport,
    pub pid: u32,
    pub process_name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PortViewRecord {
    pub port: u16,
    pub label: String,
    pub is_custom: bool,
    pub in_use: bool,
    /// 0 when nothing listens on the port.
    pub pid: u32,
    /// Empty when nothing listens on the port.
    pub process_name: String,
    pub protocol: Option<Transport>,
}

/// One complete scan + aggregate result. Never mutated after publication.
#[derive(Clone, Debug)]
pub struct PortSnapshot {
    pub generation: u64,
    pub records: Vec<PortViewRecord>,
    pub taken_at: Instant,
}

impl PortSnapshot {
    pub fn empty() -> Self {
        Self {
            generation: 0,
            records: Vec::new(),
            taken_at: Instant::now(),
        }
    }

    pub fn in_use(&self) -> impl Iterator<Item = &PortViewRecord> {
        self.records.iter().filter(|r| r.in_use)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshStatus {
    /// A new scan was queued.
    Started,
    /// A scan was already in flight; its result supersedes this request.
    Coalesced,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KillOutcome {
    Success,
    NotFound,
    PermissionDenied,
    Unsupported,
    Failed(i32),
}

impl KillOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, KillOutcome::Success)
    }
}

impl fmt::Display for KillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillOutcome::Success => f.write_str("terminated"),
            KillOutcome::NotFound => f.write_str("process not found"),
            KillOutcome::PermissionDenied => f.write_str("permission denied"),
            KillOutcome::Unsupported => f.write_str("not supported on this platform"),
            KillOutcome::Failed(code) => write!(f, "failed with code {}", code),
        }
    }
}

#[derive(Clone, Debug)]
pub struct KillReport {
    pub pid: u32,
    pub outcome: KillOutcome,
}

#[derive(Clone, Debug)]
pub enum CoreEvent {
    SnapshotUpdated(Arc<PortSnapshot>),
    KillFinished(KillReport),
}

#[derive(Clone, Debug)]
pub enum WorkerCommand {
    Kill { pid: u32 },
}
