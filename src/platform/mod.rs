//! Platform abstraction layer
//!
//! This module provides platform-specific implementations for:
//! - Listening socket enumeration
//! - Process name lookup
//! - Process (tree) termination

pub mod parse;

#[cfg(unix)]
mod unix;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub mod unsupported;

// Re-export the current platform's modules
#[cfg(target_os = "linux")]
pub use linux as current;

#[cfg(target_os = "macos")]
pub use macos as current;

#[cfg(target_os = "windows")]
pub use windows as current;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub use unsupported as current;

use crate::model::{KillOutcome, RawListener};
use crate::scanner::{ScanError, SocketTable};
use crate::terminator::ProcessControl;

/// Socket table backed by the host's network tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSockets;

impl SocketTable for SystemSockets {
    fn listening_sockets(&self) -> Result<Vec<RawListener>, ScanError> {
        current::ports::list_listeners()
    }

    fn process_name(&self, pid: u32) -> Option<String> {
        current::ports::process_name(pid)
    }
}

/// Process control backed by the host's signal / termination APIs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn terminate_tree(&self, pid: u32) -> KillOutcome {
        current::kill::terminate_tree(pid)
    }

    fn terminate_single(&self, pid: u32) -> KillOutcome {
        current::kill::terminate_single(pid)
    }
}
