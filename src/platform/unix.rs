//! Signal helpers shared by the Unix backends.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::model::KillOutcome;

/// `None` for pids that must never reach `kill(2)`: 0 and anything that
/// would turn negative (process-group addressing).
pub(crate) fn to_pid(raw: u32) -> Option<Pid> {
    match i32::try_from(raw) {
        Ok(p) if p > 0 => Some(Pid::from_raw(p)),
        _ => None,
    }
}

pub(crate) fn outcome_from_errno(err: Errno) -> KillOutcome {
    match err {
        Errno::ESRCH => KillOutcome::NotFound,
        Errno::EPERM => KillOutcome::PermissionDenied,
        other => KillOutcome::Failed(other as i32),
    }
}

pub(crate) fn is_alive(pid: Pid) -> Result<(), Errno> {
    kill(pid, None)
}

pub(crate) fn sigkill(raw: u32) -> KillOutcome {
    let Some(pid) = to_pid(raw) else {
        return KillOutcome::NotFound;
    };
    match kill(pid, Signal::SIGKILL) {
        Ok(()) => KillOutcome::Success,
        Err(err) => outcome_from_errno(err),
    }
}

/// Kill `descendants` (ordered parents before children) deepest first, then
/// the root. The outcome is the root's.
pub(crate) fn kill_tree(raw: u32, descendants: &[u32]) -> KillOutcome {
    let Some(pid) = to_pid(raw) else {
        return KillOutcome::NotFound;
    };
    if let Err(err) = is_alive(pid) {
        return outcome_from_errno(err);
    }

    for &child in descendants.iter().rev() {
        let outcome = sigkill(child);
        if !outcome.is_success() {
            log::debug!("Descendant {} of {}: {}", child, raw, outcome);
        }
    }

    sigkill(raw)
}
