use std::sync::Arc;

use crate::model::KillOutcome;

/// OS capability: terminate a process, with or without its descendants.
pub trait ProcessControl: Send + Sync {
    fn terminate_tree(&self, pid: u32) -> KillOutcome;
    fn terminate_single(&self, pid: u32) -> KillOutcome;
}

/// Kills a process tree first and falls back to the single process.
#[derive(Clone)]
pub struct ProcessTerminator {
    control: Arc<dyn ProcessControl>,
}

impl ProcessTerminator {
    pub fn new(control: Arc<dyn ProcessControl>) -> Self {
        Self { control }
    }

    pub fn terminate(&self, pid: u32) -> KillOutcome {
        if pid == 0 {
            log::warn!("Refusing to terminate PID 0");
            return KillOutcome::NotFound;
        }

        let tree = self.control.terminate_tree(pid);
        if tree.is_success() {
            log::info!("Terminated process tree rooted at PID {}", pid);
            return tree;
        }

        log::debug!(
            "Tree kill of PID {} did not succeed ({}), retrying single process",
            pid,
            tree
        );
        let single = self.control.terminate_single(pid);
        if single.is_success() {
            log::info!("Terminated PID {}", pid);
        } else {
            log::warn!("Failed to terminate PID {}: {}", pid, single);
        }
        single
    }

    pub fn kill(&self, pid: u32) -> bool {
        self.terminate(pid).is_success()
    }
}
