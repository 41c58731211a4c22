//! Linux process termination using SIGKILL, walking children through procfs

use std::collections::HashMap;

use anyhow::Result;
use procfs::process::all_processes;

use crate::model::KillOutcome;
use crate::platform::unix;

pub fn terminate_tree(pid: u32) -> KillOutcome {
    let descendants = match descendants_of(pid) {
        Ok(list) => list,
        Err(err) => {
            log::debug!("Cannot walk process tree of {}: {}", pid, err);
            return KillOutcome::Unsupported;
        }
    };
    unix::kill_tree(pid, &descendants)
}

pub fn terminate_single(pid: u32) -> KillOutcome {
    unix::sigkill(pid)
}

/// Breadth-first list of every process below `root`.
fn descendants_of(root: u32) -> Result<Vec<u32>> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for process in all_processes()?.flatten() {
        let Ok(stat) = process.stat() else {
            continue;
        };
        let (Ok(pid), Ok(ppid)) = (u32::try_from(stat.pid), u32::try_from(stat.ppid)) else {
            continue;
        };
        children.entry(ppid).or_default().push(pid);
    }

    let mut ordered = Vec::new();
    let mut cursor = 0;
    let mut frontier = vec![root];
    while let Some(parent) = frontier.get(cursor).copied() {
        cursor += 1;
        if let Some(kids) = children.get(&parent) {
            for &kid in kids {
                if kid != root && !ordered.contains(&kid) {
                    ordered.push(kid);
                    frontier.push(kid);
                }
            }
        }
    }
    Ok(ordered)
}
