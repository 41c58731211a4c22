//! macOS process termination using SIGKILL, walking children with pgrep

use crate::model::KillOutcome;
use crate::platform::unix;
use crate::utils::hidden_command;

pub fn terminate_tree(pid: u32) -> KillOutcome {
    let Some(descendants) = descendants_of(pid) else {
        return KillOutcome::Unsupported;
    };
    unix::kill_tree(pid, &descendants)
}

pub fn terminate_single(pid: u32) -> KillOutcome {
    unix::sigkill(pid)
}

/// `None` when pgrep cannot be run at all.
fn descendants_of(root: u32) -> Option<Vec<u32>> {
    let mut ordered = Vec::new();
    let mut frontier = vec![root];
    let mut cursor = 0;
    while let Some(parent) = frontier.get(cursor).copied() {
        cursor += 1;
        for kid in direct_children(parent)? {
            if kid != root && !ordered.contains(&kid) {
                ordered.push(kid);
                frontier.push(kid);
            }
        }
    }
    Some(ordered)
}

fn direct_children(parent: u32) -> Option<Vec<u32>> {
    let output = hidden_command("pgrep")
        .args(["-P", &parent.to_string()])
        .output()
        .map_err(|err| log::debug!("pgrep unavailable: {}", err))
        .ok()?;
    // pgrep exits 1 when nothing matched
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(
        stdout
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .collect(),
    )
}
