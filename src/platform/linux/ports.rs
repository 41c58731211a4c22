//! Linux port scanning implementation using ss

use procfs::process::Process;

use crate::model::RawListener;
use crate::platform::parse::parse_ss;
use crate::scanner::ScanError;
use crate::utils::run_tool;

pub fn list_listeners() -> Result<Vec<RawListener>, ScanError> {
    // -H: no header, -l: listening only, -n: numeric, -t/-u: tcp+udp, -p: owner
    let stdout = run_tool("ss", &["-H", "-l", "-n", "-t", "-u", "-p"])?;
    Ok(parse_ss(&stdout))
}

/// Short command name from /proc/<pid>/stat.
pub fn process_name(pid: u32) -> Option<String> {
    let pid = i32::try_from(pid).ok()?;
    let stat = Process::new(pid).and_then(|p| p.stat()).ok()?;
    Some(stat.comm)
}
