//! macOS port scanning implementation using lsof

use crate::model::RawListener;
use crate::platform::parse::parse_lsof;
use crate::scanner::ScanError;
use crate::utils::{hidden_command, run_tool};

pub fn list_listeners() -> Result<Vec<RawListener>, ScanError> {
    let stdout = run_tool("lsof", &["-nP", "-iTCP", "-sTCP:LISTEN", "-FpcnP"])?;
    Ok(parse_lsof(&stdout))
}

pub fn process_name(pid: u32) -> Option<String> {
    let output = hidden_command("ps")
        .args(["-p", &pid.to_string(), "-o", "comm="])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let comm = String::from_utf8_lossy(&output.stdout);
    // comm= prints the full executable path on macOS
    let name = comm.trim().rsplit('/').next()?.to_string();
    if name.is_empty() { None } else { Some(name) }
}
