//! Windows port scanning implementation using netstat

use crate::model::RawListener;
use crate::platform::parse::parse_netstat;
use crate::scanner::ScanError;
use crate::utils::run_tool;

pub fn list_listeners() -> Result<Vec<RawListener>, ScanError> {
    let stdout = run_tool("netstat", &["-ano"])?;
    Ok(parse_netstat(&stdout))
}

/// Get process name from PID using Windows API
pub fn process_name(pid: u32) -> Option<String> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::ProcessStatus::K32GetModuleBaseNameW;
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
    };

    unsafe {
        let handle =
            OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_VM_READ, false, pid).ok()?;

        let mut name = [0u16; 260];
        let len = K32GetModuleBaseNameW(handle, None, &mut name);
        let _ = CloseHandle(handle);

        if len == 0 {
            return None;
        }
        let full = String::from_utf16_lossy(&name[..len as usize]);
        // Match the Task Manager style name without the extension
        Some(full.strip_suffix(".exe").unwrap_or(&full).to_string())
    }
}
