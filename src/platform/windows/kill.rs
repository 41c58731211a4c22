//! Windows process termination: taskkill for the tree, TerminateProcess for one

use windows::Win32::Foundation::{
    CloseHandle, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, ERROR_NOT_FOUND,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE, TerminateProcess,
};
use windows::core::HRESULT;

use crate::model::KillOutcome;
use crate::utils::hidden_command;

// taskkill exit status when the PID does not exist
const TASKKILL_NOT_FOUND: i32 = 128;

pub fn terminate_tree(pid: u32) -> KillOutcome {
    if pid == 0 {
        return KillOutcome::NotFound;
    }
    let output = match hidden_command("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output()
    {
        Ok(o) => o,
        Err(err) => {
            log::debug!("taskkill unavailable: {}", err);
            return KillOutcome::Unsupported;
        }
    };

    if output.status.success() {
        return KillOutcome::Success;
    }
    match output.status.code() {
        Some(TASKKILL_NOT_FOUND) => KillOutcome::NotFound,
        Some(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Access is denied") {
                KillOutcome::PermissionDenied
            } else {
                KillOutcome::Failed(code)
            }
        }
        None => KillOutcome::Failed(-1),
    }
}

pub fn terminate_single(pid: u32) -> KillOutcome {
    if pid == 0 {
        return KillOutcome::NotFound;
    }
    unsafe {
        let handle =
            match OpenProcess(PROCESS_TERMINATE | PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
                Ok(h) => h,
                Err(e) => return classify(&e),
            };

        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);
        match result {
            Ok(()) => KillOutcome::Success,
            Err(e) => classify(&e),
        }
    }
}

fn classify(err: &windows::core::Error) -> KillOutcome {
    let code = err.code();
    if code == HRESULT::from_win32(ERROR_ACCESS_DENIED.0) {
        KillOutcome::PermissionDenied
    } else if code == HRESULT::from_win32(ERROR_INVALID_PARAMETER.0)
        || code == HRESULT::from_win32(ERROR_NOT_FOUND.0)
    {
        KillOutcome::NotFound
    } else {
        log::error!("Windows process API failed: {:?}", err);
        KillOutcome::Failed(code.0)
    }
}
