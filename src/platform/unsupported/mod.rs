//! Fallback for hosts without a socket backend.

pub mod ports {
    use crate::model::RawListener;
    use crate::scanner::ScanError;

    pub fn list_listeners() -> Result<Vec<RawListener>, ScanError> {
        Err(ScanError::Unavailable(format!(
            "no socket backend for {}",
            std::env::consts::OS
        )))
    }

    pub fn process_name(_pid: u32) -> Option<String> {
        None
    }
}

pub mod kill {
    use crate::model::KillOutcome;

    pub fn terminate_tree(_pid: u32) -> KillOutcome {
        KillOutcome::Unsupported
    }

    #[cfg(unix)]
    pub fn terminate_single(pid: u32) -> KillOutcome {
        crate::platform::unix::sigkill(pid)
    }

    #[cfg(not(unix))]
    pub fn terminate_single(_pid: u32) -> KillOutcome {
        KillOutcome::Unsupported
    }
}
