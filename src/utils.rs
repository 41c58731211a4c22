use std::process::Command;

use crate::scanner::ScanError;

/// Build a `Command` that does not flash a console window on Windows.
#[cfg(target_os = "windows")]
pub fn hidden_command(program: &str) -> Command {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let mut cmd = Command::new(program);
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

#[cfg(not(target_os = "windows"))]
pub fn hidden_command(program: &str) -> Command {
    Command::new(program)
}

/// Run a socket tool and return its stdout.
pub fn run_tool(tool: &'static str, args: &[&str]) -> Result<String, ScanError> {
    let output = hidden_command(tool)
        .args(args)
        .output()
        .map_err(|source| ScanError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(ScanError::CommandFailed {
            tool,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_a_spawn_error() {
        let err = run_tool("definitely-not-a-real-tool-4f1c", &[]).unwrap_err();
        assert!(matches!(err, ScanError::Spawn { .. }));
    }
}
