use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Why a command did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum CmdFailure {
    #[error("failed to execute: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Execute a command to completion with logging and an upper time bound.
/// Logs the full command line at debug level and a human-friendly
/// description at info level. The child is killed if the bound elapses.
pub async fn run_cmd(
    description: &str,
    program: &Path,
    args: &[&str],
    limit: Duration,
) -> Result<(), CmdFailure> {
    let cmd_line = format!("{} {}", program.display(), args.join(" "));
    tracing::info!("{description}");
    tracing::debug!("exec: {cmd_line}");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(limit, cmd.output()).await {
        Ok(result) => result.map_err(CmdFailure::Spawn)?,
        Err(_) => return Err(CmdFailure::TimedOut(limit)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!("command failed: {cmd_line}\nstderr: {stderr}");
        return Err(CmdFailure::Exit {
            status: output.status,
            stderr,
        });
    }
    Ok(())
}
