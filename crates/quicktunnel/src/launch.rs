//! Starting cloudflared as a detached background process.

use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use quicktunnel_core::{Error, Result};
use tokio::process::Command;

use crate::cmd::run_cmd;

/// Upper bound for `cloudflared update`.
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Spawn-and-forget with combined output redirected to a log file.
///
/// Implementations return once the process is started. The handle is dropped
/// without killing the child (tokio reaps it in the background); the log file
/// is the only channel to the process afterwards. Must be called from within
/// a tokio runtime.
pub trait Detach {
    fn spawn_detached(&self, program: &Path, args: &[String], log: &Path) -> Result<()>;
}

/// Open `log` fresh and return it as stdout + stderr for a child.
fn log_stdio(log: &Path) -> Result<(Stdio, Stdio)> {
    let out = File::create(log)
        .map_err(|e| Error::launch(format!("cannot create {}: {e}", log.display())))?;
    let err = out
        .try_clone()
        .map_err(|e| Error::launch(format!("cannot share {}: {e}", log.display())))?;
    Ok((Stdio::from(out), Stdio::from(err)))
}

/// Unix: the child gets its own process group so it is not torn down with
/// ours.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixDetach;

#[cfg(unix)]
impl Detach for UnixDetach {
    fn spawn_detached(&self, program: &Path, args: &[String], log: &Path) -> Result<()> {
        let (stdout, stderr) = log_stdio(log)?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0)
            .spawn()
            .map_err(|e| Error::launch(format!("{}: {e}", program.display())))?;
        tracing::debug!(pid = ?child.id(), "tunnel process started");
        Ok(())
    }
}

/// Windows: a new windowless process in its own process group.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDetach;

#[cfg(windows)]
impl Detach for WindowsDetach {
    fn spawn_detached(&self, program: &Path, args: &[String], log: &Path) -> Result<()> {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;

        let (stdout, stderr) = log_stdio(log)?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW)
            .spawn()
            .map_err(|e| Error::launch(format!("{}: {e}", program.display())))?;
        tracing::debug!(pid = ?child.id(), "tunnel process started");
        Ok(())
    }
}

/// The detach implementation for the host.
#[cfg(unix)]
pub const fn host_detach() -> impl Detach {
    UnixDetach
}

/// The detach implementation for the host.
#[cfg(windows)]
pub const fn host_detach() -> impl Detach {
    WindowsDetach
}

/// Arguments for `cloudflared tunnel`, JSON log output.
pub fn tunnel_args(service_url: &str) -> Vec<String> {
    ["tunnel", "--url", service_url, "--output", "json"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Best-effort `cloudflared update`. Never fails; the installed version is
/// used when the update does not go through.
pub async fn self_update(binary: &Path, limit: Duration) {
    if let Err(e) = run_cmd("updating cloudflared", binary, &["update"], limit).await {
        tracing::warn!("Update failed or not needed: {e}");
    }
}

/// Update, then start the tunnel in the background with its output going to
/// `log`. Returns as soon as the process is spawned.
pub async fn launch<D: Detach>(
    detach: &D,
    binary: &Path,
    service_url: &str,
    log: &Path,
) -> Result<()> {
    self_update(binary, UPDATE_TIMEOUT).await;

    tracing::info!("starting tunnel to {service_url}");
    detach.spawn_detached(binary, &tunnel_args(service_url), log)
}
