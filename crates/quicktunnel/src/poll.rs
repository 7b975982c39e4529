//! Bounded polling of the cloudflared log for the public hostname.
//!
//! Every attempt sleeps a fixed interval, re-reads the whole log, and scans
//! it line by line. The loop ends on the first hostname or after the attempt
//! ceiling; a failed read only costs that one attempt.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quicktunnel_core::extract_hostname;

/// Fixed interval and attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

impl PollSchedule {
    /// Longest time the poller waits before giving up.
    pub fn total_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Something the poller can re-read in full.
pub trait LogSource {
    fn read_log(&self) -> io::Result<String>;
}

/// The log file cloudflared writes to.
#[derive(Debug, Clone)]
pub struct LogFile(PathBuf);

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl LogSource for LogFile {
    /// Invalid UTF-8 is replaced, never an error. Only I/O failures are.
    fn read_log(&self) -> io::Result<String> {
        let bytes = std::fs::read(&self.0)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Terminal poller states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Found { hostname: String, attempt: u32 },
    TimedOut,
}

/// Poll `source` until a tunnel hostname shows up or the schedule runs out.
pub async fn poll_for_hostname<S: LogSource + ?Sized>(
    source: &S,
    schedule: &PollSchedule,
) -> PollOutcome {
    for attempt in 1..=schedule.max_attempts {
        tokio::time::sleep(schedule.interval).await;

        let content = match source.read_log() {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(attempt, "log not created yet");
                continue;
            }
            Err(e) => {
                tracing::info!(attempt, "Error reading log: {e}");
                continue;
            }
        };

        if let Some(hostname) = extract_hostname(&content) {
            tracing::info!("server: {hostname}");
            return PollOutcome::Found { hostname, attempt };
        }
        tracing::debug!(attempt, "no tunnel URL yet");
    }
    PollOutcome::TimedOut
}
