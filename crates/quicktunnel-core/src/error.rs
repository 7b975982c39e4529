//! Error types for the tunnel bootstrapper.

use thiserror::Error;

/// Result type alias using the bootstrapper `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions that abort the bootstrap.
///
/// Non-fatal conditions (a failed self-update, a failed log read during
/// polling, a leftover archive) are logged where they happen and never
/// surface as an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// Required input missing or invalid
    #[error("{0}")]
    Config(String),

    /// Fetch failed, or the fetched artifact is missing/empty
    #[error("Download failed: {0}")]
    Download(String),

    /// Moving, extracting or marking the artifact executable failed
    #[error("Install failed: {0}")]
    Install(String),

    /// Spawning the tunnel process failed
    #[error("Failed to launch tunnel: {0}")]
    Launch(String),

    /// No hostname appeared in the log before the attempt ceiling.
    ///
    /// `tail` holds at most the last 20 log lines seen at timeout.
    #[error("Failed to get tunnel URL after {waited_secs} seconds. Please check the logs.")]
    TunnelTimeout {
        waited_secs: u64,
        tail: Vec<String>,
    },

    /// Writing the output record failed
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn install(msg: impl Into<String>) -> Self {
        Self::Install(msg.into())
    }

    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }
}
