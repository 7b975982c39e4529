//! Artifact download.
//!
//! The installer only depends on the [`Fetch`] trait: give it a URL, get
//! back the path of a local file holding the body.

use std::future::Future;
use std::path::PathBuf;

use quicktunnel_core::{Error, Result};
use tokio::io::AsyncWriteExt;

/// URL → local file path.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Downloads over HTTPS into a scratch directory.
#[derive(Debug)]
pub struct HttpFetcher {
    http: reqwest::Client,
    scratch_dir: PathBuf,
}

impl HttpFetcher {
    /// Create a fetcher writing into `RUNNER_TEMP`, or the system temp dir
    /// outside GitHub Actions.
    pub fn new() -> Result<Self> {
        let scratch_dir = std::env::var_os("RUNNER_TEMP")
            .filter(|v| !v.is_empty())
            .map_or_else(std::env::temp_dir, PathBuf::from);
        Self::with_scratch_dir(scratch_dir)
    }

    pub fn with_scratch_dir(scratch_dir: PathBuf) -> Result<Self> {
        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("quicktunnel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::download(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, scratch_dir })
    }

    async fn download_to(&self, url: &str, dest: &std::path::Path) -> Result<()> {
        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::download(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::download(format!(
                "unexpected HTTP status {status} for {url}"
            )));
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| Error::download(format!("cannot create scratch dir: {e}")))?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::download(format!("cannot create {}: {e}", dest.display())))?;

        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| Error::download(format!("reading body of {url} failed: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::download(format!("writing {} failed: {e}", dest.display())))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::download(format!("writing {} failed: {e}", dest.display())))?;
        Ok(())
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let dest = self.scratch_dir.join(uuid::Uuid::new_v4().to_string());
        if let Err(e) = self.download_to(url, &dest).await {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e);
        }
        Ok(dest)
    }
}
