//! Artifact installation: download, validate, and place cloudflared in the
//! working directory.

use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use quicktunnel_core::{ArchiveKind, Error, PlatformTarget, Result};
use tar::Archive;
use tokio::fs;

use crate::fetch::Fetch;

/// A binary ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub path: PathBuf,
    pub executable: bool,
}

/// Download the artifact for `target` and leave the binary at its fixed
/// path inside `working_dir`, replacing any previous install.
pub async fn install<F: Fetch>(
    target: &PlatformTarget,
    fetcher: &F,
    working_dir: &Path,
) -> Result<InstalledArtifact> {
    tracing::info!("Downloading: {}", target.download_url);
    let fetched = fetcher.fetch(&target.download_url).await?;
    tracing::info!("Downloaded file: {}", fetched.display());

    validate_artifact(&fetched).await?;

    fs::create_dir_all(working_dir).await.map_err(|e| {
        Error::install(format!("cannot create {}: {e}", working_dir.display()))
    })?;
    let binary = working_dir.join(target.binary_name());

    match target.archive_kind {
        ArchiveKind::TarGzip => {
            let archive_name = target.archive_name().unwrap_or("cloudflared.tgz");
            let archive = working_dir.join(archive_name);
            move_file(&fetched, &archive).await?;
            extract_tar_gz(archive.clone(), working_dir.to_path_buf()).await?;
            discard_archive(&archive).await;
            if !fs::metadata(&binary).await.is_ok_and(|m| m.is_file()) {
                return Err(Error::install(format!(
                    "{} not found in {archive_name}",
                    target.binary_name()
                )));
            }
        }
        ArchiveKind::None => move_file(&fetched, &binary).await?,
    }

    if target.needs_exec_bit() {
        make_executable(&binary).await?;
    }

    Ok(InstalledArtifact {
        path: binary,
        executable: target.needs_exec_bit(),
    })
}

/// Reject a fetched file that is missing, not a regular file, or empty.
async fn validate_artifact(path: &Path) -> Result<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(Error::download("empty or missing artifact")),
        Err(e) => Err(Error::download(format!("empty or missing artifact: {e}"))),
    }
}

/// Move `src` to `dst`, replacing `dst`. Falls back to copy + delete when a
/// rename is not possible (e.g. across filesystems).
async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    // Unlink first so a still-running old binary is not written through.
    if fs::try_exists(dst).await.unwrap_or(false) {
        fs::remove_file(dst)
            .await
            .map_err(|e| Error::install(format!("cannot replace {}: {e}", dst.display())))?;
    }
    fs::copy(src, dst).await.map_err(|e| {
        Error::install(format!(
            "cannot move {} to {}: {e}",
            src.display(),
            dst.display()
        ))
    })?;
    if let Err(e) = fs::remove_file(src).await {
        tracing::debug!("could not remove {}: {e}", src.display());
    }
    Ok(())
}

/// Unpack on the blocking pool; `tar` only reads synchronously.
async fn extract_tar_gz(archive: PathBuf, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive)
            .map_err(|e| Error::install(format!("cannot open {}: {e}", archive.display())))?;
        Archive::new(GzDecoder::new(file))
            .unpack(&dest)
            .map_err(|e| Error::install(format!("cannot extract {}: {e}", archive.display())))
    })
    .await
    .map_err(|e| Error::install(format!("extraction task failed: {e}")))?
}

/// The archive is scratch once unpacked. Failing to delete it is logged only.
async fn discard_archive(archive: &Path) {
    if let Err(e) = fs::remove_file(archive).await {
        tracing::warn!("Could not remove tar file: {e}");
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let chmod_failed = |e: std::io::Error| {
        Error::install(format!("chmod +x {} failed: {e}", path.display()))
    };
    let mut perms = fs::metadata(path).await.map_err(chmod_failed)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).await.map_err(chmod_failed)
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
