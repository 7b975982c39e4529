//! The end-to-end bootstrap: install, launch, poll, report.

use quicktunnel_core::{PlatformTarget, Result};

use crate::config::Config;
use crate::fetch::Fetch;
use crate::install::install;
use crate::launch::{Detach, launch};
use crate::poll::{LogFile, PollOutcome, poll_for_hostname};
use crate::report::{OutputChannel, report_found, timeout_failure};

/// Run every stage in order and return the published hostname.
///
/// The tunnel process is left running whatever the outcome.
pub async fn bootstrap<F: Fetch, D: Detach>(
    config: &Config,
    target: &PlatformTarget,
    fetcher: &F,
    detach: &D,
) -> Result<String> {
    let artifact = install(target, fetcher, &config.working_dir).await?;

    let log = LogFile::new(config.log_path());
    launch(detach, &artifact.path, &config.service_url(), log.path()).await?;

    match poll_for_hostname(&log, &config.poll).await {
        PollOutcome::Found { hostname, .. } => {
            report_found(&OutputChannel::new(config.output_file.clone()), &hostname)?;
            Ok(hostname)
        }
        PollOutcome::TimedOut => Err(timeout_failure(&log, &config.poll)),
    }
}
