use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use quicktunnel::fetch::HttpFetcher;
use quicktunnel::launch::host_detach;
use quicktunnel::report::signal_failure;
use quicktunnel::{BootstrapArgs, Config};
use quicktunnel_core::PlatformTarget;
use quicktunnel_core::tracing_init::{DEFAULT_LOG_FILTER, init_tracing};

/// Expose a local port through a cloudflared quick tunnel and publish the
/// public hostname as the `server` output.
#[derive(Debug, Parser)]
#[command(name = "quicktunnel", version, about)]
struct Cli {
    #[command(flatten)]
    args: BootstrapArgs,

    /// Emit structured JSON log lines
    #[arg(long, env = "QUICKTUNNEL_LOG_JSON")]
    log_json: bool,
}

async fn run(args: BootstrapArgs) -> anyhow::Result<()> {
    let config = Config::from_args(args)?;
    let target = PlatformTarget::host(&config.cloudflared_version);
    let fetcher = HttpFetcher::new()?;

    quicktunnel::bootstrap(&config, &target, &fetcher, &host_detach())
        .await
        .context("tunnel bootstrap failed")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(DEFAULT_LOG_FILTER, cli.log_json);

    match run(cli.args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The root cause is what the CI user needs to see.
            signal_failure(&e.root_cause().to_string());
            tracing::debug!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
