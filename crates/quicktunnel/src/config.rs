use std::path::{Path, PathBuf};

use clap::Args;
use quicktunnel_core::platform::DEFAULT_CLOUDFLARED_VERSION;
use quicktunnel_core::{Error, Result};

use crate::poll::PollSchedule;

/// Protocol used when the input is absent or blank.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Name of the log file cloudflared writes into the working directory.
pub const LOG_FILE_NAME: &str = "cf.log";

/// Raw inputs. GitHub Actions exposes action inputs as `INPUT_<NAME>`.
#[derive(Debug, Args)]
pub struct BootstrapArgs {
    /// Local port to expose through the tunnel
    #[arg(long, env = "INPUT_PORT")]
    pub port: Option<String>,

    /// Protocol of the local service (tcp, http, https, ...)
    #[arg(long, env = "INPUT_PROTOCOL")]
    pub protocol: Option<String>,

    /// cloudflared release to download, or `latest`
    #[arg(long, env = "INPUT_CLOUDFLARED_VERSION", default_value = DEFAULT_CLOUDFLARED_VERSION)]
    pub cloudflared_version: String,

    /// Directory holding the binary and its log.
    /// Defaults to the directory of this executable.
    #[arg(long, env = "QUICKTUNNEL_WORKING_DIR")]
    pub working_dir: Option<PathBuf>,

    /// File receiving `key=value` output records (stdout when unset)
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

/// Validated bootstrap configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub protocol: String,
    pub port: u16,
    pub cloudflared_version: String,
    pub working_dir: PathBuf,
    pub output_file: Option<PathBuf>,
    pub poll: PollSchedule,
}

impl Config {
    /// Resolve raw inputs. Fails before anything is downloaded.
    pub fn from_args(args: BootstrapArgs) -> Result<Self> {
        let protocol = resolve_protocol(args.protocol.as_deref());
        tracing::info!("protocol: {protocol}");

        let port = args.port.as_deref().map(str::trim).unwrap_or_default();
        tracing::info!("port: {port}");
        let port = parse_port(port)?;

        let working_dir = match args.working_dir {
            Some(dir) => dir,
            None => exe_dir()?,
        };

        let output_file = args
            .output_file
            .filter(|p| !p.as_os_str().is_empty());

        Ok(Self {
            protocol,
            port,
            cloudflared_version: args.cloudflared_version,
            working_dir,
            output_file,
            poll: PollSchedule::default(),
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.working_dir.join(LOG_FILE_NAME)
    }

    /// Local service URL handed to `cloudflared tunnel --url`.
    pub fn service_url(&self) -> String {
        format!("{}://localhost:{}", self.protocol, self.port)
    }
}

fn resolve_protocol(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => DEFAULT_PROTOCOL.to_string(),
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    if raw.is_empty() {
        return Err(Error::config("No port !"));
    }
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::config(format!(
            "invalid port {raw:?}: expected a number between 1 and 65535"
        ))),
    }
}

fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| Error::config(format!("cannot locate own executable: {e}")))?;
    Ok(exe
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf))
}
