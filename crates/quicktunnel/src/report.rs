//! Surfacing the outcome to the CI platform.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use quicktunnel_core::{Error, Result, tail_lines};

use crate::poll::{LogSource, PollSchedule};

/// Output key holding the public hostname.
pub const SERVER_KEY: &str = "server";

/// Number of log lines surfaced when the tunnel never comes up.
pub const TAIL_LINES: usize = 20;

/// Where `key=value` output records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChannel {
    /// Append to a file, as with `$GITHUB_OUTPUT`.
    File(PathBuf),
    /// Print to standard output.
    Stdout,
}

impl OutputChannel {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        output_file.map_or(Self::Stdout, Self::File)
    }

    /// Record one `key=value` pair.
    #[allow(clippy::print_stdout)]
    pub fn set_output(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| Error::Output(format!("{}: {e}", path.display())))?;
                writeln!(file, "{key}={value}")
                    .map_err(|e| Error::Output(format!("{}: {e}", path.display())))
            }
            Self::Stdout => {
                println!("{key}={value}");
                Ok(())
            }
        }
    }
}

/// Publish the hostname as the `server` output.
pub fn report_found(channel: &OutputChannel, hostname: &str) -> Result<()> {
    channel.set_output(SERVER_KEY, hostname)
}

/// Read the log one last time and build the timeout failure.
///
/// A failed read only loses the diagnostic tail.
pub fn timeout_failure<S: LogSource + ?Sized>(source: &S, schedule: &PollSchedule) -> Error {
    let tail: Vec<String> = match source.read_log() {
        Ok(content) => tail_lines(&content, TAIL_LINES)
            .into_iter()
            .map(String::from)
            .collect(),
        Err(e) => {
            tracing::info!("Could not read log tail: {e}");
            Vec::new()
        }
    };
    if !tail.is_empty() {
        tracing::info!("Last log lines:\n{}", tail.join("\n"));
    }
    Error::TunnelTimeout {
        waited_secs: schedule.total_wait().as_secs(),
        tail,
    }
}

/// Escape a message for a GitHub Actions workflow command.
pub fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Mark the CI step failed with a human-readable message.
#[allow(clippy::print_stdout)]
pub fn signal_failure(message: &str) {
    tracing::error!("{message}");
    println!("::error::{}", escape_command_data(message));
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::io;

    use super::*;

    struct Fixed(io::Result<String>);

    impl LogSource for Fixed {
        fn read_log(&self) -> io::Result<String> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    #[test]
    fn output_is_appended_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("github_output");
        std::fs::write(&path, "previous=1\n").expect("seed");

        let channel = OutputChannel::new(Some(path.clone()));
        report_found(&channel, "happy-cat-42.trycloudflare.com").expect("report");

        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "previous=1\nserver=happy-cat-42.trycloudflare.com\n"
        );
    }

    #[test]
    fn output_file_is_created_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out");
        OutputChannel::File(path.clone())
            .set_output("server", "a.trycloudflare.com")
            .expect("write");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "server=a.trycloudflare.com\n"
        );
    }

    #[test]
    fn unwritable_output_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = OutputChannel::File(dir.path().join("missing").join("out"))
            .set_output("server", "x")
            .expect_err("no parent dir");
        assert!(matches!(err, Error::Output(_)));
    }

    #[test]
    fn no_output_file_means_stdout() {
        assert_eq!(OutputChannel::new(None), OutputChannel::Stdout);
    }

    #[test]
    fn timeout_tail_is_last_twenty_lines() {
        let log: String = (1..=25).map(|i| format!("line {i}\n")).collect();
        let err = timeout_failure(&Fixed(Ok(log)), &PollSchedule::default());
        match err {
            Error::TunnelTimeout { waited_secs, tail } => {
                assert_eq!(waited_secs, 60);
                assert_eq!(tail.len(), 20);
                assert_eq!(tail[0], "line 6");
                assert_eq!(tail[19], "line 25");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn timeout_tail_of_short_log_is_whole_log() {
        let err = timeout_failure(&Fixed(Ok("a\nb\n".into())), &PollSchedule::default());
        assert!(matches!(err, Error::TunnelTimeout { ref tail, .. } if tail == &["a", "b"]));
    }

    #[test]
    fn timeout_with_unreadable_log_still_fails() {
        let err = timeout_failure(
            &Fixed(Err(io::ErrorKind::NotFound.into())),
            &PollSchedule::default(),
        );
        assert!(matches!(err, Error::TunnelTimeout { ref tail, .. } if tail.is_empty()));
        assert_eq!(
            err.to_string(),
            "Failed to get tunnel URL after 60 seconds. Please check the logs."
        );
    }

    #[test]
    fn timeout_tail_survives_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cf.log");
        std::fs::write(&path, b"INF starting\nWRN bad \xfe byte\nERR gave up\n").expect("write");

        let err = timeout_failure(&crate::poll::LogFile::new(path), &PollSchedule::default());
        match err {
            Error::TunnelTimeout { tail, .. } => {
                assert_eq!(tail, ["INF starting", "WRN bad \u{fffd} byte", "ERR gave up"]);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn command_data_is_escaped() {
        assert_eq!(
            escape_command_data("50% done\r\nnext"),
            "50%25 done%0D%0Anext"
        );
    }
}
