//! End-to-end bootstrap against a stand-in `cloudflared` shell script.
#![cfg(unix)]
#![allow(clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use quicktunnel::bootstrap;
use quicktunnel::config::Config;
use quicktunnel::fetch::Fetch;
use quicktunnel::launch::UnixDetach;
use quicktunnel::poll::PollSchedule;
use quicktunnel_core::platform::DEFAULT_CLOUDFLARED_VERSION;
use quicktunnel_core::{Error, PlatformTarget, Result};

/// Serves a shell script in place of the real release asset.
struct ScriptFetcher {
    scratch: PathBuf,
    script: String,
    calls: AtomicUsize,
}

impl ScriptFetcher {
    fn new(scratch: &Path, script: String) -> Self {
        Self {
            scratch: scratch.to_path_buf(),
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Fetch for ScriptFetcher {
    async fn fetch(&self, _url: &str) -> Result<PathBuf> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let path = self.scratch.join(format!("asset-{n}"));
        fs::write(&path, &self.script).expect("write script");
        Ok(path)
    }
}

/// A fake cloudflared that refuses to update and logs JSON lines.
fn tunnel_script(lines: &[&str]) -> String {
    let mut script = String::from(
        "#!/bin/sh\n\
         if [ \"$1\" = update ]; then echo 'update not supported' >&2; exit 1; fi\n",
    );
    for line in lines {
        script.push_str(&format!("echo '{line}'\n"));
    }
    script
}

fn quick_tunnel_script(label: &str) -> String {
    tunnel_script(&[
        r#"{"level":"info","message":"Requesting new quick Tunnel on trycloudflare.com..."}"#,
        &format!(
            r#"{{"level":"info","message":"Your quick Tunnel has been created! Visit it at: https://{label}.trycloudflare.com"}}"#
        ),
    ])
}

fn config(work: &Path, output: &Path, max_attempts: u32) -> Config {
    Config {
        protocol: "http".into(),
        port: 8080,
        cloudflared_version: DEFAULT_CLOUDFLARED_VERSION.into(),
        working_dir: work.to_path_buf(),
        output_file: Some(output.to_path_buf()),
        poll: PollSchedule {
            interval: Duration::from_millis(50),
            max_attempts,
        },
    }
}

fn linux() -> PlatformTarget {
    PlatformTarget::resolve("linux", "x86_64", DEFAULT_CLOUDFLARED_VERSION)
}

#[tokio::test]
async fn publishes_hostname_from_tunnel_log() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let work = tempfile::tempdir().expect("tempdir");
    let output = work.path().join("github_output");

    let fetcher = ScriptFetcher::new(scratch.path(), quick_tunnel_script("brave-otter-12"));
    let hostname = bootstrap(&config(work.path(), &output, 40), &linux(), &fetcher, &UnixDetach)
        .await
        .expect("bootstrap");

    assert_eq!(hostname, "brave-otter-12.trycloudflare.com");
    assert_eq!(
        fs::read_to_string(&output).expect("output"),
        "server=brave-otter-12.trycloudflare.com\n"
    );
    assert!(work.path().join("cloudflared").is_file());
    assert!(work.path().join("cf.log").is_file());
}

#[tokio::test]
async fn second_run_in_same_directory_overwrites_previous_state() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let work = tempfile::tempdir().expect("tempdir");
    let output = work.path().join("github_output");
    let cfg = config(work.path(), &output, 40);

    let first = ScriptFetcher::new(scratch.path(), quick_tunnel_script("first-run"));
    bootstrap(&cfg, &linux(), &first, &UnixDetach)
        .await
        .expect("first run");

    let second_scratch = tempfile::tempdir().expect("tempdir");
    let second = ScriptFetcher::new(second_scratch.path(), quick_tunnel_script("second-run"));
    let hostname = bootstrap(&cfg, &linux(), &second, &UnixDetach)
        .await
        .expect("second run");

    assert_eq!(hostname, "second-run.trycloudflare.com");
    let log = fs::read_to_string(work.path().join("cf.log")).expect("log");
    assert!(!log.contains("first-run"), "log was not replaced: {log}");
    let recorded = fs::read_to_string(&output).expect("output");
    assert_eq!(
        recorded.lines().last(),
        Some("server=second-run.trycloudflare.com")
    );
}

#[tokio::test]
async fn silent_tunnel_times_out_with_log_tail() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let work = tempfile::tempdir().expect("tempdir");
    let output = work.path().join("github_output");

    let lines: Vec<String> = (1..=25).map(|i| format!("INF still starting {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let fetcher = ScriptFetcher::new(scratch.path(), tunnel_script(&refs));

    let err = bootstrap(&config(work.path(), &output, 4), &linux(), &fetcher, &UnixDetach)
        .await
        .expect_err("no hostname");

    match err {
        Error::TunnelTimeout { tail, .. } => {
            assert_eq!(tail.len(), 20);
            assert_eq!(tail.first().map(String::as_str), Some("INF still starting 6"));
            assert_eq!(tail.last().map(String::as_str), Some("INF still starting 25"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists(), "no output on failure");
}

#[tokio::test]
async fn empty_asset_aborts_before_launch() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let work = tempfile::tempdir().expect("tempdir");
    let output = work.path().join("github_output");

    let fetcher = ScriptFetcher::new(scratch.path(), String::new());
    let err = bootstrap(&config(work.path(), &output, 2), &linux(), &fetcher, &UnixDetach)
        .await
        .expect_err("empty asset");

    assert!(matches!(err, Error::Download(_)), "{err}");
    assert!(!work.path().join("cf.log").exists(), "nothing launched");
}
