//! Hostname extraction from cloudflared log output.
//!
//! cloudflared writes either plain text or JSON lines depending on version and
//! flags. Each line goes through an ordered chain of matchers; the first
//! line that yields a hostname wins and the rest of the content is ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

#[allow(clippy::expect_used)] // literal pattern
static TUNNEL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://([A-Za-z0-9.-]+\.trycloudflare\.com)").expect("valid tunnel URL regex")
});

/// The only field of a JSON log record we care about.
#[derive(Debug, Deserialize)]
struct LogRecord {
    message: String,
}

/// Match the hostname pattern anywhere in `text`.
fn match_hostname(text: &str) -> Option<&str> {
    TUNNEL_URL
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Structured fallback: parse the line as one JSON record and match its
/// `message` field. Any parse failure means "no match".
fn match_structured(line: &str) -> Option<String> {
    let record: LogRecord = serde_json::from_str(line).ok()?;
    match_hostname(&record.message).map(String::from)
}

/// Extract the hostname from a single log line.
pub fn match_line(line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }
    match_hostname(line).map(String::from).or_else(|| {
        match_structured(line)
            .inspect(|hostname| tracing::debug!(%hostname, "matched via JSON message field"))
    })
}

/// Extract the first tunnel hostname from the full log content.
pub fn extract_hostname(content: &str) -> Option<String> {
    content.lines().find_map(match_line)
}

/// The last `n` lines of `content`, ignoring surrounding whitespace.
pub fn tail_lines(content: &str, n: usize) -> Vec<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}
