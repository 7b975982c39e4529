//! `quicktunnel` Core Library
//!
//! Shared functionality for the tunnel bootstrapper:
//! - Platform resolution for the cloudflared release artifacts
//! - Hostname extraction from cloudflared log output
//! - Common error types
//! - Tracing initialization

pub mod error;
pub mod platform;
pub mod scan;
pub mod tracing_init;

pub use error::{Error, Result};
pub use platform::{Arch, ArchiveKind, Os, PlatformTarget};
pub use scan::{extract_hostname, tail_lines};
