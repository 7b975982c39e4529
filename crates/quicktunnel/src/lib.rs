pub mod bootstrap;
pub mod cmd;
pub mod config;
pub mod fetch;
pub mod install;
pub mod launch;
pub mod poll;
pub mod report;

pub use bootstrap::bootstrap;
pub use config::{BootstrapArgs, Config};
