//! CLI command handlers.

pub mod demo;
pub mod soak;

use tokio_util::sync::CancellationToken;

use crate::config::LapseConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration.
    pub config: LapseConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Cancelled on Ctrl-C.
    pub shutdown: CancellationToken,
}
