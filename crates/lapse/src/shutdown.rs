//! Ctrl-C handling.
//!
//! The first interrupt requests a graceful shutdown through the returned
//! token; a second interrupt exits the process immediately.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit code used when a second interrupt forces the process down.
const FORCED_EXIT_CODE: i32 = 130;

/// Install the interrupt handler and return the shutdown token.
pub fn install() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Interrupt received, shutting down");
        eprintln!("Shutting down gracefully, press Ctrl-C again to exit immediately");
        trigger.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Exiting");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    token
}
