//! Demo command - creates, updates and reads one session, then lets the
//! reaper run until interrupted.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::Style;
use lapse_session::{Payload, SessionStore};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::Context;

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Value stored under the `website` key
    #[arg(long, default_value = "longhoang.de")]
    pub website: String,
}

/// Demo result for JSON output.
#[derive(Debug, Serialize)]
struct DemoOutput {
    session_id: String,
    data: Payload,
    survived: bool,
    evicted_total: u64,
    remaining: usize,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    let store = SessionStore::new(ctx.config.session.store_config());
    let reaper = store.spawn_reaper();

    let session_id = store.create()?;
    info!(session_id = %session_id, "Created new session");

    let mut data = Payload::new();
    data.insert("website".to_string(), json!(args.website));
    store.update(&session_id, data)?;
    info!(website = %args.website, "Updated session data");

    let data = store.read(&session_id)?;

    let dim = Style::new().dim();
    if !ctx.json_output {
        println!("Session {}", Style::new().bold().apply_to(&session_id));
        println!("  {} {}", dim.apply_to("data:"), serde_json::to_string(&data)?);
        if ctx.verbose {
            let config = store.config();
            println!(
                "  {} threshold {:?}, scan period {:?}, {} reaping",
                dim.apply_to("policy:"),
                config.staleness_threshold,
                config.scan_period,
                config.reap_mode
            );
        }
    }

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = ctx.shutdown.cancelled() => {}
            }
        }
        None => ctx.shutdown.cancelled().await,
    }

    let survived = store.contains(&session_id);
    reaper.stop().await;
    let stats = store.stats();

    if ctx.json_output {
        let output = DemoOutput {
            session_id: session_id.into_string(),
            data,
            survived,
            evicted_total: stats.evicted_total,
            remaining: stats.size,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if survived {
        println!("{}", Style::new().green().apply_to("Session is still live"));
    } else {
        println!(
            "{}",
            Style::new().yellow().apply_to("Session expired and was evicted")
        );
    }

    Ok(())
}
