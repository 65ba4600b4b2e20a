//! Soak command - drives one store from many concurrent workers while the
//! reaper runs, then checks the index is consistent.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use lapse_session::{Error, Payload, SessionStore};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Context;

/// Every n-th session a worker creates is deleted explicitly.
const DELETE_EVERY: u64 = 10;

/// Arguments for the soak command.
#[derive(Args, Debug)]
pub struct SoakArgs {
    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 10)]
    pub duration_secs: u64,

    /// Pause between worker iterations, in milliseconds
    #[arg(long, default_value_t = 1)]
    pub pause_ms: u64,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    updated: AtomicU64,
    reads: AtomicU64,
    not_found: AtomicU64,
    deleted: AtomicU64,
}

/// Soak result for JSON output.
#[derive(Debug, Serialize)]
struct SoakReport {
    workers: usize,
    created: u64,
    updated: u64,
    reads: u64,
    not_found: u64,
    deleted: u64,
    evicted: u64,
    remaining: usize,
    expected_remaining: u64,
    consistent: bool,
}

/// Run the soak command.
pub async fn run(args: SoakArgs, ctx: &Context) -> Result<()> {
    let store = SessionStore::new(ctx.config.session.store_config());
    let reaper = store.spawn_reaper();
    let counters = Arc::new(Counters::default());
    let stop = ctx.shutdown.child_token();

    info!(workers = args.workers, duration_secs = args.duration_secs, "Starting soak run");

    let mut tasks = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        tasks.push(tokio::spawn(worker_loop(
            worker,
            store.clone(),
            counters.clone(),
            stop.clone(),
            Duration::from_millis(args.pause_ms),
        )));
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.duration_secs)) => {}
        _ = ctx.shutdown.cancelled() => {}
    }
    stop.cancel();

    for task in tasks {
        task.await??;
    }
    reaper.stop().await;

    let stats = store.stats();
    let created = counters.created.load(Ordering::SeqCst);
    let deleted = counters.deleted.load(Ordering::SeqCst);
    let expected_remaining = created
        .saturating_sub(deleted)
        .saturating_sub(stats.evicted_total);

    let report = SoakReport {
        workers: args.workers,
        created,
        updated: counters.updated.load(Ordering::SeqCst),
        reads: counters.reads.load(Ordering::SeqCst),
        not_found: counters.not_found.load(Ordering::SeqCst),
        deleted,
        evicted: stats.evicted_total,
        remaining: stats.size,
        expected_remaining,
        consistent: stats.size as u64 == expected_remaining,
    };

    print_report(&report, ctx)?;

    if !report.consistent {
        bail!(
            "index size {} does not match expected {}",
            report.remaining,
            report.expected_remaining
        );
    }

    Ok(())
}

async fn worker_loop(
    worker: usize,
    store: SessionStore,
    counters: Arc<Counters>,
    stop: CancellationToken,
    pause: Duration,
) -> Result<()> {
    let mut iteration: u64 = 0;

    while !stop.is_cancelled() {
        let session_id = store.create()?;
        counters.created.fetch_add(1, Ordering::SeqCst);

        let mut data = Payload::new();
        data.insert("worker".to_string(), json!(worker));
        data.insert("iteration".to_string(), json!(iteration));

        // Anything can have been evicted by the time we get back to it.
        match store.update(&session_id, data) {
            Ok(()) => {
                counters.updated.fetch_add(1, Ordering::SeqCst);
            }
            Err(Error::NotFound(_)) => {
                counters.not_found.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => return Err(e.into()),
        }

        match store.read(&session_id) {
            Ok(_) => {
                counters.reads.fetch_add(1, Ordering::SeqCst);
            }
            Err(Error::NotFound(_)) => {
                counters.not_found.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => return Err(e.into()),
        }

        if iteration % DELETE_EVERY == 0 {
            match store.delete(&session_id) {
                Ok(_) => {
                    counters.deleted.fetch_add(1, Ordering::SeqCst);
                }
                Err(Error::NotFound(_)) => {
                    counters.not_found.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => return Err(e.into()),
            }
        }

        iteration += 1;
        tokio::time::sleep(pause).await;
    }

    debug!(worker = worker, iterations = iteration, "Soak worker finished");
    Ok(())
}

fn print_report(report: &SoakReport, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", Style::new().bold().apply_to("Soak run complete"));
    println!("  {} {}", dim.apply_to("workers:  "), report.workers);
    println!("  {} {}", dim.apply_to("created:  "), report.created);
    println!("  {} {}", dim.apply_to("updated:  "), report.updated);
    println!("  {} {}", dim.apply_to("reads:    "), report.reads);
    println!("  {} {}", dim.apply_to("not found:"), report.not_found);
    println!("  {} {}", dim.apply_to("deleted:  "), report.deleted);
    println!("  {} {}", dim.apply_to("evicted:  "), report.evicted);
    println!(
        "  {} {} (expected {})",
        dim.apply_to("remaining:"),
        report.remaining,
        report.expected_remaining
    );

    if report.consistent {
        println!("{}", Style::new().green().apply_to("Index is consistent"));
    } else {
        println!("{}", Style::new().red().apply_to("Index is INCONSISTENT"));
    }
    println!();

    Ok(())
}
