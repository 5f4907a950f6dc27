/*!
 * Reachability Monitor - Demo Entry Point
 *
 * Starts a background monitor from environment configuration, registers a
 * handful of cleanups, drops their targets and reports the monitor stats.
 */

use anyhow::Context;
use reachability::{
    background_monitor_with_config, init_tracing, strong_reference, Cleanup, MonitorConfig,
    ReachabilityMonitor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Stand-in for an object owning an external resource
struct Connection {
    id: usize,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = MonitorConfig::from_env();
    info!(?config, "starting reachability demo");
    let monitor = background_monitor_with_config(config).context("failed to start monitor")?;

    let closed = Arc::new(AtomicUsize::new(0));
    let mut connections = Vec::new();
    for id in 0..4 {
        let connection = Arc::new(Connection { id });
        let counter = closed.clone();
        monitor.when_unreachable(&connection, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            info!(connection = id, "connection released");
        })?;
        connections.push(connection);
    }

    let flaky = Arc::new(Connection { id: 99 });
    monitor.when_weakly_reachable(
        &flaky,
        Cleanup::fallible(|| Err(anyhow::anyhow!("peer already gone"))),
    )?;

    let pinned = strong_reference(&connections[0])?;
    info!(pinned = ?pinned.get().map(|c| c.id), "holding a strong reference to the first connection");

    drop(flaky);
    connections.clear();
    pinned.clear();

    let expected = 4;
    let deadline = Instant::now() + Duration::from_secs(5);
    while closed.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
        monitor.collect();
        std::thread::sleep(Duration::from_millis(10));
    }
    if closed.load(Ordering::SeqCst) < expected {
        warn!(closed = closed.load(Ordering::SeqCst), expected, "not every cleanup ran before the deadline");
    }

    monitor.request_shutdown();
    let stats = serde_json::to_string_pretty(&monitor.stats())?;
    println!("{}", stats);
    Ok(())
}
