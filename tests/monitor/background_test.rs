/*!
 * Background Monitor Tests
 * Worker pool dispatch, exactly-once delivery and failure containment
 */

use super::wait_until;
use pretty_assertions::assert_eq;
use reachability::{
    background_monitor, background_monitor_with_config, MonitorConfig, ReachabilityMonitor,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn fast_monitor(workers: usize) -> reachability::BackgroundMonitor {
    let config = MonitorConfig::with_workers(workers).poll_interval(Duration::from_millis(2));
    background_monitor_with_config(config).unwrap()
}

#[test]
fn test_two_workers_run_each_cleanup_once() {
    let monitor = fast_monitor(2);
    let runs = Arc::new(AtomicUsize::new(0));

    let targets: Vec<Arc<usize>> = (0..64).map(Arc::new).collect();
    for target in &targets {
        let runs = runs.clone();
        monitor
            .when_unreachable(target, move || {
                runs.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    drop(targets);

    assert!(wait_until(TIMEOUT, || runs.load(Ordering::SeqCst) == 64));
    // give a duplicate delivery a chance to show up
    thread::sleep(Duration::from_millis(50));
    assert_eq!(runs.load(Ordering::SeqCst), 64);
    assert_eq!(monitor.pending_cleanups(), 0);
}

#[test]
fn test_cleanups_run_on_worker_threads() {
    let monitor = fast_monitor(3);
    let names = Arc::new(parking_lot::Mutex::new(HashSet::new()));
    let runs = Arc::new(AtomicUsize::new(0));

    let targets: Vec<Arc<u8>> = (0..16).map(|_| Arc::new(0u8)).collect();
    for target in &targets {
        let names = names.clone();
        let runs = runs.clone();
        monitor
            .when_weakly_reachable(target, move || {
                let name = thread::current().name().map(str::to_string);
                names.lock().insert(name);
                runs.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    drop(targets);

    assert!(wait_until(TIMEOUT, || runs.load(Ordering::SeqCst) == 16));
    for name in names.lock().iter() {
        let name = name.as_deref().unwrap_or_default();
        assert!(name.starts_with("reachability-worker-"), "unexpected thread {}", name);
    }
}

#[test]
fn test_blocked_cleanup_does_not_stall_other_workers() {
    let monitor = fast_monitor(2);
    let (release_tx, release_rx) = flume::bounded::<()>(1);
    let runs = Arc::new(AtomicUsize::new(0));

    let blocker = Arc::new(0u32);
    monitor
        .when_unreachable(&blocker, move || {
            let _ = release_rx.recv_timeout(TIMEOUT);
        })
        .unwrap();
    drop(blocker);
    thread::sleep(Duration::from_millis(20));

    let quick = Arc::new(1u32);
    let counter = runs.clone();
    monitor
        .when_unreachable(&quick, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(quick);

    assert!(wait_until(TIMEOUT, || runs.load(Ordering::SeqCst) == 1));
    release_tx.send(()).unwrap();
}

#[test]
fn test_manual_collect_reports_enqueued() {
    let config = MonitorConfig::with_workers(1).poll_interval(Duration::from_secs(60));
    let monitor = background_monitor_with_config(config).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(0i32);
    let counter = runs.clone();
    monitor
        .when_unreachable(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(target);

    assert_eq!(monitor.collect(), 1);
    assert!(wait_until(TIMEOUT, || runs.load(Ordering::SeqCst) == 1));
    assert_eq!(monitor.stats().enqueued, 1);
}

#[test]
fn test_dropped_caller_wrapper_cancels_cleanup() {
    let monitor = fast_monitor(1);
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(String::from("key"));
    let counter = runs.clone();
    let reference = monitor
        .weak_reference(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(reference);
    drop(target);

    assert!(wait_until(TIMEOUT, || monitor.pending_cleanups() == 0));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.stats().evicted, 1);
}

#[test]
fn test_held_wrapper_cleanup_runs() {
    let monitor = fast_monitor(1);
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(String::from("key"));
    let counter = runs.clone();
    let reference = monitor
        .phantom_reference(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(target);

    assert!(wait_until(TIMEOUT, || runs.load(Ordering::SeqCst) == 1));
    assert!(reference.is_cleared());
    assert!(reference.get().is_none());
}

#[test]
fn test_worker_count_bounds() {
    assert!(background_monitor(0).unwrap_err().is_invalid_argument());
    let config = MonitorConfig::with_workers(reachability::core::limits::MAX_WORKERS + 1);
    assert!(background_monitor_with_config(config).is_err());
}
