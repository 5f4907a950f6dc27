/*!
 * Shutdown Tests
 * Explicit shutdown, self-shutdown on drop, and post-shutdown registrations
 */

use super::wait_until;
use pretty_assertions::assert_eq;
use reachability::{
    background_monitor, background_monitor_with_config, foreground_monitor, MonitorConfig,
    MonitorState, ReachabilityMonitor,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_shutdown_before_reclaim_never_runs_cleanup() {
    let config = MonitorConfig::with_workers(2).poll_interval(Duration::from_millis(2));
    let monitor = background_monitor_with_config(config).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(vec![1u32, 2, 3]);
    let counter = runs.clone();
    monitor
        .when_unreachable(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    monitor.request_shutdown();
    assert_eq!(monitor.state(), MonitorState::ShutDown);
    assert_eq!(monitor.pending_cleanups(), 0);

    drop(target);
    thread::sleep(Duration::from_millis(30));
    monitor.collect();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_double_shutdown_is_harmless() {
    let monitor = background_monitor(2).unwrap();
    monitor.request_shutdown();
    monitor.request_shutdown();
    assert!(monitor.is_shut_down());

    let foreground = foreground_monitor();
    foreground.request_shutdown();
    foreground.request_shutdown();
    assert!(foreground.is_shut_down());
}

#[test]
fn test_registration_after_shutdown_is_inert() {
    let monitor = background_monitor(1).unwrap();
    monitor.request_shutdown();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(0u64);
    let counter = runs.clone();
    let reference = monitor
        .weak_reference(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(reference.get().as_deref(), Some(&0));
    assert_eq!(monitor.pending_cleanups(), 0);

    drop(target);
    monitor.collect();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(reference.get().is_none());
}

#[test]
fn test_invalid_arguments_still_rejected_after_shutdown() {
    let monitor = foreground_monitor();
    monitor.request_shutdown();
    let err = monitor
        .when_unreachable(None::<Arc<u8>>, || {})
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_dropping_last_handle_shuts_down() {
    let monitor = background_monitor(2).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(1u8);
    let counter = runs.clone();
    monitor
        .when_unreachable(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    // dropping joins every monitor thread
    drop(monitor);
    drop(target);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_clone_keeps_monitor_alive() {
    let config = MonitorConfig::with_workers(1).poll_interval(Duration::from_millis(2));
    let monitor = background_monitor_with_config(config).unwrap();
    let keeper = monitor.clone();
    drop(monitor);

    let runs = Arc::new(AtomicUsize::new(0));
    let target = Arc::new(2u8);
    let counter = runs.clone();
    keeper
        .when_unreachable(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(target);

    assert!(wait_until(Duration::from_secs(10), || runs.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_cleanup_may_drop_last_monitor_handle() {
    let config = MonitorConfig::with_workers(1).poll_interval(Duration::from_millis(2));
    let monitor = background_monitor_with_config(config).unwrap();
    let finished = Arc::new(AtomicBool::new(false));

    let target = Arc::new(3u8);
    let own_handle = monitor.clone();
    let flag = finished.clone();
    monitor
        .when_unreachable(&target, move || {
            // the last handle goes away on a worker thread
            drop(own_handle);
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

    drop(monitor);
    drop(target);
    assert!(wait_until(Duration::from_secs(10), || finished.load(Ordering::SeqCst)));
}

#[test]
fn test_shutdown_from_inside_cleanup() {
    let config = MonitorConfig::with_workers(1).poll_interval(Duration::from_millis(2));
    let monitor = background_monitor_with_config(config).unwrap();
    let finished = Arc::new(AtomicBool::new(false));

    let target = Arc::new(4u8);
    let handle = monitor.clone();
    let flag = finished.clone();
    monitor
        .when_unreachable(&target, move || {
            handle.request_shutdown();
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
    drop(target);

    assert!(wait_until(Duration::from_secs(10), || finished.load(Ordering::SeqCst)));
    assert!(wait_until(Duration::from_secs(10), || {
        monitor.state() == MonitorState::ShutDown
    }));
}

#[test]
fn test_shutdown_finishes_queued_notifications() {
    let config = MonitorConfig::with_workers(1).poll_interval(Duration::from_secs(60));
    let monitor = background_monitor_with_config(config).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    // weak notifications are queued ahead of phantom ones
    let slow = Arc::new(0u8);
    monitor
        .when_weakly_reachable(&slow, || thread::sleep(Duration::from_millis(100)))
        .unwrap();
    let queued = Arc::new(1u8);
    let counter = runs.clone();
    monitor
        .when_unreachable(&queued, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    drop(slow);
    drop(queued);
    assert_eq!(monitor.collect(), 2);

    monitor.request_shutdown();
    assert_eq!(monitor.state(), MonitorState::ShutDown);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.stats().cleanups_run, 2);
    assert_eq!(monitor.stats().invalidated, 0);
}
