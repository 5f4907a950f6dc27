/*!
 * Foreground Monitor Tests
 * Cleanups run on the caller's thread during registration calls
 */

use pretty_assertions::assert_eq;
use reachability::{foreground_monitor, Cleanup, ReachabilityMonitor, ReferenceKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn counting(runs: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let runs = runs.clone();
    move || {
        runs.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_cleanup_runs_on_next_registration() {
    let monitor = foreground_monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let buffer = Arc::new(vec![0u8; 64]);
    monitor.when_unreachable(&buffer, counting(&runs)).unwrap();
    drop(buffer);

    // nothing runs until the monitor is called again
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    let other = Arc::new(vec![1u8; 64]);
    monitor.when_unreachable(&other, || {}).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cleanup_runs_on_calling_thread() {
    let monitor = foreground_monitor();
    let caller = thread::current().id();
    let ran_on = Arc::new(parking_lot::Mutex::new(None));

    let target = Arc::new(42u64);
    let slot = ran_on.clone();
    monitor
        .when_weakly_reachable(&target, move || {
            *slot.lock() = Some(thread::current().id());
        })
        .unwrap();
    drop(target);
    monitor.collect();

    assert_eq!(*ran_on.lock(), Some(caller));
}

#[test]
fn test_cleanup_runs_exactly_once() {
    let monitor = foreground_monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new("session".to_string());
    monitor.when_unreachable(&target, counting(&runs)).unwrap();
    drop(target);

    for _ in 0..5 {
        monitor.collect();
        let filler = Arc::new(0u8);
        monitor.when_unreachable(&filler, || {}).unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_live_target_is_never_cleaned() {
    let monitor = foreground_monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(7u32);
    monitor.when_unreachable(&target, counting(&runs)).unwrap();
    for _ in 0..10 {
        monitor.collect();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.pending_cleanups(), 1);
    drop(target);
}

#[test]
fn test_several_cleanups_on_one_target() {
    let monitor = foreground_monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(1u16);
    monitor.when_weakly_reachable(&target, counting(&runs)).unwrap();
    monitor.when_unreachable(&target, counting(&runs)).unwrap();
    monitor.when_unreachable(&target, counting(&runs)).unwrap();
    assert_eq!(monitor.pending_cleanups(), 3);

    drop(target);
    assert_eq!(monitor.collect(), 3);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(monitor.pending_cleanups(), 0);
}

#[test]
fn test_weak_cleanups_run_before_phantom_cleanups() {
    let monitor = foreground_monitor();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let target = Arc::new(3u8);
    for kind in [ReferenceKind::Phantom, ReferenceKind::Weak, ReferenceKind::Phantom] {
        let order = order.clone();
        let record = move || order.lock().push(kind);
        match kind {
            ReferenceKind::Weak => monitor.when_weakly_reachable(&target, record).unwrap(),
            _ => monitor.when_unreachable(&target, record).unwrap(),
        }
    }

    drop(target);
    monitor.collect();
    assert_eq!(
        *order.lock(),
        vec![ReferenceKind::Weak, ReferenceKind::Phantom, ReferenceKind::Phantom]
    );
}

#[test]
fn test_weak_handle_to_dead_target_is_rejected() {
    let monitor = foreground_monitor();
    let target = Arc::new(5u32);
    let weak = Arc::downgrade(&target);
    drop(target);

    let err = monitor.when_unreachable(&weak, || {}).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(monitor.pending_cleanups(), 0);
}

#[test]
fn test_prebuilt_cleanup_is_accepted() {
    let monitor = foreground_monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Arc::new(9i64);
    monitor
        .when_unreachable(&target, Cleanup::new(counting(&runs)))
        .unwrap();
    drop(target);
    monitor.collect();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.stats().cleanups_run, 1);
}
