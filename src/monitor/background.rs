/*!
 * Background Monitor
 *
 * Worker pool that runs cleanups off the caller's thread.
 *
 * ## Threads
 *
 * - one reclamation thread, scanning watched handles every poll interval
 * - `workers` cleanup threads, all consuming one notification channel
 *
 * A notification is received by exactly one worker, so each cleanup runs at
 * most once no matter how many workers race. A cleanup that blocks stalls
 * only the worker running it.
 *
 * ## Shutdown
 *
 * `Active -> Draining -> ShutDown`. Draining stops the reclamation thread,
 * stops watching, and disconnects the channel. Workers finish the
 * notifications already queued, then exit and are joined. Finally the table
 * is invalidated. Dropping the last `BackgroundMonitor` handle does the same.
 */

use super::cleanup::IntoCleanup;
use super::shared::{MonitorCore, MonitorState, Retention};
use super::stats::MonitorStatsSnapshot;
use super::ReachabilityMonitor;
use crate::core::{MonitorConfig, MonitorResult, ReferenceKind};
use crate::reclaim::Notification;
use crate::references::{Reference, Referent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

/// Monitor running cleanups on a fixed pool of background threads
///
/// Cheap to clone; all clones share one pool. Keep a handle for as long as
/// cleanups should run: once the last handle is dropped the monitor shuts
/// itself down and pending cleanups never run. Cleanups that capture a
/// handle of their own monitor keep it alive.
#[derive(Clone)]
pub struct BackgroundMonitor {
    pool: Arc<WorkerPool>,
}

struct WorkerPool {
    core: Arc<MonitorCore>,
    config: MonitorConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
    reclaimer: Mutex<Option<JoinHandle<()>>>,
    // never sent on; disconnecting it stops the reclamation thread
    stop: Mutex<Option<flume::Sender<()>>>,
}

impl BackgroundMonitor {
    /// Start a monitor with `workers` cleanup threads and default settings
    pub fn new(workers: usize) -> MonitorResult<Self> {
        Self::with_config(MonitorConfig::with_workers(workers))
    }

    pub fn with_config(config: MonitorConfig) -> MonitorResult<Self> {
        config.validate()?;

        let core = Arc::new(MonitorCore::new());
        let (stop_tx, stop_rx) = flume::bounded::<()>(1);
        let pool = Arc::new(WorkerPool {
            core: core.clone(),
            config: config.clone(),
            workers: Mutex::new(Vec::with_capacity(config.workers)),
            reclaimer: Mutex::new(None),
            stop: Mutex::new(Some(stop_tx)),
        });

        // on error the pool is dropped, which stops whatever already started
        for index in 0..config.workers {
            let handle = spawn_worker(&config, index, core.clone())?;
            pool.workers.lock().push(handle);
        }
        let handle = spawn_reclaimer(&config, core, stop_rx)?;
        *pool.reclaimer.lock() = Some(handle);

        info!(
            workers = config.workers,
            poll_interval_ms = config.poll_interval_ms,
            "background monitor started"
        );
        Ok(Self { pool })
    }

    /// Number of cleanup workers
    pub fn workers(&self) -> usize {
        self.pool.config.workers
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.pool.config
    }

    fn register<T, R, C>(
        &self,
        kind: ReferenceKind,
        target: R,
        cleanup: C,
        retention: Retention,
    ) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.pool.core.register(kind, target, cleanup, retention)
    }
}

impl ReachabilityMonitor for BackgroundMonitor {
    fn when_weakly_reachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register(ReferenceKind::Weak, target, cleanup, Retention::Monitor)
            .map(drop)
    }

    fn when_unreachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register(ReferenceKind::Phantom, target, cleanup, Retention::Monitor)
            .map(drop)
    }

    fn weak_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register(ReferenceKind::Weak, referent, cleanup, Retention::Caller)
    }

    fn phantom_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register(ReferenceKind::Phantom, referent, cleanup, Retention::Caller)
    }

    fn request_shutdown(&self) {
        self.pool.shutdown();
    }

    fn collect(&self) -> usize {
        self.pool.core.collect()
    }

    fn state(&self) -> MonitorState {
        self.pool.core.state()
    }

    fn pending_cleanups(&self) -> usize {
        self.pool.core.pending_cleanups()
    }

    fn stats(&self) -> MonitorStatsSnapshot {
        self.pool.core.stats()
    }
}

impl std::fmt::Debug for BackgroundMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundMonitor")
            .field("workers", &self.workers())
            .field("state", &self.state())
            .field("pending", &self.pending_cleanups())
            .finish()
    }
}

impl WorkerPool {
    fn shutdown(&self) {
        if !self
            .core
            .transition(MonitorState::Active, MonitorState::Draining)
        {
            return;
        }
        debug!("background monitor draining");

        drop(self.stop.lock().take());
        if let Some(handle) = self.reclaimer.lock().take() {
            join_thread(handle, "reclaimer");
        }

        let dropped_watches = self.core.close_reclaimer();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            join_thread(handle, "worker");
        }

        let invalidated = self.core.invalidate();
        self.core.set_state(MonitorState::ShutDown);
        info!(dropped_watches, invalidated, "background monitor shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    config: &MonitorConfig,
    index: usize,
    core: Arc<MonitorCore>,
) -> MonitorResult<JoinHandle<()>> {
    let receiver = core.subscribe();
    let handle = thread::Builder::new()
        .name(format!("{}-worker-{}", config.thread_name, index))
        .spawn(move || run_worker(index, core, receiver))?;
    Ok(handle)
}

fn spawn_reclaimer(
    config: &MonitorConfig,
    core: Arc<MonitorCore>,
    stop: flume::Receiver<()>,
) -> MonitorResult<JoinHandle<()>> {
    let interval = config.poll_interval_duration();
    let handle = thread::Builder::new()
        .name(format!("{}-reclaimer", config.thread_name))
        .spawn(move || run_reclaimer(core, stop, interval))?;
    Ok(handle)
}

/// Block on the channel and dispatch until it is disconnected and empty
fn run_worker(index: usize, core: Arc<MonitorCore>, receiver: flume::Receiver<Notification>) {
    let span = info_span!("reachability_worker", index);
    let _entered = span.enter();
    debug!("worker started");

    let mut dispatched = 0u64;
    while let Ok(notification) = receiver.recv() {
        if core.dispatch(notification) {
            dispatched += 1;
        }
    }

    debug!(dispatched, "worker stopped");
}

/// Run a reclamation pass every `interval` until the stop channel disconnects
fn run_reclaimer(core: Arc<MonitorCore>, stop: flume::Receiver<()>, interval: Duration) {
    let span = info_span!("reachability_reclaimer", interval_ms = interval.as_millis() as u64);
    let _entered = span.enter();
    debug!("reclamation thread started");

    loop {
        match stop.recv_timeout(interval) {
            Err(flume::RecvTimeoutError::Timeout) => {
                core.collect();
            }
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("reclamation thread stopped");
}

/// Join a monitor thread unless it is the calling thread
///
/// The last handle may be dropped by a cleanup running on a worker.
fn join_thread(handle: JoinHandle<()>, role: &'static str) {
    if handle.thread().id() == thread::current().id() {
        debug!(role, "shutdown requested from a monitor thread, not joining it");
        return;
    }
    if handle.join().is_err() {
        warn!(role, "monitor thread panicked");
    }
}
