//! Scan coordinator - lifecycle of concurrently running scans
//!
//! Every accepted scan runs on its own named thread (`scan-<id>`). The
//! registry lock is the single admission point: at most one scan of a given
//! kind runs against a given (canonicalized) root at a time, while scans of
//! different kinds or on different roots run side by side. Results are kept
//! in the registry until the coordinator is dropped.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::aggregate;
use crate::categories::{duplicates, large};
use crate::classify::PathClassifier;
use crate::config::Config;
use crate::error::{Result, ScanError, ScanFailure};
use crate::model::{
    ScanId, ScanKind, ScanOutcome, ScanPayload, ScanResult, ScanState, ScanTarget, WarningSummary,
};
use crate::scan_events::{ScanEvent, ScanMonitor, ScanProgress};

type Observer = Arc<dyn Fn(&ScanEvent) + Send + Sync>;

/// Starts, tracks and cancels scans.
///
/// Dropping the coordinator cancels every running scan and waits for its
/// worker thread.
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    classifier: PathClassifier,
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    scans: HashMap<ScanId, Arc<ScanSlot>>,
    /// Running scans keyed by kind and canonical root
    running: HashMap<(ScanKind, PathBuf), ScanId>,
}

struct ScanSlot {
    id: ScanId,
    kind: ScanKind,
    key_root: PathBuf,
    cancel: AtomicBool,
    subscribers: Mutex<Subscribers>,
    status: Mutex<SlotStatus>,
    done: Condvar,
    handle: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct Subscribers {
    channels: Vec<Sender<ScanEvent>>,
    observers: Vec<Observer>,
    closed: bool,
}

struct SlotStatus {
    state: ScanState,
    result: Option<ScanResult>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScanSlot {
    fn new(id: ScanId, kind: ScanKind, key_root: PathBuf) -> Self {
        Self {
            id,
            kind,
            key_root,
            cancel: AtomicBool::new(false),
            subscribers: Mutex::new(Subscribers::default()),
            status: Mutex::new(SlotStatus {
                state: ScanState::Idle,
                result: None,
            }),
            done: Condvar::new(),
            handle: Mutex::new(None),
        }
    }

    fn state(&self) -> ScanState {
        lock(&self.status).state
    }

    fn set_running(&self) {
        lock(&self.status).state = ScanState::Running;
    }

    /// Deliver an event to every subscriber, dropping closed channels.
    ///
    /// Observers run without the subscriber lock held, so they may subscribe
    /// or query the coordinator themselves.
    fn publish(&self, event: ScanEvent) {
        let observers: Vec<Observer> = {
            let mut subs = lock(&self.subscribers);
            subs.channels.retain(|tx| tx.send(event.clone()).is_ok());
            subs.observers.clone()
        };
        for observer in &observers {
            observer(&event);
        }
    }

    /// Register a channel; a finished scan hands back an already-closed one.
    fn add_channel(&self, tx: Sender<ScanEvent>) {
        let mut subs = lock(&self.subscribers);
        if !subs.closed {
            subs.channels.push(tx);
        }
    }

    fn add_observer(&self, observer: Observer) {
        let mut subs = lock(&self.subscribers);
        if !subs.closed {
            subs.observers.push(observer);
        }
    }

    fn close_subscribers(&self) {
        let mut subs = lock(&self.subscribers);
        subs.closed = true;
        subs.channels.clear();
        subs.observers.clear();
    }

    fn complete(&self, result: ScanResult) {
        let mut status = lock(&self.status);
        status.state = result.state();
        status.result = Some(result);
        self.done.notify_all();
    }
}

impl ScanCoordinator {
    pub fn new(config: Config) -> Self {
        let classifier = PathClassifier::from_config(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                classifier,
                next_id: AtomicU64::new(1),
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Validate `target` and start scanning it on a new worker thread.
    ///
    /// Fails with `InvalidTarget` if the root does not exist, is not a
    /// directory or cannot be listed, and with `AlreadyRunning` if a scan of
    /// the same kind is running on the same root. A rejected request changes
    /// nothing.
    pub fn start_scan(&self, target: ScanTarget) -> Result<ScanId> {
        self.launch(target, Subscribers::default())
    }

    /// Like [`start_scan`](Self::start_scan), with an event channel attached
    /// before the worker starts so that no event is missed.
    pub fn start_scan_subscribed(&self, target: ScanTarget) -> Result<(ScanId, Receiver<ScanEvent>)> {
        let (tx, rx) = mpsc::channel();
        let subs = Subscribers {
            channels: vec![tx],
            ..Subscribers::default()
        };
        let id = self.launch(target, subs)?;
        Ok((id, rx))
    }

    /// Like [`start_scan`](Self::start_scan), with `observer` called on the
    /// worker thread for every event, starting with `Started`.
    pub fn start_scan_observed<F>(&self, target: ScanTarget, observer: F) -> Result<ScanId>
    where
        F: Fn(&ScanEvent) + Send + Sync + 'static,
    {
        let subs = Subscribers {
            observers: vec![Arc::new(observer)],
            ..Subscribers::default()
        };
        self.launch(target, subs)
    }

    fn launch(&self, target: ScanTarget, subs: Subscribers) -> Result<ScanId> {
        validate_root(&target.root)?;
        let key_root = fs::canonicalize(&target.root).unwrap_or_else(|_| target.root.clone());
        let key = (target.kind, key_root.clone());

        let mut registry = lock(&self.inner.registry);
        if registry.running.contains_key(&key) {
            log::debug!("rejected {} scan of {}: already running", target.kind, target.root.display());
            return Err(ScanError::AlreadyRunning {
                kind: target.kind,
                root: target.root,
            });
        }

        let id = ScanId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(ScanSlot::new(id, target.kind, key_root));
        *lock(&slot.subscribers) = subs;

        let root = target.root.clone();
        let worker = {
            let inner = Arc::clone(&self.inner);
            let slot = Arc::clone(&slot);
            thread::Builder::new()
                .name(format!("scan-{}", id.0))
                .spawn(move || run_scan(inner, slot, target))
        };
        let handle = worker.map_err(|source| ScanError::Io { path: root, source })?;
        *lock(&slot.handle) = Some(handle);

        registry.running.insert(key, id);
        registry.scans.insert(id, slot);
        Ok(id)
    }

    fn slot(&self, id: ScanId) -> Result<Arc<ScanSlot>> {
        lock(&self.inner.registry)
            .scans
            .get(&id)
            .cloned()
            .ok_or(ScanError::UnknownScan(id))
    }

    /// Request cancellation. Idempotent; a no-op once the scan has finished.
    pub fn cancel_scan(&self, id: ScanId) -> Result<()> {
        let slot = self.slot(id)?;
        if !slot.state().is_terminal() && !slot.cancel.swap(true, Ordering::Relaxed) {
            log::info!("{} cancellation requested", id);
        }
        Ok(())
    }

    /// Cancel every running scan; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let registry = lock(&self.inner.registry);
        let mut count = 0;
        for id in registry.running.values() {
            if let Some(slot) = registry.scans.get(id) {
                slot.cancel.store(true, Ordering::Relaxed);
                count += 1;
            }
        }
        if count > 0 {
            log::info!("cancelling {} running scans", count);
        }
        count
    }

    /// Channel receiving every event emitted from now on. The channel closes
    /// after `Finished`; for a finished scan it is closed already.
    pub fn subscribe(&self, id: ScanId) -> Result<Receiver<ScanEvent>> {
        let slot = self.slot(id)?;
        let (tx, rx) = mpsc::channel();
        slot.add_channel(tx);
        Ok(rx)
    }

    /// Call `callback` on the worker thread for every progress snapshot.
    pub fn subscribe_progress<F>(&self, id: ScanId, callback: F) -> Result<()>
    where
        F: Fn(&ScanProgress) + Send + Sync + 'static,
    {
        let slot = self.slot(id)?;
        slot.add_observer(Arc::new(move |event: &ScanEvent| {
            if let ScanEvent::Progress(progress) = event {
                callback(progress);
            }
        }));
        Ok(())
    }

    pub fn state(&self, id: ScanId) -> Result<ScanState> {
        Ok(self.slot(id)?.state())
    }

    /// Result of a finished scan, or `None` while it is still running.
    pub fn try_result(&self, id: ScanId) -> Result<Option<ScanResult>> {
        let slot = self.slot(id)?;
        let status = lock(&slot.status);
        Ok(status.result.clone())
    }

    /// Block until the scan reaches a terminal state.
    pub fn get_result(&self, id: ScanId) -> Result<ScanResult> {
        let slot = self.slot(id)?;
        let status = slot
            .done
            .wait_while(lock(&slot.status), |s| s.result.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        status
            .result
            .clone()
            .ok_or(ScanError::UnknownScan(id))
    }

    /// Like [`get_result`](Self::get_result) but gives up after `timeout`.
    pub fn get_result_timeout(&self, id: ScanId, timeout: Duration) -> Result<Option<ScanResult>> {
        let slot = self.slot(id)?;
        let (status, _) = slot
            .done
            .wait_timeout_while(lock(&slot.status), timeout, |s| s.result.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        Ok(status.result.clone())
    }

    /// Ids of scans that have not finished yet, oldest first.
    pub fn running_scans(&self) -> Vec<ScanId> {
        let mut ids: Vec<ScanId> = lock(&self.inner.registry).running.values().copied().collect();
        ids.sort();
        ids
    }
}

impl Drop for ScanCoordinator {
    fn drop(&mut self) {
        self.cancel_all();
        let slots: Vec<Arc<ScanSlot>> = lock(&self.inner.registry).scans.values().cloned().collect();
        for slot in slots {
            let handle = lock(&slot.handle).take();
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    log::warn!("{} worker did not exit cleanly", slot.id);
                }
            }
        }
    }
}

fn validate_root(root: &Path) -> Result<()> {
    let invalid = |reason: String| ScanError::InvalidTarget {
        path: root.to_path_buf(),
        reason,
    };

    let meta = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => invalid("does not exist".to_string()),
        _ => invalid(format!("cannot be read: {}", e)),
    })?;
    if !meta.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    fs::read_dir(root).map_err(|e| invalid(format!("cannot be listed: {}", e)))?;
    Ok(())
}

fn run_scan(inner: Arc<Inner>, slot: Arc<ScanSlot>, target: ScanTarget) {
    slot.set_running();
    log::info!("{} started: {} scan of {}", slot.id, target.kind, target.root.display());
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        slot.publish(ScanEvent::Started {
            scan_id: slot.id,
            kind: target.kind,
            root: target.root.clone(),
        });
        execute(&inner, &slot, &target)
    }))
    .unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("{} worker panicked: {}", slot.id, message);
        failed_result(&slot, &target, ScanFailure::WorkerPanicked(message), started.elapsed())
    });
    let state = result.state();

    {
        let mut registry = lock(&inner.registry);
        let key = (slot.kind, slot.key_root.clone());
        if registry.running.get(&key) == Some(&slot.id) {
            registry.running.remove(&key);
        }
    }
    log::info!(
        "{} finished: {:?}, {} files in {:.2?}",
        slot.id,
        state,
        result.files_examined,
        result.elapsed
    );
    slot.complete(result);
    let finished = panic::catch_unwind(AssertUnwindSafe(|| {
        slot.publish(ScanEvent::Finished {
            scan_id: slot.id,
            state,
        })
    }));
    if let Err(payload) = finished {
        log::error!(
            "{} observer panicked on finish: {}",
            slot.id,
            panic_message(payload.as_ref())
        );
    }
    slot.close_subscribers();
}

fn execute(inner: &Inner, slot: &ScanSlot, target: &ScanTarget) -> ScanResult {
    let started = Instant::now();
    match fs::metadata(&target.root) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return failed_result(
                slot,
                target,
                ScanFailure::RootVanished(target.root.clone()),
                started.elapsed(),
            );
        }
        Ok(meta) if !meta.is_dir() => {
            return failed_result(
                slot,
                target,
                ScanFailure::Internal(format!("{} is no longer a directory", target.root.display())),
                started.elapsed(),
            );
        }
        _ => {}
    }

    let settings = &inner.config.scan;
    let sink = |event: ScanEvent| slot.publish(event);
    let mut monitor = ScanMonitor::new(
        slot.id,
        target.kind,
        &slot.cancel,
        &sink,
        settings.progress_interval,
        settings.max_warning_samples,
    );

    let payload = match target.kind {
        ScanKind::Aggregate => ScanPayload::Aggregate(aggregate::aggregate(
            &target.root,
            &target.params,
            &mut monitor,
            settings.cancel_check_interval,
        )),
        ScanKind::Duplicates => ScanPayload::Duplicates(duplicates::scan(
            target,
            &inner.classifier,
            &inner.config.duplicates,
            &mut monitor,
        )),
        ScanKind::LargeFiles => {
            ScanPayload::LargeFiles(large::scan(target, &inner.classifier, &mut monitor))
        }
    };

    let summary = monitor.finish();
    ScanResult {
        id: slot.id,
        kind: target.kind,
        root: target.root.clone(),
        outcome: if summary.cancelled {
            ScanOutcome::Cancelled
        } else {
            ScanOutcome::Completed
        },
        payload,
        warnings: summary.warnings,
        files_examined: summary.files_examined,
        elapsed: summary.elapsed,
    }
}

fn failed_result(
    slot: &ScanSlot,
    target: &ScanTarget,
    failure: ScanFailure,
    elapsed: Duration,
) -> ScanResult {
    ScanResult {
        id: slot.id,
        kind: target.kind,
        root: target.root.clone(),
        outcome: ScanOutcome::Failed(failure),
        payload: ScanPayload::empty(target.kind, &target.root),
        warnings: WarningSummary::default(),
        files_examined: 0,
        elapsed,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_events::ScanPhase;
    use crate::size::LargeFileThreshold;
    use std::fs::File;

    fn coordinator() -> ScanCoordinator {
        ScanCoordinator::new(Config::default())
    }

    /// Observer that parks the worker on its first `Started` event until the
    /// returned sender is used or dropped.
    fn gate() -> (Sender<()>, impl Fn(&ScanEvent) + Send + Sync + 'static) {
        let (tx, rx) = mpsc::channel::<()>();
        let rx = Mutex::new(rx);
        let observer = move |event: &ScanEvent| {
            if matches!(event, ScanEvent::Started { .. }) {
                let _ = rx.lock().unwrap().recv();
            }
        };
        (tx, observer)
    }

    #[test]
    fn test_invalid_targets_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let coord = coordinator();

        let missing = coord.start_scan(ScanTarget::duplicates(dir.path().join("nope")));
        assert!(matches!(missing, Err(ScanError::InvalidTarget { .. })));

        let not_dir = coord.start_scan(ScanTarget::duplicates(&file));
        assert!(matches!(not_dir, Err(ScanError::InvalidTarget { .. })));
        assert!(coord.running_scans().is_empty());
    }

    #[test]
    fn test_unknown_scan_id() {
        let coord = coordinator();
        assert!(matches!(coord.cancel_scan(ScanId(99)), Err(ScanError::UnknownScan(_))));
        assert!(matches!(coord.state(ScanId(99)), Err(ScanError::UnknownScan(_))));
        assert!(matches!(coord.try_result(ScanId(99)), Err(ScanError::UnknownScan(_))));
    }

    #[test]
    fn test_same_kind_same_root_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();
        let (release, observer) = gate();

        let first = coord
            .start_scan_observed(ScanTarget::duplicates(dir.path()), observer)
            .unwrap();
        let second = coord.start_scan(ScanTarget::duplicates(dir.path()));
        assert!(matches!(second, Err(ScanError::AlreadyRunning { .. })));

        // a different kind on the same root is fine
        let large = coord
            .start_scan(ScanTarget::large_files(dir.path(), LargeFileThreshold::Mb100))
            .unwrap();

        drop(release);
        assert_eq!(coord.get_result(first).unwrap().state(), ScanState::Completed);
        assert_eq!(coord.get_result(large).unwrap().state(), ScanState::Completed);

        // the slot is free again once the first scan is done
        let again = coord.start_scan(ScanTarget::duplicates(dir.path())).unwrap();
        assert!(coord.get_result(again).unwrap().is_complete());
    }

    #[test]
    fn test_cancel_is_idempotent_and_yields_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("f{}.bin", i)), vec![1u8; 64]).unwrap();
        }
        let coord = coordinator();
        let (release, observer) = gate();

        let id = coord
            .start_scan_observed(ScanTarget::duplicates(dir.path()), observer)
            .unwrap();
        assert_eq!(coord.running_scans(), vec![id]);
        coord.cancel_scan(id).unwrap();
        coord.cancel_scan(id).unwrap();
        drop(release);

        let result = coord.get_result(id).unwrap();
        assert_eq!(result.state(), ScanState::Cancelled);
        assert!(result.payload.as_duplicates().is_some());
        assert_eq!(result.files_examined, 0);

        // cancelling a finished scan is a no-op
        coord.cancel_scan(id).unwrap();
        assert_eq!(coord.state(id).unwrap(), ScanState::Cancelled);
    }

    #[test]
    fn test_root_vanishing_before_walk_fails_scan() {
        let holder = tempfile::tempdir().unwrap();
        let root = holder.path().join("gone");
        fs::create_dir(&root).unwrap();
        let coord = coordinator();
        let (release, observer) = gate();

        let id = coord
            .start_scan_observed(ScanTarget::aggregate(&root), observer)
            .unwrap();
        fs::remove_dir(&root).unwrap();
        drop(release);

        let result = coord.get_result(id).unwrap();
        assert_eq!(
            result.outcome,
            ScanOutcome::Failed(ScanFailure::RootVanished(root.clone()))
        );
        assert!(result.payload.as_aggregate().is_some());
    }

    #[test]
    fn test_worker_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();

        let id = coord
            .start_scan_observed(ScanTarget::aggregate(dir.path()), |event: &ScanEvent| {
                if matches!(event, ScanEvent::Progress(_)) {
                    panic!("observer blew up");
                }
            })
            .unwrap();

        let result = coord.get_result(id).unwrap();
        match result.outcome {
            ScanOutcome::Failed(ScanFailure::WorkerPanicked(msg)) => {
                assert!(msg.contains("observer blew up"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // other scans still work afterwards
        let ok = coord.start_scan(ScanTarget::aggregate(dir.path())).unwrap();
        assert!(coord.get_result(ok).unwrap().is_complete());
    }

    #[test]
    fn test_panic_on_started_still_finishes_scan() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();

        let id = coord
            .start_scan_observed(ScanTarget::duplicates(dir.path()), |event: &ScanEvent| {
                if matches!(event, ScanEvent::Started { .. }) {
                    panic!("observer failed on start");
                }
            })
            .unwrap();

        let result = coord
            .get_result_timeout(id, Duration::from_secs(10))
            .unwrap()
            .expect("scan should reach a terminal state");
        assert!(matches!(
            result.outcome,
            ScanOutcome::Failed(ScanFailure::WorkerPanicked(_))
        ));
        assert_eq!(coord.state(id).unwrap(), ScanState::Failed);
        assert!(coord.running_scans().is_empty());

        // the (kind, root) key was released
        let again = coord.start_scan(ScanTarget::duplicates(dir.path())).unwrap();
        assert!(coord.get_result(again).unwrap().is_complete());
    }

    #[test]
    fn test_panic_on_finished_keeps_result_and_closes_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();
        let (release, rx) = mpsc::channel::<()>();
        let rx = Mutex::new(rx);

        let id = coord
            .start_scan_observed(ScanTarget::aggregate(dir.path()), move |event: &ScanEvent| {
                match event {
                    ScanEvent::Started { .. } => {
                        let _ = rx.lock().unwrap().recv();
                    }
                    ScanEvent::Finished { .. } => panic!("observer failed on finish"),
                    _ => {}
                }
            })
            .unwrap();
        let events = coord.subscribe(id).unwrap();
        release.send(()).unwrap();

        assert!(coord.get_result(id).unwrap().is_complete());
        // the channel is closed even though an observer panicked
        let received: Vec<ScanEvent> = events.iter().collect();
        assert!(matches!(received.last(), Some(ScanEvent::Finished { .. })));
    }

    #[test]
    fn test_cancel_during_hashing_yields_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        for (name, byte) in [("a1.bin", 1u8), ("a2.bin", 1), ("b1.bin", 2), ("b2.bin", 2)] {
            fs::write(dir.path().join(name), vec![byte; 8192]).unwrap();
        }
        let mut config = Config::default();
        config.scan.progress_interval = 1;
        let coord = ScanCoordinator::new(config);

        let (hashing_tx, hashing_rx) = mpsc::channel::<()>();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();
        let hashing_tx = Mutex::new(hashing_tx);
        let resume_rx = Mutex::new(resume_rx);
        let paused = AtomicBool::new(false);

        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(1);
        let id = coord
            .start_scan_observed(target, move |event: &ScanEvent| {
                if let ScanEvent::Progress(p) = event {
                    if p.phase == ScanPhase::Hashing
                        && p.files_hashed >= 1
                        && !paused.swap(true, Ordering::SeqCst)
                    {
                        let _ = hashing_tx.lock().unwrap().send(());
                        let _ = resume_rx.lock().unwrap().recv();
                    }
                }
            })
            .unwrap();

        hashing_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        coord.cancel_scan(id).unwrap();
        resume_tx.send(()).unwrap();

        let result = coord.get_result(id).unwrap();
        assert_eq!(result.outcome, ScanOutcome::Cancelled);
        let report = result.payload.as_duplicates().unwrap();
        assert_eq!(report.groups.len(), 1);
        assert!(report.files_hashed < 4);
    }

    #[test]
    fn test_subscribed_events_arrive_in_order() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("big.iso"))
            .unwrap()
            .set_len(200 * 1024 * 1024)
            .unwrap();
        let coord = coordinator();

        let (id, rx) = coord
            .start_scan_subscribed(ScanTarget::large_files(dir.path(), LargeFileThreshold::Mb100))
            .unwrap();
        let events: Vec<ScanEvent> = rx.iter().collect();

        assert!(matches!(events.first(), Some(ScanEvent::Started { .. })));
        assert!(matches!(
            events.last(),
            Some(ScanEvent::Finished {
                state: ScanState::Completed,
                ..
            })
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::LargeFileFound { .. })));
        assert!(events.iter().all(|e| e.scan_id() == id));
        assert_eq!(coord.try_result(id).unwrap().unwrap().payload.as_large_files().unwrap().len(), 1);
    }

    #[test]
    fn test_subscribe_after_finish_gets_closed_channel() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();
        let id = coord.start_scan(ScanTarget::aggregate(dir.path())).unwrap();
        coord.get_result(id).unwrap();

        let rx = coord.subscribe(id).unwrap();
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_get_result_timeout_while_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();
        let (release, observer) = gate();

        let id = coord
            .start_scan_observed(ScanTarget::aggregate(dir.path()), observer)
            .unwrap();
        assert!(coord
            .get_result_timeout(id, Duration::from_millis(20))
            .unwrap()
            .is_none());
        assert_eq!(coord.state(id).unwrap(), ScanState::Running);

        drop(release);
        let result = coord.get_result_timeout(id, Duration::from_secs(30)).unwrap();
        assert!(result.unwrap().is_complete());
    }

    #[test]
    fn test_drop_cancels_running_scans() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator();
        let (release, observer) = gate();
        coord
            .start_scan_observed(ScanTarget::duplicates(dir.path()), observer)
            .unwrap();
        assert_eq!(coord.cancel_all(), 1);
        drop(release);
        drop(coord);
    }
}
