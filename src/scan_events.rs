//! Progress events emitted during scanning
//!
//! Every scan owns one [`ScanMonitor`]. The detectors report each examined
//! file to it; the monitor throttles progress snapshots to one every
//! `progress_interval` files and forwards partial results and warnings to the
//! scan's subscribers as they are found.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::categories::duplicates::DuplicateGroup;
use crate::categories::large::LargeFileEntry;
use crate::error::ScanWarning;
use crate::model::{ScanId, ScanKind, ScanState, WarningSummary};

/// Which part of a scan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Walking,
    Hashing,
    Finished,
}

/// Snapshot of a running scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub kind: ScanKind,
    pub phase: ScanPhase,
    pub files_examined: u64,
    pub files_hashed: u64,
    /// Duplicate groups or large files found so far
    pub items_found: u64,
    pub current_path: Option<PathBuf>,
    pub elapsed: Duration,
    pub cancel_observed: bool,
}

/// Real-time updates delivered to scan subscribers, in discovery order.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started {
        scan_id: ScanId,
        kind: ScanKind,
        root: PathBuf,
    },

    Progress(ScanProgress),

    DuplicateGroupFound {
        scan_id: ScanId,
        group: DuplicateGroup,
    },

    LargeFileFound {
        scan_id: ScanId,
        entry: LargeFileEntry,
    },

    Warning {
        scan_id: ScanId,
        warning: ScanWarning,
    },

    Finished {
        scan_id: ScanId,
        state: ScanState,
    },
}

impl ScanEvent {
    pub fn scan_id(&self) -> ScanId {
        match self {
            ScanEvent::Started { scan_id, .. }
            | ScanEvent::DuplicateGroupFound { scan_id, .. }
            | ScanEvent::LargeFileFound { scan_id, .. }
            | ScanEvent::Warning { scan_id, .. }
            | ScanEvent::Finished { scan_id, .. } => *scan_id,
            ScanEvent::Progress(p) => p.scan_id,
        }
    }
}

/// Per-scan reporting state handed to the detectors.
pub struct ScanMonitor<'a> {
    scan_id: ScanId,
    kind: ScanKind,
    cancel: &'a AtomicBool,
    sink: &'a (dyn Fn(ScanEvent) + Sync),
    progress_interval: u64,
    started: Instant,
    phase: ScanPhase,
    files_examined: u64,
    files_hashed: u64,
    items_found: u64,
    last_emitted: u64,
    current_path: Option<PathBuf>,
    cancel_observed: bool,
    warnings: WarningSummary,
}

impl<'a> ScanMonitor<'a> {
    pub fn new(
        scan_id: ScanId,
        kind: ScanKind,
        cancel: &'a AtomicBool,
        sink: &'a (dyn Fn(ScanEvent) + Sync),
        progress_interval: u64,
        max_warning_samples: usize,
    ) -> Self {
        Self {
            scan_id,
            kind,
            cancel,
            sink,
            progress_interval: progress_interval.max(1),
            started: Instant::now(),
            phase: ScanPhase::Walking,
            files_examined: 0,
            files_hashed: 0,
            items_found: 0,
            last_emitted: 0,
            current_path: None,
            cancel_observed: false,
            warnings: WarningSummary::with_capacity(max_warning_samples),
        }
    }

    pub fn scan_id(&self) -> ScanId {
        self.scan_id
    }

    /// Flag shared with worker threads that must stop starting new work.
    pub fn cancel_flag(&self) -> &'a AtomicBool {
        self.cancel
    }

    /// Check the cancellation flag, remembering that it was seen.
    pub fn is_cancelled(&mut self) -> bool {
        if !self.cancel_observed && self.cancel.load(Ordering::Relaxed) {
            self.cancel_observed = true;
            log::debug!("{} observed cancellation after {} files", self.scan_id, self.files_examined);
        }
        self.cancel_observed
    }

    pub fn cancel_observed(&self) -> bool {
        self.cancel_observed
    }

    pub fn files_examined(&self) -> u64 {
        self.files_examined
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn set_phase(&mut self, phase: ScanPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit_progress_now();
        }
    }

    pub fn files_hashed(&self) -> u64 {
        self.files_hashed
    }

    /// Count one examined file, emitting a snapshot every `progress_interval` files.
    pub fn file_examined(&mut self, path: &Path) {
        self.files_examined += 1;
        self.maybe_emit(path);
    }

    /// Count one hashed file; shares the throttle with `file_examined`.
    pub fn file_hashed(&mut self, path: &Path) {
        self.files_hashed += 1;
        self.maybe_emit(path);
    }

    fn work_done(&self) -> u64 {
        self.files_examined + self.files_hashed
    }

    fn maybe_emit(&mut self, path: &Path) {
        if self.work_done() - self.last_emitted >= self.progress_interval {
            self.current_path = Some(path.to_path_buf());
            self.emit_progress_now();
        }
    }

    pub fn emit_progress_now(&mut self) {
        self.last_emitted = self.work_done();
        let snapshot = self.snapshot();
        (self.sink)(ScanEvent::Progress(snapshot));
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            scan_id: self.scan_id,
            kind: self.kind,
            phase: self.phase,
            files_examined: self.files_examined,
            files_hashed: self.files_hashed,
            items_found: self.items_found,
            current_path: self.current_path.clone(),
            elapsed: self.elapsed(),
            cancel_observed: self.cancel_observed,
        }
    }

    pub fn warn(&mut self, warning: ScanWarning) {
        log::debug!(
            "{}: skipped {}: {}",
            self.scan_id,
            warning
                .path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            warning.message
        );
        self.warnings.record(warning.clone());
        (self.sink)(ScanEvent::Warning {
            scan_id: self.scan_id,
            warning,
        });
    }

    pub fn duplicate_group_found(&mut self, group: DuplicateGroup) {
        self.items_found += 1;
        (self.sink)(ScanEvent::DuplicateGroupFound {
            scan_id: self.scan_id,
            group,
        });
    }

    pub fn large_file_found(&mut self, entry: LargeFileEntry) {
        self.items_found += 1;
        (self.sink)(ScanEvent::LargeFileFound {
            scan_id: self.scan_id,
            entry,
        });
    }

    /// Emit the final snapshot and hand back the warnings collected.
    ///
    /// `cancelled` is only true if a detector actually saw the flag; a cancel
    /// that arrives after the last entry leaves the result complete.
    pub fn finish(mut self) -> MonitorSummary {
        self.phase = ScanPhase::Finished;
        self.current_path = None;
        self.emit_progress_now();
        MonitorSummary {
            files_examined: self.files_examined,
            files_hashed: self.files_hashed,
            elapsed: self.elapsed(),
            cancelled: self.cancel_observed,
            warnings: self.warnings,
        }
    }
}

/// What a monitor accumulated over one scan.
#[derive(Debug, Clone)]
pub struct MonitorSummary {
    pub files_examined: u64,
    pub files_hashed: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub warnings: WarningSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarningKind;
    use std::sync::Mutex;

    fn collect_monitor<'a>(
        cancel: &'a AtomicBool,
        sink: &'a (dyn Fn(ScanEvent) + Sync),
    ) -> ScanMonitor<'a> {
        ScanMonitor::new(ScanId(1), ScanKind::LargeFiles, cancel, sink, 25, 10)
    }

    #[test]
    fn test_progress_is_throttled_by_count() {
        let events = Mutex::new(Vec::new());
        let sink = |e: ScanEvent| events.lock().unwrap().push(e);
        let cancel = AtomicBool::new(false);
        let mut monitor = collect_monitor(&cancel, &sink);

        for i in 0..100 {
            monitor.file_examined(Path::new(&format!("/f{}", i)));
        }
        let summary = monitor.finish();

        let events = events.into_inner().unwrap();
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        // 4 throttled snapshots plus the final one
        assert_eq!(progress.len(), 5);
        assert_eq!(progress[0].files_examined, 25);
        assert_eq!(progress[0].current_path.as_deref(), Some(Path::new("/f24")));
        assert_eq!(progress.last().unwrap().phase, ScanPhase::Finished);
        assert_eq!(summary.files_examined, 100);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_cancel_is_sticky_and_reported() {
        let sink = |_e: ScanEvent| {};
        let cancel = AtomicBool::new(false);
        let mut monitor = collect_monitor(&cancel, &sink);

        assert!(!monitor.is_cancelled());
        cancel.store(true, Ordering::Relaxed);
        assert!(monitor.is_cancelled());
        assert!(monitor.snapshot().cancel_observed);
        assert!(monitor.finish().cancelled);
    }

    #[test]
    fn test_warnings_are_counted_and_forwarded() {
        let events = Mutex::new(Vec::new());
        let sink = |e: ScanEvent| events.lock().unwrap().push(e);
        let cancel = AtomicBool::new(false);
        let mut monitor = collect_monitor(&cancel, &sink);

        monitor.warn(ScanWarning {
            kind: WarningKind::AccessDenied,
            path: Some(PathBuf::from("/locked")),
            message: "denied".into(),
        });
        let summary = monitor.finish();

        assert_eq!(summary.warnings.access_denied, 1);
        assert!(events
            .into_inner()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ScanEvent::Warning { .. })));
    }
}
