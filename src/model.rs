//! Shared scan records: targets, file records and terminal results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::FolderSummary;
use crate::categories::duplicates::DuplicateReport;
use crate::categories::large::LargeFileEntry;
use crate::classify::{self, Category};
use crate::config::Config;
use crate::error::{ScanFailure, ScanWarning, WarningKind};
use crate::size::LargeFileThreshold;

/// Identifier handed out by the coordinator for every accepted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScanId(pub u64);

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// Size/age aggregation of one folder (cache-folder sizing).
    Aggregate,
    Duplicates,
    LargeFiles,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Aggregate => "folder",
            ScanKind::Duplicates => "duplicate",
            ScanKind::LargeFiles => "large-file",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scan tunables. Copied into the target when the scan is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanParams {
    /// Files smaller than this never take part in duplicate detection.
    pub min_duplicate_size: u64,
    pub large_threshold: LargeFileThreshold,
    /// Files whose mtime is older than this many days are reported as stale.
    pub age_threshold_days: Option<u64>,
    /// Absolute subtrees that are never entered.
    pub excluded_subpaths: Vec<PathBuf>,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ScanParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_duplicate_size: config.duplicates.min_size_bytes,
            large_threshold: config.large_files.default_threshold,
            age_threshold_days: None,
            excluded_subpaths: Vec::new(),
        }
    }

    pub fn is_excluded_subpath(&self, path: &Path) -> bool {
        self.excluded_subpaths.iter().any(|ex| path.starts_with(ex))
    }
}

/// What to scan and how. Immutable once handed to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanTarget {
    pub root: PathBuf,
    pub kind: ScanKind,
    pub params: ScanParams,
}

impl ScanTarget {
    pub fn new(kind: ScanKind, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            kind,
            params: ScanParams::default(),
        }
    }

    pub fn aggregate(root: impl Into<PathBuf>) -> Self {
        Self::new(ScanKind::Aggregate, root)
    }

    pub fn duplicates(root: impl Into<PathBuf>) -> Self {
        Self::new(ScanKind::Duplicates, root)
    }

    pub fn large_files(root: impl Into<PathBuf>, threshold: LargeFileThreshold) -> Self {
        let mut target = Self::new(ScanKind::LargeFiles, root);
        target.params.large_threshold = threshold;
        target
    }

    pub fn with_params(mut self, params: ScanParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_min_duplicate_size(mut self, bytes: u64) -> Self {
        self.params.min_duplicate_size = bytes;
        self
    }

    pub fn with_age_threshold(mut self, days: u64) -> Self {
        self.params.age_threshold_days = Some(days);
        self
    }

    pub fn with_excluded(mut self, path: impl Into<PathBuf>) -> Self {
        self.params.excluded_subpaths.push(path.into());
        self
    }
}

/// A regular file seen during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub category: Category,
}

impl FileRecord {
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let category = classify::classify(&path);
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            category,
            path,
        }
    }

    /// Whole days since the last modification, if known.
    pub fn age_days(&self) -> Option<i64> {
        self.modified
            .map(|m| Utc::now().signed_duration_since(m).num_days().max(0))
    }
}

/// Lifecycle state of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed
        )
    }
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failure", rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    Failed(ScanFailure),
}

impl ScanOutcome {
    pub fn state(&self) -> ScanState {
        match self {
            ScanOutcome::Completed => ScanState::Completed,
            ScanOutcome::Cancelled => ScanState::Cancelled,
            ScanOutcome::Failed(_) => ScanState::Failed,
        }
    }
}

/// Result set of a scan; partial when the scan was cancelled or failed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ScanPayload {
    Aggregate(FolderSummary),
    Duplicates(DuplicateReport),
    LargeFiles(Vec<LargeFileEntry>),
}

impl ScanPayload {
    /// Empty payload of the right shape for `kind`.
    pub fn empty(kind: ScanKind, root: &Path) -> Self {
        match kind {
            ScanKind::Aggregate => ScanPayload::Aggregate(FolderSummary::empty(root)),
            ScanKind::Duplicates => ScanPayload::Duplicates(DuplicateReport::default()),
            ScanKind::LargeFiles => ScanPayload::LargeFiles(Vec::new()),
        }
    }

    pub fn as_duplicates(&self) -> Option<&DuplicateReport> {
        match self {
            ScanPayload::Duplicates(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_large_files(&self) -> Option<&[LargeFileEntry]> {
        match self {
            ScanPayload::LargeFiles(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&FolderSummary> {
        match self {
            ScanPayload::Aggregate(s) => Some(s),
            _ => None,
        }
    }
}

/// Counts of skipped paths plus the first few samples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarningSummary {
    pub access_denied: u64,
    pub vanished: u64,
    pub io_errors: u64,
    pub samples: Vec<ScanWarning>,
    #[serde(skip)]
    max_samples: usize,
}

impl WarningSummary {
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            max_samples,
            ..Default::default()
        }
    }

    pub fn record(&mut self, warning: ScanWarning) {
        match warning.kind {
            WarningKind::AccessDenied => self.access_denied += 1,
            WarningKind::PathVanished => self.vanished += 1,
            WarningKind::Io => self.io_errors += 1,
        }
        if self.samples.len() < self.max_samples {
            self.samples.push(warning);
        }
    }

    pub fn total(&self) -> u64 {
        self.access_denied + self.vanished + self.io_errors
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Terminal record of one scan, returned by `get_result`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub id: ScanId,
    pub kind: ScanKind,
    pub root: PathBuf,
    pub outcome: ScanOutcome,
    pub payload: ScanPayload,
    pub warnings: WarningSummary,
    pub files_examined: u64,
    pub elapsed: Duration,
}

impl ScanResult {
    pub fn state(&self) -> ScanState {
        self.outcome.state()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == ScanOutcome::Completed
    }
}
