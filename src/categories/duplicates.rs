use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classify::PathClassifier;
use crate::config::{Config, DuplicatesConfig};
use crate::error::{Result, ScanError};
use crate::hasher::{self, HashOutcome};
use crate::model::{FileRecord, ScanId, ScanKind, ScanTarget};
use crate::scan_events::{ScanEvent, ScanMonitor, ScanPhase};
use crate::walk::{walk_files, WalkEntry};

/// Files with identical size and content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub digest: String,
    /// Size of each member
    pub size: u64,
    /// Members in discovery order
    pub files: Vec<FileRecord>,
    pub total_size: u64,
    /// Space freed by keeping a single copy
    pub wasted_space: u64,
}

impl DuplicateGroup {
    /// Build a group, refusing fewer than two members or mixed sizes.
    pub fn new(digest: String, files: Vec<FileRecord>) -> Option<Self> {
        let size = files.first()?.size;
        if files.len() < 2 || files.iter().any(|f| f.size != size) {
            return None;
        }
        let count = files.len() as u64;
        Some(Self {
            digest,
            size,
            total_size: size * count,
            wasted_space: size * (count - 1),
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Most recently modified member; the dashboard's "keep newest".
    pub fn newest(&self) -> Option<&FileRecord> {
        self.files.iter().filter(|f| f.modified.is_some()).max_by_key(|f| f.modified)
    }

    pub fn oldest(&self) -> Option<&FileRecord> {
        self.files.iter().filter(|f| f.modified.is_some()).min_by_key(|f| f.modified)
    }
}

/// Result for duplicate file detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    /// Size of all duplicates minus one copy each
    pub total_wasted: u64,
    pub files_hashed: u64,
}

impl DuplicateReport {
    fn push(&mut self, group: DuplicateGroup) {
        self.total_wasted += group.wasted_space;
        self.groups.push(group);
    }

    /// Get total items count
    pub fn items(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::len).sum()
    }
}

/// Scan for duplicate files
///
/// Uses a three-pass approach:
/// 1. Group files by size (files with unique sizes cannot be duplicates)
/// 2. For size groups > 1, compare a hash of the first few KB (optional)
/// 3. For prefix matches, compute the full hash
///
/// Groups are reported to the monitor as soon as their size bucket is done.
/// The minimum size comes from the target; hashing settings from `settings`.
pub fn scan(
    target: &ScanTarget,
    classifier: &PathClassifier,
    settings: &DuplicatesConfig,
    monitor: &mut ScanMonitor<'_>,
) -> DuplicateReport {
    let mut report = DuplicateReport::default();
    let min_size = target.params.min_duplicate_size.max(1);

    // Pass 1: size buckets, in order of first discovery
    let mut order: Vec<u64> = Vec::new();
    let mut by_size: HashMap<u64, Vec<FileRecord>> = HashMap::new();

    for entry in walk_files(&target.root, classifier, &target.params) {
        if monitor.is_cancelled() {
            return report;
        }
        match entry {
            WalkEntry::Directory(_) => {}
            WalkEntry::Warning(warning) => monitor.warn(warning),
            WalkEntry::File(record) => {
                monitor.file_examined(&record.path);
                if record.size < min_size {
                    continue;
                }
                by_size
                    .entry(record.size)
                    .or_insert_with(|| {
                        order.push(record.size);
                        Vec::new()
                    })
                    .push(record);
            }
        }
    }

    monitor.set_phase(ScanPhase::Hashing);
    let cancel = monitor.cancel_flag();

    for size in order {
        let Some(bucket) = by_size.remove(&size) else {
            continue;
        };
        if bucket.len() < 2 {
            continue;
        }
        if monitor.is_cancelled() {
            break;
        }

        let candidates = if settings.prefix_hash && size > settings.prefix_hash_bytes as u64 {
            split_by_prefix(bucket, settings.prefix_hash_bytes, cancel, monitor)
        } else {
            vec![bucket]
        };

        for candidate in candidates {
            if monitor.is_cancelled() {
                break;
            }
            for group in hash_bucket(candidate, min_size, settings.buffer_size_bytes, cancel, monitor, &mut report) {
                monitor.duplicate_group_found(group.clone());
                report.push(group);
            }
        }
    }

    log::debug!(
        "{}: {} duplicate groups, {} files hashed",
        monitor.scan_id(),
        report.groups.len(),
        report.files_hashed
    );
    report
}

/// Hash every member of `bucket` in parallel and split by digest.
///
/// Members not yet started or still being read when cancellation is seen
/// are left out; members that fail to read become warnings.
fn hash_bucket(
    bucket: Vec<FileRecord>,
    min_size: u64,
    buffer_size: usize,
    cancel: &AtomicBool,
    monitor: &mut ScanMonitor<'_>,
    report: &mut DuplicateReport,
) -> Vec<DuplicateGroup> {
    let outcomes: Vec<Option<Result<HashOutcome>>> = bucket
        .par_iter()
        .map(|record| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            Some(hasher::hash_file_cancellable(&record.path, min_size, buffer_size, cancel))
        })
        .collect();

    if outcomes
        .iter()
        .any(|o| matches!(o, None | Some(Err(ScanError::Cancelled))))
    {
        // Skipped or abandoned members mean the flag was set; record it on the monitor.
        monitor.is_cancelled();
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut by_digest: Vec<(String, Vec<FileRecord>)> = Vec::new();

    for (record, outcome) in bucket.into_iter().zip(outcomes) {
        match outcome {
            None => {}
            Some(Ok(HashOutcome::Digest(digest))) => {
                report.files_hashed += 1;
                monitor.file_hashed(&record.path);
                let slot = *index.entry(digest.clone()).or_insert_with(|| {
                    by_digest.push((digest, Vec::new()));
                    by_digest.len() - 1
                });
                by_digest[slot].1.push(record);
            }
            Some(Ok(HashOutcome::SkippedTooSmall { size })) => {
                log::debug!("{} shrank to {} bytes, skipped", record.path.display(), size);
            }
            Some(Err(err)) => {
                if let Some(warning) = err.into_warning() {
                    monitor.warn(warning);
                }
            }
        }
    }

    by_digest
        .into_iter()
        .filter_map(|(digest, files)| DuplicateGroup::new(digest, files))
        .collect()
}

/// Split a same-size bucket by a hash of the first `len` bytes, keeping
/// only sub-buckets that can still hold duplicates.
fn split_by_prefix(
    bucket: Vec<FileRecord>,
    len: usize,
    cancel: &AtomicBool,
    monitor: &mut ScanMonitor<'_>,
) -> Vec<Vec<FileRecord>> {
    let prefixes: Vec<Option<Result<String>>> = bucket
        .par_iter()
        .map(|record| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            Some(hasher::prefix_hash(&record.path, len))
        })
        .collect();

    if prefixes.iter().any(Option::is_none) {
        monitor.is_cancelled();
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut split: Vec<Vec<FileRecord>> = Vec::new();

    for (record, prefix) in bucket.into_iter().zip(prefixes) {
        match prefix {
            None => {}
            Some(Ok(prefix)) => {
                let slot = *index.entry(prefix).or_insert_with(|| {
                    split.push(Vec::new());
                    split.len() - 1
                });
                split[slot].push(record);
            }
            Some(Err(err)) => {
                if let Some(warning) = err.into_warning() {
                    monitor.warn(warning);
                }
            }
        }
    }

    split.retain(|members| members.len() > 1);
    split
}

/// Run a detached duplicate scan with `config`, without a coordinator.
pub fn find_duplicates(root: &Path, config: &Config) -> DuplicateReport {
    let target = ScanTarget::duplicates(root).with_min_duplicate_size(config.duplicates.min_size_bytes);
    let classifier = PathClassifier::from_config(config);
    let cancel = AtomicBool::new(false);
    let sink = |_event: ScanEvent| {};
    let mut monitor = ScanMonitor::new(
        ScanId(0),
        ScanKind::Duplicates,
        &cancel,
        &sink,
        config.scan.progress_interval,
        config.scan.max_warning_samples,
    );
    let report = scan(&target, &classifier, &config.duplicates, &mut monitor);
    monitor.finish();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const MB: usize = 1024 * 1024;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size,
            modified: None,
            category: crate::classify::Category::Other,
        }
    }

    fn run(target: &ScanTarget, settings: &DuplicatesConfig) -> (DuplicateReport, Vec<ScanEvent>) {
        let events = Mutex::new(Vec::new());
        let sink = |e: ScanEvent| events.lock().unwrap().push(e);
        let cancel = AtomicBool::new(false);
        let mut monitor = ScanMonitor::new(ScanId(1), ScanKind::Duplicates, &cancel, &sink, 25, 10);
        let report = scan(target, &PathClassifier::default(), settings, &mut monitor);
        monitor.finish();
        (report, events.into_inner().unwrap())
    }

    #[test]
    fn test_group_requires_two_members_of_equal_size() {
        assert!(DuplicateGroup::new("d".into(), vec![record("/a", 10)]).is_none());
        assert!(DuplicateGroup::new("d".into(), vec![]).is_none());
        assert!(DuplicateGroup::new("d".into(), vec![record("/a", 10), record("/b", 11)]).is_none());

        let group =
            DuplicateGroup::new("d".into(), vec![record("/a", 10), record("/b", 10), record("/c", 10)])
                .unwrap();
        assert_eq!(group.total_size, 30);
        assert_eq!(group.wasted_space, 20);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_finds_identical_pair_and_ignores_same_size_different_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![1u8; 2 * MB]).unwrap();
        fs::write(dir.path().join("b.bin"), vec![1u8; 2 * MB]).unwrap();
        let mut other = vec![1u8; 2 * MB];
        other[MB] = 9;
        fs::write(dir.path().join("c.bin"), other).unwrap();

        for prefix_hash in [true, false] {
            let settings = DuplicatesConfig {
                prefix_hash,
                ..DuplicatesConfig::default()
            };
            let (report, events) = run(&ScanTarget::duplicates(dir.path()), &settings);

            assert_eq!(report.groups.len(), 1);
            let group = &report.groups[0];
            let paths: Vec<_> = group.files.iter().map(|f| f.path.clone()).collect();
            assert_eq!(paths, vec![dir.path().join("a.bin"), dir.path().join("b.bin")]);
            assert_eq!(group.wasted_space, 2 * MB as u64);
            assert_eq!(report.total_wasted, 2 * MB as u64);
            assert_eq!(report.files_hashed, 3);
            assert_eq!(
                events
                    .iter()
                    .filter(|e| matches!(e, ScanEvent::DuplicateGroupFound { .. }))
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_files_below_min_size_never_grouped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("small1.txt"), "same content").unwrap();
        fs::write(dir.path().join("small2.txt"), "same content").unwrap();

        let (report, _) = run(&ScanTarget::duplicates(dir.path()), &DuplicatesConfig::default());
        assert!(report.groups.is_empty());
        assert_eq!(report.files_hashed, 0);

        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(1);
        let (report, _) = run(&target, &DuplicatesConfig::default());
        assert_eq!(report.groups.len(), 1);
    }

    #[test]
    fn test_empty_files_are_not_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("e1"), "").unwrap();
        fs::write(dir.path().join("e2"), "").unwrap();

        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(0);
        let (report, _) = run(&target, &DuplicatesConfig::default());
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_groups_follow_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        // size 300 bucket is discovered first ("a..."), then size 200
        fs::write(dir.path().join("a1.bin"), vec![3u8; 300]).unwrap();
        fs::write(dir.path().join("b1.bin"), vec![2u8; 200]).unwrap();
        fs::write(dir.path().join("c1.bin"), vec![3u8; 300]).unwrap();
        fs::write(dir.path().join("d1.bin"), vec![2u8; 200]).unwrap();

        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(1);
        let (report, _) = run(&target, &DuplicatesConfig::default());
        let sizes: Vec<u64> = report.groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![300, 200]);
    }

    #[test]
    fn test_pre_cancelled_scan_hashes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![1u8; 4096]).unwrap();
        fs::write(dir.path().join("b.bin"), vec![1u8; 4096]).unwrap();

        let sink = |_e: ScanEvent| {};
        let cancel = AtomicBool::new(true);
        let mut monitor = ScanMonitor::new(ScanId(2), ScanKind::Duplicates, &cancel, &sink, 25, 10);
        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(1);
        let report = scan(&target, &PathClassifier::default(), &DuplicatesConfig::default(), &mut monitor);

        assert!(monitor.finish().cancelled);
        assert!(report.groups.is_empty());
        assert_eq!(report.files_hashed, 0);
    }

    #[test]
    fn test_cancel_while_hashing_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a1.bin"), vec![1u8; 8192]).unwrap();
        fs::write(dir.path().join("a2.bin"), vec![1u8; 8192]).unwrap();
        fs::write(dir.path().join("b1.bin"), vec![2u8; 8192]).unwrap();
        fs::write(dir.path().join("b2.bin"), vec![2u8; 8192]).unwrap();

        let cancel = AtomicBool::new(false);
        let sink = |e: ScanEvent| {
            if let ScanEvent::Progress(p) = &e {
                if p.files_hashed >= 1 {
                    cancel.store(true, Ordering::Relaxed);
                }
            }
        };
        let mut monitor = ScanMonitor::new(ScanId(3), ScanKind::Duplicates, &cancel, &sink, 1, 10);
        let target = ScanTarget::duplicates(dir.path()).with_min_duplicate_size(1);
        let report = scan(&target, &PathClassifier::default(), &DuplicatesConfig::default(), &mut monitor);

        // the "a" pair was already hashed, the "b" pair never started
        assert!(monitor.finish().cancelled);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.files_hashed, 2);
    }

    #[test]
    fn test_find_duplicates_uses_config_min_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.dat"), vec![5u8; 8192]).unwrap();
        fs::write(dir.path().join("y.dat"), vec![5u8; 8192]).unwrap();

        let mut config = Config::default();
        assert!(find_duplicates(dir.path(), &config).groups.is_empty());

        config.duplicates.min_size_bytes = 4096;
        let report = find_duplicates(dir.path(), &config);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.items(), 2);
    }
}
