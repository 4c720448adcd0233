use serde::Serialize;

use crate::classify::PathClassifier;
use crate::model::{FileRecord, ScanTarget};
use crate::scan_events::ScanMonitor;
use crate::size::LargeFileThreshold;
use crate::walk::{walk_files, WalkEntry};

/// A file at or above the requested threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargeFileEntry {
    #[serde(flatten)]
    pub record: FileRecord,
    /// Highest fixed threshold the file reaches
    pub bucket: LargeFileThreshold,
}

impl LargeFileEntry {
    pub fn new(record: FileRecord, requested: LargeFileThreshold) -> Self {
        let bucket = LargeFileThreshold::bucket_for(record.size).unwrap_or(requested);
        Self { record, bucket }
    }

    pub fn size(&self) -> u64 {
        self.record.size
    }
}

/// Scan for files of at least `target.params.large_threshold` bytes
///
/// Files are reported to the monitor and returned in discovery order; sorting
/// for display is left to the caller (see [`sort_by_size_desc`]). Cancellation
/// is checked before every entry.
pub fn scan(
    target: &ScanTarget,
    classifier: &PathClassifier,
    monitor: &mut ScanMonitor<'_>,
) -> Vec<LargeFileEntry> {
    let threshold = target.params.large_threshold;
    let min_size = threshold.bytes();
    let mut found = Vec::new();

    for entry in walk_files(&target.root, classifier, &target.params) {
        if monitor.is_cancelled() {
            break;
        }
        match entry {
            WalkEntry::Directory(_) => {}
            WalkEntry::Warning(warning) => monitor.warn(warning),
            WalkEntry::File(record) => {
                monitor.file_examined(&record.path);
                if record.size < min_size {
                    continue;
                }
                let large = LargeFileEntry::new(record, threshold);
                monitor.large_file_found(large.clone());
                found.push(large);
            }
        }
    }

    log::debug!(
        "{}: {} files >= {}",
        monitor.scan_id(),
        found.len(),
        threshold
    );
    found
}

/// Sort by size descending (biggest first)
pub fn sort_by_size_desc(entries: &mut [LargeFileEntry]) {
    entries.sort_by(|a, b| b.size().cmp(&a.size()));
}

pub fn total_size(entries: &[LargeFileEntry]) -> u64 {
    entries.iter().map(LargeFileEntry::size).sum()
}
