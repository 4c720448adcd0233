//! Folder aggregation - total size, file count and age of a directory tree
//!
//! Used to size cache folders. Nothing is hashed; directory reads run in
//! parallel on the rayon pool because order does not matter for sums.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jwalk::WalkDir;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::classify;
use crate::error::{ScanWarning, WarningKind};
use crate::model::ScanParams;
use crate::scan_events::ScanMonitor;

/// Size and age summary of one folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderSummary {
    pub root: PathBuf,
    pub total_size: u64,
    /// Regular files counted
    pub item_count: u64,
    pub dir_count: u64,
    pub oldest_modified: Option<DateTime<Utc>>,
    pub newest_modified: Option<DateTime<Utc>>,
    /// Days since anything in the folder last changed
    pub age_days: Option<i64>,
    pub age_threshold_days: Option<u64>,
    /// Files older than `age_threshold_days`
    pub stale_count: u64,
    pub stale_size: u64,
}

impl FolderSummary {
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            total_size: 0,
            item_count: 0,
            dir_count: 0,
            oldest_modified: None,
            newest_modified: None,
            age_days: None,
            age_threshold_days: None,
            stale_count: 0,
            stale_size: 0,
        }
    }

    fn add_file(&mut self, size: u64, modified: Option<DateTime<Utc>>, cutoff: Option<DateTime<Utc>>) {
        self.total_size += size;
        self.item_count += 1;

        if let Some(m) = modified {
            if self.oldest_modified.map_or(true, |o| m < o) {
                self.oldest_modified = Some(m);
            }
            if self.newest_modified.map_or(true, |n| m > n) {
                self.newest_modified = Some(m);
            }
            if cutoff.is_some_and(|c| m < c) {
                self.stale_count += 1;
                self.stale_size += size;
            }
        }
    }
}

/// Instant before which a file counts as stale, or `None` when `days`
/// reaches past the earliest representable time (nothing can be that old).
fn stale_cutoff(now: DateTime<Utc>, days: u64) -> Option<DateTime<Utc>> {
    let days = i64::try_from(days).ok()?;
    now.checked_sub_signed(ChronoDuration::try_days(days)?)
}

/// Walk `root` and sum every regular file below it.
///
/// Symlinks and junctions are not followed. Unreadable subtrees are skipped
/// and reported to the monitor as warnings. The cancellation flag is checked
/// every `cancel_check_interval` entries; on cancellation the partial totals
/// are returned.
pub fn aggregate(
    root: &Path,
    params: &ScanParams,
    monitor: &mut ScanMonitor<'_>,
    cancel_check_interval: u64,
) -> FolderSummary {
    let mut summary = FolderSummary::empty(root);
    summary.age_threshold_days = params.age_threshold_days;
    let cutoff = params
        .age_threshold_days
        .and_then(|days| stale_cutoff(Utc::now(), days));
    let interval = cancel_check_interval.max(1);

    let excluded = Arc::new(params.excluded_subpaths.clone());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .skip_hidden(false)
        .parallelism(jwalk::Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_secs(1),
        })
        .process_read_dir(move |_depth, _path, _read_dir_state, children| {
            children.retain(|entry| match entry {
                Ok(e) => {
                    let path = e.path();
                    if excluded.iter().any(|ex| path.starts_with(ex)) {
                        return false;
                    }
                    !(e.file_type().is_dir() && classify::is_reparse_point(&path))
                }
                Err(_) => true,
            });
        });

    for (seen, entry) in walker.into_iter().enumerate() {
        if seen as u64 % interval == 0 && monitor.is_cancelled() {
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                monitor.warn(warning_from_jwalk_error(&err));
                continue;
            }
        };
        if entry.depth == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            summary.dir_count += 1;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                summary.add_file(meta.len(), modified, cutoff);
                monitor.file_examined(&path);
            }
            Err(err) => monitor.warn(ScanWarning::from_io(Some(&path), &err)),
        }
    }

    summary.age_days = summary
        .newest_modified
        .map(|n| Utc::now().signed_duration_since(n).num_days().max(0));

    log::debug!(
        "aggregated {}: {} files, {} bytes",
        root.display(),
        summary.item_count,
        summary.total_size
    );
    summary
}

fn warning_from_jwalk_error(err: &jwalk::Error) -> ScanWarning {
    match err.io_error() {
        Some(io) => ScanWarning::from_io(err.path(), io),
        None => ScanWarning {
            kind: WarningKind::Io,
            path: err.path().map(Path::to_path_buf),
            message: err.to_string(),
        },
    }
}
