use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::model::ScanKind;
use crate::scan_events::{ScanPhase, ScanProgress};
use crate::spinner;

/// Create a spinner for indeterminate progress
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars(&spinner::spinner_chars())
        .template("{spinner:.cyan} {prefix:.bold} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One spinner per running scan, stacked under a shared `MultiProgress`
pub struct ScanSpinners {
    multi: MultiProgress,
    hidden: bool,
}

impl ScanSpinners {
    pub fn new(hidden: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            hidden,
        }
    }

    pub fn add(&self, kind: ScanKind) -> ProgressBar {
        if self.hidden {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(create_spinner("starting"));
        pb.set_prefix(kind.to_string());
        pb
    }
}

/// Spinner message for a progress snapshot
pub fn describe(progress: &ScanProgress) -> String {
    let phase = match progress.phase {
        ScanPhase::Walking => "scanning",
        ScanPhase::Hashing => "hashing",
        ScanPhase::Finished => "done",
    };
    let mut msg = format!(
        "{} - {} files, {} found",
        phase, progress.files_examined, progress.items_found
    );
    if progress.files_hashed > 0 {
        msg.push_str(&format!(", {} hashed", progress.files_hashed));
    }
    if progress.cancel_observed {
        msg.push_str(" (cancelling)");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanId;

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner("Test spinner");
        assert!(!pb.is_finished());
        pb.finish();
        assert!(pb.is_finished());
    }

    #[test]
    fn test_describe_progress() {
        let progress = ScanProgress {
            scan_id: ScanId(1),
            kind: ScanKind::Duplicates,
            phase: ScanPhase::Hashing,
            files_examined: 100,
            files_hashed: 4,
            items_found: 2,
            current_path: None,
            elapsed: Duration::from_secs(1),
            cancel_observed: false,
        };
        assert_eq!(describe(&progress), "hashing - 100 files, 2 found, 4 hashed");
    }
}
