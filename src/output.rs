use serde::Serialize;
use std::path::Path;

use crate::aggregate::FolderSummary;
use crate::categories::duplicates::DuplicateReport;
use crate::categories::large::{self, LargeFileEntry};
use crate::model::{ScanOutcome, ScanPayload, ScanResult};
use crate::theme::Theme;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,       // Only errors
    Normal,      // Standard output
    Verbose,     // More details
    VeryVerbose, // Every item and every skipped path
}

impl OutputMode {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            OutputMode::Quiet
        } else if verbose >= 2 {
            OutputMode::VeryVerbose
        } else if verbose == 1 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    /// How many rows of a list to print
    fn row_limit(&self) -> usize {
        match self {
            OutputMode::Quiet => 0,
            OutputMode::Normal => 10,
            OutputMode::Verbose | OutputMode::VeryVerbose => usize::MAX,
        }
    }
}

/// Human-readable size in binary units (e.g. "1.5 GiB")
pub fn size_human(bytes: u64) -> String {
    bytesize::to_string(bytes, false)
}

pub fn print_human(results: &[ScanResult], mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    for result in results {
        print_result(result, mode);
    }
}

pub fn print_result(result: &ScanResult, mode: OutputMode) {
    println!();
    println!(
        "{}",
        Theme::header(&format!("{} scan of {}", capitalize(result.kind.as_str()), result.root.display()))
    );
    println!("{}", Theme::divider_bold(60));

    match &result.payload {
        ScanPayload::Duplicates(report) => print_duplicates(report, mode),
        ScanPayload::LargeFiles(entries) => print_large_files(entries, mode),
        ScanPayload::Aggregate(summary) => print_folder(summary),
    }

    println!("{}", Theme::divider(60));
    let status = match &result.outcome {
        ScanOutcome::Completed => Theme::success("completed"),
        ScanOutcome::Cancelled => Theme::warning("cancelled (partial results)"),
        ScanOutcome::Failed(failure) => Theme::error(&format!("failed: {}", failure)),
    };
    println!(
        "  {} {} files in {:.1}s, {}",
        Theme::muted("→"),
        format_number(result.files_examined),
        result.elapsed.as_secs_f64(),
        status
    );

    if !result.warnings.is_empty() {
        println!(
            "  {} skipped {} paths ({} access denied, {} vanished, {} other)",
            Theme::warning("!"),
            result.warnings.total(),
            result.warnings.access_denied,
            result.warnings.vanished,
            result.warnings.io_errors
        );
        if mode == OutputMode::VeryVerbose {
            for warning in &result.warnings.samples {
                let path = warning
                    .path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("      {} {} ({})", Theme::muted("•"), path, warning.message);
            }
        }
    }
}

fn print_duplicates(report: &DuplicateReport, mode: OutputMode) {
    if report.groups.is_empty() {
        println!("  No duplicate files found.");
        return;
    }
    println!(
        "  {} groups, {} files, {} reclaimable",
        format_number(report.groups.len() as u64),
        format_number(report.items() as u64),
        Theme::size(&size_human(report.total_wasted))
    );
    println!();

    let limit = mode.row_limit();
    for (i, group) in report.groups.iter().take(limit).enumerate() {
        println!(
            "  {} {} x {} ({} wasted) {}",
            Theme::primary(&format!("#{}", i + 1)),
            group.len(),
            Theme::size(&size_human(group.size)),
            size_human(group.wasted_space),
            Theme::muted(&group.digest[..group.digest.len().min(12)])
        );
        for file in &group.files {
            println!("      {} {}", Theme::muted("•"), file.path.display());
        }
    }
    if report.groups.len() > limit {
        println!(
            "  {} ... and {} more groups (use -v to see all)",
            Theme::muted("→"),
            report.groups.len() - limit
        );
    }
}

fn print_large_files(entries: &[LargeFileEntry], mode: OutputMode) {
    if entries.is_empty() {
        println!("  No large files found.");
        return;
    }
    println!(
        "  {} files, {} total",
        format_number(entries.len() as u64),
        Theme::size(&size_human(large::total_size(entries)))
    );
    println!();

    let mut sorted = entries.to_vec();
    large::sort_by_size_desc(&mut sorted);

    let limit = mode.row_limit();
    for entry in sorted.iter().take(limit) {
        let age = entry
            .record
            .age_days()
            .map(|d| format!("{}d", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {:>10} {:>6}  {}",
            Theme::category(entry.record.category),
            Theme::size(&size_human(entry.size())),
            Theme::muted(&age),
            entry.record.path.display()
        );
    }
    if sorted.len() > limit {
        println!(
            "  {} ... and {} more (use -v to see all)",
            Theme::muted("→"),
            sorted.len() - limit
        );
    }
}

fn print_folder(summary: &FolderSummary) {
    println!("  Size:     {}", Theme::size(&size_human(summary.total_size)));
    println!(
        "  Items:    {} files in {} folders",
        format_number(summary.item_count),
        format_number(summary.dir_count)
    );
    match summary.age_days {
        Some(days) => println!("  Modified: {} days ago", days),
        None => println!("  Modified: -"),
    }
    if let Some(threshold) = summary.age_threshold_days {
        println!(
            "  Older than {} days: {} files, {}",
            threshold,
            format_number(summary.stale_count),
            Theme::size(&size_human(summary.stale_size))
        );
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    timestamp: String,
    scans: Vec<JsonScan<'a>>,
}

#[derive(Serialize)]
struct JsonScan<'a> {
    #[serde(flatten)]
    result: &'a ScanResult,
    elapsed_ms: u128,
}

pub fn print_json(results: &[ScanResult]) -> anyhow::Result<()> {
    println!("{}", to_json(results)?);
    Ok(())
}

pub fn to_json(results: &[ScanResult]) -> anyhow::Result<String> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        scans: results
            .iter()
            .map(|result| JsonScan {
                result,
                elapsed_ms: result.elapsed.as_millis(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn print_path(path: &Path) {
    println!("{}", path.display());
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
