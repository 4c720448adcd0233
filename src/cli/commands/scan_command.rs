//! Scan command feature.
//!
//! This module owns and handles the "space-cleanser scan" command behavior.
//! Every requested scan is started on the coordinator up front so they run
//! concurrently; results are printed once all of them have finished.

use anyhow::{bail, Context};

use crate::cli::ScanCommands;
use crate::config::Config;
use crate::model::{ScanKind, ScanOutcome, ScanParams, ScanResult, ScanTarget};
use crate::output::{self, OutputMode};
use crate::progress::{self, ScanSpinners};
use crate::scan_events::ScanEvent;
use crate::scanner::ScanCoordinator;
use crate::size;

pub(crate) fn handle_scan(
    command: ScanCommands,
    exclude: &[String],
    json: bool,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let mut config = Config::load();

    let (min_size, threshold) = match &command {
        ScanCommands::Duplicates { min_size, .. } => (min_size.as_deref(), None),
        ScanCommands::Large { threshold, .. } => (None, *threshold),
        ScanCommands::Folders { .. } => (None, None),
        ScanCommands::All {
            min_size,
            threshold,
            ..
        } => (min_size.as_deref(), *threshold),
    };
    let min_size = min_size
        .map(|s| size::parse_size(s).with_context(|| format!("Invalid size format '{}'", s)))
        .transpose()?;
    config.apply_cli_overrides(min_size, threshold, exclude);

    let targets = build_targets(command, &ScanParams::from_config(&config));
    let results = run_scans(config, targets, json || output_mode == OutputMode::Quiet)?;

    if json {
        output::print_json(&results)?;
    } else {
        output::print_human(&results, output_mode);
    }

    let failed = results
        .iter()
        .filter(|r| matches!(r.outcome, ScanOutcome::Failed(_)))
        .count();
    if failed > 0 {
        bail!("{} of {} scans failed", failed, results.len());
    }
    Ok(())
}

fn build_targets(command: ScanCommands, params: &ScanParams) -> Vec<ScanTarget> {
    match command {
        ScanCommands::Duplicates { path, .. } => {
            vec![ScanTarget::duplicates(path).with_params(params.clone())]
        }
        ScanCommands::Large { path, .. } => {
            vec![ScanTarget::new(ScanKind::LargeFiles, path).with_params(params.clone())]
        }
        ScanCommands::Folders { paths, older_than } => paths
            .into_iter()
            .map(|path| {
                let target = ScanTarget::aggregate(path).with_params(params.clone());
                match older_than {
                    Some(days) => target.with_age_threshold(days),
                    None => target,
                }
            })
            .collect(),
        ScanCommands::All { path, .. } => vec![
            ScanTarget::duplicates(path.clone()).with_params(params.clone()),
            ScanTarget::new(ScanKind::LargeFiles, path).with_params(params.clone()),
        ],
    }
}

/// Start every target, show one spinner per scan, and wait for all results.
fn run_scans(
    config: Config,
    targets: Vec<ScanTarget>,
    hide_progress: bool,
) -> anyhow::Result<Vec<ScanResult>> {
    let coordinator = ScanCoordinator::new(config);
    let spinners = ScanSpinners::new(hide_progress);
    let mut started = Vec::with_capacity(targets.len());

    for target in targets {
        let kind = target.kind;
        let root = target.root.clone();
        let pb = spinners.add(kind);
        let bar = pb.clone();

        let id = coordinator
            .start_scan_observed(target, move |event| {
                if let ScanEvent::Progress(p) = event {
                    bar.set_message(progress::describe(p));
                }
            })
            .with_context(|| format!("Failed to start {} scan of {}", kind, root.display()))?;
        log::debug!("{} -> {} scan of {}", id, kind, root.display());
        started.push((id, pb));
    }

    let mut results = Vec::with_capacity(started.len());
    for (id, pb) in started {
        let result = coordinator.get_result(id)?;
        pb.finish_and_clear();
        results.push(result);
    }
    Ok(results)
}
