use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging;
use crate::output::OutputMode;
use crate::size::LargeFileThreshold;

mod commands;

use commands::{config_command, scan_command};

#[derive(Parser)]
#[command(name = "space-cleanser")]
#[command(version)]
#[command(about = "Find duplicate files, large files and oversized folders")]
#[command(
    long_about = "Space Cleanser scans directory trees for reclaimable space. \
    Nothing is ever deleted; scans are read-only.\n\n\
    Examples:\n  \
    space-cleanser scan duplicates ~/Downloads --min-size 1MB\n  \
    space-cleanser scan large D:\\ --threshold 1GB\n  \
    space-cleanser scan folders ~/.cache ~/.npm --older-than 30\n  \
    space-cleanser scan all ~ --json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Exclude paths matching glob pattern (repeatable)
    #[arg(long, value_name = "GLOB", global = true)]
    pub exclude: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory tree (read-only)
    #[command(visible_alias = "s")]
    Scan {
        #[command(subcommand)]
        target: ScanCommands,
    },

    /// Show or reset the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ScanCommands {
    /// Find files with identical content
    #[command(visible_alias = "dup")]
    Duplicates {
        path: PathBuf,

        /// Ignore files smaller than this (e.g. 512KB, 1MB) [default: 1MB]
        #[arg(long, value_name = "SIZE")]
        min_size: Option<String>,
    },

    /// Find files at or above a size threshold
    Large {
        path: PathBuf,

        /// One of 100MB, 500MB, 1GB, 2GB, 5GB [default: 100MB]
        #[arg(long, value_name = "SIZE")]
        threshold: Option<LargeFileThreshold>,
    },

    /// Total size and age of each folder (all folders scanned concurrently)
    Folders {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Also report files not modified in this many days
        #[arg(long, value_name = "DAYS")]
        older_than: Option<u64>,
    },

    /// Duplicate and large-file scans of the same tree, run concurrently
    All {
        path: PathBuf,

        #[arg(long, value_name = "SIZE")]
        min_size: Option<String>,

        #[arg(long, value_name = "SIZE")]
        threshold: Option<LargeFileThreshold>,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Overwrite the configuration file with defaults
    Reset,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        logging::init_logger(self.verbose, self.quiet);
        let output_mode = OutputMode::from_flags(self.verbose, self.quiet);

        match self.command {
            Commands::Scan { target } => {
                scan_command::handle_scan(target, &self.exclude, self.json, output_mode)
            }
            Commands::Config { action } => config_command::handle_config(action, self.json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_large_with_threshold() {
        let cli = Cli::try_parse_from([
            "space-cleanser",
            "scan",
            "large",
            "/data",
            "--threshold",
            "1GB",
            "--exclude",
            "**/keep/**",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.exclude, vec!["**/keep/**".to_string()]);
        match cli.command {
            Commands::Scan {
                target: ScanCommands::Large { path, threshold },
            } => {
                assert_eq!(path, PathBuf::from("/data"));
                assert_eq!(threshold, Some(LargeFileThreshold::Gb1));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_unsupported_threshold_rejected() {
        let parsed = Cli::try_parse_from(["space-cleanser", "scan", "large", "/data", "--threshold", "3GB"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_folders_requires_a_path() {
        assert!(Cli::try_parse_from(["space-cleanser", "scan", "folders"]).is_err());
        let cli = Cli::try_parse_from(["space-cleanser", "scan", "folders", "/a", "/b", "--older-than", "30"])
            .unwrap();
        match cli.command {
            Commands::Scan {
                target: ScanCommands::Folders { paths, older_than },
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(older_than, Some(30));
            }
            _ => panic!("wrong command"),
        }
    }
}
