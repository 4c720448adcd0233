//! Space Cleanser library crate
//!
//! Read-only scanning engine behind the `space-cleanser` binary: folder size
//! aggregation, duplicate detection by content digest and large-file
//! detection, driven concurrently through [`scanner::ScanCoordinator`].

pub mod aggregate;
pub mod categories;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod model;
pub mod output;
pub mod progress;
pub mod scan_events;
pub mod scanner;
pub mod size;
pub mod spinner;
pub mod theme;
pub mod walk;

pub use error::{ScanError, ScanFailure};
pub use model::{ScanId, ScanKind, ScanOutcome, ScanResult, ScanState, ScanTarget};
pub use scanner::ScanCoordinator;
