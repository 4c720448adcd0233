use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{ScanId, ScanKind};

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the scanning engine.
///
/// Per-file variants (`AccessDenied`, `PathVanished`, `Io`) are recovered
/// inside a scan and turned into [`ScanWarning`]s. `Cancelled` comes from a
/// hash abandoned mid-file and ends up as a `Cancelled` scan outcome. The
/// coordinator only ever returns `InvalidTarget`, `AlreadyRunning` and
/// `UnknownScan` to callers.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("path vanished during scan: {}", .0.display())]
    PathVanished(PathBuf),

    #[error("invalid scan target {}: {reason}", .path.display())]
    InvalidTarget { path: PathBuf, reason: String },

    #[error("a {kind} scan is already running for {}", .root.display())]
    AlreadyRunning { kind: ScanKind, root: PathBuf },

    #[error("scan was cancelled")]
    Cancelled,

    #[error("unknown scan id: {0}")]
    UnknownScan(ScanId),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Map an I/O error on `path` onto the scan error taxonomy.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ScanError::AccessDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => ScanError::PathVanished(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Convert a recoverable per-path error into a warning.
    ///
    /// Returns `None` for errors that are not about a single path.
    pub fn into_warning(self) -> Option<ScanWarning> {
        match self {
            ScanError::AccessDenied(path) => Some(ScanWarning {
                kind: WarningKind::AccessDenied,
                message: "access denied".to_string(),
                path: Some(path),
            }),
            ScanError::PathVanished(path) => Some(ScanWarning {
                kind: WarningKind::PathVanished,
                message: "no longer exists".to_string(),
                path: Some(path),
            }),
            ScanError::Io { path, source } => Some(ScanWarning {
                kind: WarningKind::Io,
                message: source.to_string(),
                path: Some(path),
            }),
            _ => None,
        }
    }
}

/// Category of a non-fatal problem met while walking or hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    AccessDenied,
    PathVanished,
    Io,
}

/// A path that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanWarning {
    pub kind: WarningKind,
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanWarning {
    pub fn from_io(path: Option<&Path>, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => WarningKind::AccessDenied,
            io::ErrorKind::NotFound => WarningKind::PathVanished,
            _ => WarningKind::Io,
        };
        Self {
            kind,
            path: path.map(Path::to_path_buf),
            message: err.to_string(),
        }
    }
}

/// Why a scan ended in the `Failed` state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", content = "detail", rename_all = "snake_case")]
pub enum ScanFailure {
    #[error("scan root disappeared before the walk started: {}", .0.display())]
    RootVanished(PathBuf),

    #[error("scan worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("internal error: {0}")]
    Internal(String),
}
