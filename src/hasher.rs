//! Content hashing for duplicate detection
//!
//! Files are read through a fixed-size buffer, so memory use does not depend
//! on file size. Digests are lowercase hex BLAKE3.

use blake3::Hasher;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, ScanError};

/// Result of hashing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    Digest(String),
    /// The file is smaller than the minimum size and was not read.
    SkippedTooSmall { size: u64 },
}

impl HashOutcome {
    pub fn digest(&self) -> Option<&str> {
        match self {
            HashOutcome::Digest(d) => Some(d),
            HashOutcome::SkippedTooSmall { .. } => None,
        }
    }
}

/// Hash the whole content of `path`.
///
/// Errors are classified as `AccessDenied`, `PathVanished` or `Io`; callers
/// treat all of them as a reason to drop the file, not to stop the scan.
pub fn hash_file(path: &Path, min_size: u64, buffer_size: usize) -> Result<HashOutcome> {
    hash_file_cancellable(path, min_size, buffer_size, &AtomicBool::new(false))
}

/// Like [`hash_file`], but gives up with [`ScanError::Cancelled`] once
/// `cancel` is set, checked before every chunk.
pub fn hash_file_cancellable(
    path: &Path,
    min_size: u64,
    buffer_size: usize,
    cancel: &AtomicBool,
) -> Result<HashOutcome> {
    let mut file = File::open(path).map_err(|e| ScanError::from_io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| ScanError::from_io(path, e))?
        .len();

    if size < min_size {
        return Ok(HashOutcome::SkippedTooSmall { size });
    }

    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; buffer_size.max(4096)];

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ScanError::from_io(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(HashOutcome::Digest(hasher.finalize().to_hex().to_string()))
}

/// Hash only the first `len` bytes of `path`.
///
/// Used to split a same-size bucket cheaply before full hashing; two files
/// with different prefixes can never be duplicates.
pub fn prefix_hash(path: &Path, len: usize) -> Result<String> {
    let file = File::open(path).map_err(|e| ScanError::from_io(path, e))?;
    let mut buffer = Vec::with_capacity(len);
    file.take(len as u64)
        .read_to_end(&mut buffer)
        .map_err(|e| ScanError::from_io(path, e))?;

    Ok(blake3::hash(&buffer).to_hex().to_string())
}
