//! Ordered, non-following directory walk shared by the file detectors
//!
//! Entries come out in directory-walk order with siblings sorted by name, so
//! two scans of the same tree discover files in the same order. Symlinks are
//! never followed and never reported; junctions are not entered. Excluded
//! system regions and subpaths are pruned before they are read.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classify::{self, PathClassifier};
use crate::error::{ScanWarning, WarningKind};
use crate::model::{FileRecord, ScanParams};

/// One step of the walk.
#[derive(Debug)]
pub enum WalkEntry {
    /// A directory that is about to be descended into.
    Directory(PathBuf),
    File(FileRecord),
    /// An entry or subtree that could not be read and was skipped.
    Warning(ScanWarning),
}

pub struct FileWalker<'a> {
    inner: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>> + 'a>,
}

/// Walk `root`, honoring the classifier's system roots and the target's
/// excluded subpaths.
pub fn walk_files<'a>(
    root: &Path,
    classifier: &'a PathClassifier,
    params: &'a ScanParams,
) -> FileWalker<'a> {
    let root_owned = root.to_path_buf();
    let iter = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = entry.path();
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                return false;
            }
            if classifier.is_excluded_below(&root_owned, path) || params.is_excluded_subpath(path)
            {
                log::trace!("pruned {}", path.display());
                return false;
            }
            !(file_type.is_dir() && classify::is_reparse_point(path))
        });

    FileWalker {
        inner: Box::new(iter),
    }
}

impl Iterator for FileWalker<'_> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(WalkEntry::Warning(warning_from_walk_error(&err))),
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                return Some(WalkEntry::Directory(entry.into_path()));
            }
            if !file_type.is_file() {
                // sockets, devices, etc.
                continue;
            }

            return Some(match entry.metadata() {
                Ok(meta) => WalkEntry::File(FileRecord::from_metadata(entry.into_path(), &meta)),
                Err(err) => WalkEntry::Warning(warning_from_walk_error(&err)),
            });
        }
    }
}

pub(crate) fn warning_from_walk_error(err: &walkdir::Error) -> ScanWarning {
    match err.io_error() {
        Some(io) => ScanWarning::from_io(err.path(), io),
        None => ScanWarning {
            kind: WarningKind::Io,
            path: err.path().map(Path::to_path_buf),
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn files(walker: FileWalker<'_>) -> Vec<PathBuf> {
        walker
            .filter_map(|e| match e {
                WalkEntry::File(r) => Some(r.path),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_walk_order_is_sorted_and_stable() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b").join("inner.txt"), "i").unwrap();

        let classifier = PathClassifier::default();
        let params = ScanParams::default();
        let found = files(walk_files(dir.path(), &classifier, &params));

        assert_eq!(
            found,
            vec![
                dir.path().join("a.txt"),
                dir.path().join("b").join("inner.txt"),
                dir.path().join("c.txt"),
            ]
        );
    }

    #[test]
    fn test_walk_prunes_system_roots_and_subpaths() {
        let dir = tempfile::tempdir().unwrap();
        let nm = dir.path().join("app").join("node_modules");
        let keep = dir.path().join("keep");
        fs::create_dir_all(&nm).unwrap();
        fs::create_dir_all(&keep).unwrap();
        fs::write(nm.join("dep.js"), "x").unwrap();
        fs::write(keep.join("secret.bin"), "x").unwrap();
        fs::write(dir.path().join("app").join("main.rs"), "x").unwrap();

        let classifier = PathClassifier::default();
        let params = ScanParams {
            excluded_subpaths: vec![keep.clone()],
            ..ScanParams::default()
        };
        let found = files(walk_files(dir.path(), &classifier, &params));

        assert_eq!(found, vec![dir.path().join("app").join("main.rs")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("data.bin"), "data").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(real.join("data.bin"), dir.path().join("file-link")).unwrap();

        let classifier = PathClassifier::default();
        let params = ScanParams::default();
        let found = files(walk_files(dir.path(), &classifier, &params));

        assert_eq!(found, vec![real.join("data.bin")]);
    }
}
