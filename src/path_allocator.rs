//! Collision-free destination naming.
//!
//! When `Documents/report.pdf` is taken, the allocator tries
//! `Documents/report_1.pdf`, `Documents/report_2.pdf` and so on. The counter
//! goes before the last extension only, so `archive.tar.gz` becomes
//! `archive.tar_1.gz`.
//!
//! The check is made against the filesystem at call time, so another process
//! can still create the chosen path before the caller uses it. The organizer
//! handles that case when the move itself fails.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Hands out destination paths that are unused on disk.
///
/// Paths handed out are remembered for the allocator's lifetime, so two
/// allocations never return the same path even when nothing is written to
/// disk in between (as in a dry run).
#[derive(Debug, Default)]
pub struct PathAllocator {
    claimed: HashSet<PathBuf>,
}

impl PathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `desired` if it is free, else the first free `<stem>_<n><.ext>`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::path_allocator::PathAllocator;
    /// use std::path::Path;
    ///
    /// let mut allocator = PathAllocator::new();
    /// // With Documents/report.pdf already present:
    /// let path = allocator.allocate(Path::new("Documents/report.pdf"));
    /// assert_eq!(path, Path::new("Documents/report_1.pdf"));
    /// ```
    pub fn allocate(&mut self, desired: &Path) -> PathBuf {
        if self.is_free(desired) {
            self.claimed.insert(desired.to_path_buf());
            return desired.to_path_buf();
        }

        let mut counter: u64 = 1;
        loop {
            let candidate = numbered_candidate(desired, counter);
            if self.is_free(&candidate) {
                self.claimed.insert(candidate.clone());
                return candidate;
            }
            counter += 1;
        }
    }

    fn is_free(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling link still counts as taken
        !self.claimed.contains(path) && path.symlink_metadata().is_err()
    }
}

/// Builds `<stem>_<counter><.ext>` next to `path`.
fn numbered_candidate(path: &Path, counter: u64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();

    let mut name = OsString::with_capacity(stem.len() + 24);
    name.push(&stem);
    name.push(format!("_{}", counter));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }

    path.with_file_name(name)
}
