/// Sorting the files of one directory into category subdirectories.
///
/// [`OrganizeEngine`] walks the direct entries of a directory, resolves each
/// eligible file's category through [`CategoryRules`], picks a free
/// destination with [`PathAllocator`] and moves the file there (or only
/// pretends to, in dry-run mode). The outcome of the whole batch is returned
/// as an [`OrganizeResult`]; a file that fails to move is counted and the
/// batch carries on.
use crate::category_rules::CategoryRules;
use crate::file_mover::{FileMover, FsMover};
use crate::path_allocator::PathAllocator;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file that was moved, or would be moved in a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Where the file was before organization.
    pub original_path: PathBuf,
    /// Where the file ended up (or would end up).
    pub new_path: PathBuf,
    /// The category folder it went into.
    pub category: String,
}

/// A file that could not be moved, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMove {
    pub path: PathBuf,
    pub reason: String,
}

/// Tally of a single organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeResult {
    /// Files moved (or that would have moved in a dry run).
    pub moved: usize,
    /// Files whose move failed.
    pub failed: usize,
    /// Category folders used by this run.
    pub created_categories: BTreeSet<String>,
    /// Files moved per category.
    pub category_counts: BTreeMap<String, usize>,
    /// Every successful (or simulated) move, in processing order.
    pub operations: Vec<Operation>,
    /// Every failed move, in processing order.
    pub failures: Vec<FailedMove>,
    /// Whether the run was simulated.
    pub dry_run: bool,
}

impl OrganizeResult {
    /// True when the run found nothing to move and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.moved == 0 && self.failed == 0
    }

    fn record_move(&mut self, operation: Operation) {
        self.moved += 1;
        *self
            .category_counts
            .entry(operation.category.clone())
            .or_insert(0) += 1;
        self.operations.push(operation);
    }

    fn record_failure(&mut self, path: &Path, reason: String) {
        warn!("Could not organize {}: {}", path.display(), reason);
        self.failed += 1;
        self.failures.push(FailedMove {
            path: path.to_path_buf(),
            reason,
        });
    }
}

/// Errors that stop a run before any file is touched.
#[derive(Debug)]
pub enum OrganizeError {
    /// The target path is missing or is not a directory.
    InvalidPath { path: PathBuf, reason: String },
    /// The target directory could not be listed.
    ReadDirFailed { path: PathBuf, source: io::Error },
    /// Another run on the same directory is still in flight.
    AlreadyRunning(PathBuf),
    /// The background worker could not be started or ended without a result.
    Worker(String),
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath { path, reason } => {
                write!(f, "Invalid folder path {}: {}", path.display(), reason)
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::AlreadyRunning(path) => {
                write!(f, "{} is already being organized", path.display())
            }
            Self::Worker(reason) => write!(f, "Organize worker failed: {}", reason),
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadDirFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A direct child of the directory being organized.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: OsString,
    /// Lowercase with a leading dot, or empty when the name has none.
    pub extension: String,
    /// Follows symlinks, so a link to a directory counts as one.
    pub is_dir: bool,
    pub is_hidden: bool,
}

impl FileEntry {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let is_hidden = name.as_encoded_bytes().first() == Some(&b'.');
        let is_dir = path.is_dir();

        Self {
            path,
            name,
            extension,
            is_dir,
            is_hidden,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

/// Organizes one directory according to a rule set.
///
/// # Examples
///
/// ```no_run
/// use dirsort::category_rules::CategoryRules;
/// use dirsort::organizer::OrganizeEngine;
/// use std::path::Path;
///
/// let rules = CategoryRules::load(r#"{
///     "categories": [{ "name": "Documents", "enabled": true, "extensions": [".pdf"] }]
/// }"#).unwrap();
///
/// match OrganizeEngine::new(&rules).organize(Path::new("/path/to/downloads")) {
///     Ok(result) => println!("{} moved, {} failed", result.moved, result.failed),
///     Err(e) => eprintln!("Organization failed: {}", e),
/// }
/// ```
pub struct OrganizeEngine<'a, M = FsMover> {
    rules: &'a CategoryRules,
    mover: M,
    excluded_paths: Vec<PathBuf>,
}

impl<'a> OrganizeEngine<'a, FsMover> {
    pub fn new(rules: &'a CategoryRules) -> Self {
        Self {
            rules,
            mover: FsMover,
            excluded_paths: Vec::new(),
        }
    }
}

impl<'a, M: FileMover> OrganizeEngine<'a, M> {
    /// Replaces the filesystem mover.
    pub fn with_mover<N: FileMover>(self, mover: N) -> OrganizeEngine<'a, N> {
        OrganizeEngine {
            rules: self.rules,
            mover,
            excluded_paths: self.excluded_paths,
        }
    }

    /// Never move the file at `path`, e.g. the running executable or the
    /// configuration file when they sit in the directory being organized.
    pub fn exclude_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.excluded_paths
            .push(fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));
        self
    }

    /// Sorts the direct files of `directory` into category subdirectories.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidPath` if `directory` is missing or not
    /// a directory and `OrganizeError::ReadDirFailed` if it cannot be listed.
    /// Both are reported before anything is created or moved. Failures of
    /// individual files are counted in the result instead.
    pub fn organize(&self, directory: &Path) -> Result<OrganizeResult, OrganizeError> {
        let entries = self.list_entries(directory)?;
        let dry_run = self.rules.is_dry_run();

        info!(
            "Organizing {} ({} entries{})",
            directory.display(),
            entries.len(),
            if dry_run { ", dry run" } else { "" }
        );

        let mut result = OrganizeResult {
            dry_run,
            ..Default::default()
        };
        let mut allocator = PathAllocator::new();

        for entry in entries {
            if !self.is_eligible(&entry) {
                debug!("Skipping {}", entry.path.display());
                continue;
            }
            self.organize_file(directory, &entry, &mut allocator, &mut result);
        }

        info!(
            "Finished {}: {} moved, {} failed",
            directory.display(),
            result.moved,
            result.failed
        );
        Ok(result)
    }

    fn list_entries(&self, directory: &Path) -> Result<Vec<FileEntry>, OrganizeError> {
        let metadata = fs::metadata(directory).map_err(|e| OrganizeError::InvalidPath {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(OrganizeError::InvalidPath {
                path: directory.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let read_dir = fs::read_dir(directory).map_err(|e| OrganizeError::ReadDirFailed {
            path: directory.to_path_buf(),
            source: e,
        })?;

        let mut entries: Vec<FileEntry> = read_dir
            .filter_map(|entry| match entry {
                Ok(entry) => Some(FileEntry::from_path(entry.path())),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", directory.display(), e);
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn is_eligible(&self, entry: &FileEntry) -> bool {
        if entry.is_dir || entry.is_hidden {
            return false;
        }
        if self.rules.is_excluded(&entry.display_name()) {
            return false;
        }
        if !self.excluded_paths.is_empty() {
            let resolved = fs::canonicalize(&entry.path).unwrap_or_else(|_| entry.path.clone());
            if self.excluded_paths.contains(&resolved) {
                return false;
            }
        }
        true
    }

    fn organize_file(
        &self,
        directory: &Path,
        entry: &FileEntry,
        allocator: &mut PathAllocator,
        result: &mut OrganizeResult,
    ) {
        let category = self.rules.resolve(&entry.extension);
        let category_path = directory.join(category);

        if !result.dry_run
            && !result.created_categories.contains(category)
            && let Err(e) = ensure_directory(&category_path)
        {
            result.record_failure(
                &entry.path,
                format!("cannot create {}: {}", category_path.display(), e),
            );
            return;
        }
        result.created_categories.insert(category.to_string());

        let desired = category_path.join(&entry.name);
        let destination = allocator.allocate(&desired);

        let new_path = if result.dry_run {
            debug!(
                "Would move {} to {}",
                entry.path.display(),
                destination.display()
            );
            destination
        } else {
            match self.move_with_retry(&entry.path, destination, &desired, allocator) {
                Ok(moved_to) => {
                    debug!("Moved {} to {}", entry.path.display(), moved_to.display());
                    moved_to
                }
                Err(e) => {
                    result.record_failure(&entry.path, e.to_string());
                    return;
                }
            }
        };

        result.record_move(Operation {
            original_path: entry.path.clone(),
            new_path,
            category: category.to_string(),
        });
    }

    /// Moves the file, allocating a fresh name once if the destination
    /// appeared between allocation and the move.
    fn move_with_retry(
        &self,
        source: &Path,
        destination: PathBuf,
        desired: &Path,
        allocator: &mut PathAllocator,
    ) -> io::Result<PathBuf> {
        match self.mover.move_file(source, &destination) {
            Ok(()) => Ok(destination),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(
                    "{} appeared before the move, picking a new name",
                    destination.display()
                );
                let retry = allocator.allocate(desired);
                self.mover.move_file(source, &retry)?;
                Ok(retry)
            }
            Err(e) => Err(e),
        }
    }
}

/// Creates `path` unless a directory is already there.
fn ensure_directory(path: &Path) -> io::Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
