/// Moving a single file to its destination.
///
/// The organizer goes through the [`FileMover`] trait for the one mutating
/// step of each file, which keeps the filesystem behind a seam that tests
/// can replace.
use std::fs;
use std::io;
use std::path::Path;

/// Moves one file from `from` to `to`.
///
/// Implementations must not overwrite an existing destination; they report
/// that case as [`io::ErrorKind::AlreadyExists`].
pub trait FileMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Moves files on the local filesystem.
///
/// Uses a rename within a volume. When the destination lives on another
/// volume, the file is copied and the source removed afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

impl FileMover for FsMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.symlink_metadata().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
            Err(e) => Err(e),
        }
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        // Leave exactly one copy behind.
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
