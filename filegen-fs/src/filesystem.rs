//! Filesystem trait and the `std::fs` backed implementation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// The underlying IO error kind.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FsError::Io(e) => e.kind(),
        }
    }

    /// True when the path (or one of its parent directories) does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == io::ErrorKind::NotFound
    }

    /// True when the target path is already taken.
    pub fn is_already_exists(&self) -> bool {
        self.kind() == io::ErrorKind::AlreadyExists
    }
}

/// Kind of a directory entry, as far as rotation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Other,
}

/// Subset of `stat(2)` used for collision handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,

    /// Number of hard links to the inode.
    pub links: u64,

    /// Raw mode bits (0 where the platform has none).
    pub mode: u32,
}

impl FileStat {
    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Handle returned by [`Filesystem::open_append`].
    type File: Write + Send;

    /// Stat a path, following symlinks.
    fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    /// Rename `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a file.
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Create a hard link `link` pointing at `original`.
    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError>;

    /// Open a file for appending, creating it if needed.
    /// Parent directories are not created.
    fn open_append(&self, path: &Path) -> Result<Self::File, FsError>;

    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    type File = F::File;

    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        (**self).stat(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        (**self).rename(from, to)
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        (**self).remove(path)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        (**self).hard_link(original, link)
    }

    fn open_append(&self, path: &Path) -> Result<Self::File, FsError> {
        (**self).open_append(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        (**self).create_dir_all(path)
    }
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

#[cfg(unix)]
fn stat_details(meta: &fs::Metadata) -> (u64, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.nlink(), meta.mode())
}

#[cfg(not(unix))]
fn stat_details(_meta: &fs::Metadata) -> (u64, u32) {
    (1, 0)
}

impl Filesystem for RealFilesystem {
    type File = File;

    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let meta = fs::metadata(path)?;
        let file_type = meta.file_type();
        let kind = if file_type.is_file() {
            FileKind::Regular
        } else if file_type.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        };
        let (links, mode) = stat_details(&meta);

        Ok(FileStat { kind, links, mode })
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        fs::hard_link(original, link)?;
        Ok(())
    }

    fn open_append(&self, path: &Path) -> Result<File, FsError> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }
}
