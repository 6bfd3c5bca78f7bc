//! In-memory filesystem for tests.
//!
//! Files are modelled as shared inodes so hard links and link counts behave
//! like a POSIX filesystem: renaming or unlinking a name never affects an
//! already open handle. Every stat and mutating call is recorded in a
//! journal, and failures can be injected per operation and path.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::filesystem::{FileKind, FileStat, Filesystem, FsError};

type Inode = Arc<RwLock<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Node {
    File(Inode),
    Dir,
    Other(u32),
}

/// Operation kinds, used for journal filtering and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOpKind {
    Stat,
    Rename,
    Remove,
    HardLink,
    OpenAppend,
    CreateDir,
}

/// A journaled filesystem call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Stat(PathBuf),
    Rename { from: PathBuf, to: PathBuf },
    Remove(PathBuf),
    HardLink { original: PathBuf, link: PathBuf },
    OpenAppend(PathBuf),
    CreateDir(PathBuf),
}

impl FsOp {
    pub fn kind(&self) -> FsOpKind {
        match self {
            FsOp::Stat(_) => FsOpKind::Stat,
            FsOp::Rename { .. } => FsOpKind::Rename,
            FsOp::Remove(_) => FsOpKind::Remove,
            FsOp::HardLink { .. } => FsOpKind::HardLink,
            FsOp::OpenAppend(_) => FsOpKind::OpenAppend,
            FsOp::CreateDir(_) => FsOpKind::CreateDir,
        }
    }

    /// True for calls that can change the filesystem.
    pub fn is_mutation(&self) -> bool {
        self.kind() != FsOpKind::Stat
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<PathBuf, Node>,
    journal: Vec<FsOp>,
    failures: HashMap<(FsOpKind, PathBuf), io::ErrorKind>,
}

impl State {
    fn record(&mut self, op: FsOp, path: &Path) -> Result<(), FsError> {
        let kind = op.kind();
        self.journal.push(op);
        match self.failures.get(&(kind, path.to_path_buf())) {
            Some(error) => Err(FsError::Io(io::Error::new(
                *error,
                format!("injected failure: {}", path.display()),
            ))),
            None => Ok(()),
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(p) if p.as_os_str().is_empty() || p == Path::new("/") => true,
            Some(p) => matches!(self.entries.get(p), Some(Node::Dir)),
        }
    }

    fn mkdirs(&mut self, path: &Path) {
        for dir in path.ancestors() {
            if dir.as_os_str().is_empty() || dir == Path::new("/") {
                continue;
            }
            self.entries.insert(dir.to_path_buf(), Node::Dir);
        }
    }

    fn link_count(&self, inode: &Inode) -> u64 {
        self.entries
            .values()
            .filter(|node| matches!(node, Node::File(other) if Arc::ptr_eq(other, inode)))
            .count() as u64
    }
}

fn not_found(path: &Path) -> FsError {
    FsError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    ))
}

fn io_error(kind: io::ErrorKind, what: &str, path: &Path) -> FsError {
    FsError::Io(io::Error::new(kind, format!("{}: {}", what, path.display())))
}

/// Append handle into a [`MockFilesystem`] inode.
#[derive(Debug, Clone)]
pub struct MockFile {
    data: Inode,
}

impl Write for MockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.write().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<Mutex<State>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and its parents (for test setup, not journaled).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().mkdirs(path.as_ref());
    }

    /// Add a regular file with one link, creating parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, data: &[u8]) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = path.parent() {
            state.mkdirs(parent);
        }
        state
            .entries
            .insert(path.to_path_buf(), Node::File(Arc::new(RwLock::new(data.to_vec()))));
    }

    /// Add a non-regular entry (fifo, socket, ...) with the given mode bits.
    pub fn add_special(&self, path: impl AsRef<Path>, mode: u32) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = path.parent() {
            state.mkdirs(parent);
        }
        state.entries.insert(path.to_path_buf(), Node::Other(mode));
    }

    /// Get content of a regular file.
    pub fn get_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.state.lock().unwrap().entries.get(path.as_ref()) {
            Some(Node::File(inode)) => Some(inode.read().unwrap().clone()),
            _ => None,
        }
    }

    /// Content of a regular file as UTF-8, or `None`.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.get_file(path).and_then(|data| String::from_utf8(data).ok())
    }

    /// Whether any entry exists at `path`.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().entries.contains_key(path.as_ref())
    }

    /// All regular file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        let mut files: Vec<PathBuf> = state
            .entries
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect();
        files.sort();
        files
    }

    /// Hard link count of a regular file.
    pub fn link_count(&self, path: impl AsRef<Path>) -> Option<u64> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path.as_ref()) {
            Some(Node::File(inode)) => Some(state.link_count(inode)),
            _ => None,
        }
    }

    /// True when both paths name the same inode.
    pub fn same_file(&self, a: impl AsRef<Path>, b: impl AsRef<Path>) -> bool {
        let state = self.state.lock().unwrap();
        match (state.entries.get(a.as_ref()), state.entries.get(b.as_ref())) {
            (Some(Node::File(x)), Some(Node::File(y))) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Make every future `op` on `path` fail with `error`.
    pub fn fail(&self, op: FsOpKind, path: impl AsRef<Path>, error: io::ErrorKind) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((op, path.as_ref().to_path_buf()), error);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// All journaled calls, oldest first.
    pub fn journal(&self) -> Vec<FsOp> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Number of journaled calls that could change the filesystem.
    pub fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .journal
            .iter()
            .filter(|op| op.is_mutation())
            .count()
    }

    pub fn clear_journal(&self) {
        self.state.lock().unwrap().journal.clear();
    }
}

impl Filesystem for MockFilesystem {
    type File = MockFile;

    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(FsOp::Stat(path.to_path_buf()), path)?;

        match state.entries.get(path) {
            Some(Node::File(inode)) => Ok(FileStat {
                kind: FileKind::Regular,
                links: state.link_count(inode),
                mode: 0o100644,
            }),
            Some(Node::Dir) => Ok(FileStat {
                kind: FileKind::Directory,
                links: 2,
                mode: 0o040755,
            }),
            Some(Node::Other(mode)) => Ok(FileStat {
                kind: FileKind::Other,
                links: 1,
                mode: *mode,
            }),
            None => Err(not_found(path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(
            FsOp::Rename {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            },
            from,
        )?;

        if !state.entries.contains_key(from) || !state.parent_exists(to) {
            return Err(not_found(from));
        }
        if matches!(state.entries.get(to), Some(Node::Dir)) {
            return Err(io_error(io::ErrorKind::Other, "is a directory", to));
        }
        if let Some(node) = state.entries.remove(from) {
            state.entries.insert(to.to_path_buf(), node);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(FsOp::Remove(path.to_path_buf()), path)?;

        match state.entries.get(path) {
            None => Err(not_found(path)),
            Some(Node::Dir) => Err(io_error(io::ErrorKind::Other, "is a directory", path)),
            Some(_) => {
                state.entries.remove(path);
                Ok(())
            }
        }
    }

    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(
            FsOp::HardLink {
                original: original.to_path_buf(),
                link: link.to_path_buf(),
            },
            link,
        )?;

        let inode = match state.entries.get(original) {
            Some(Node::File(inode)) => Arc::clone(inode),
            Some(_) => {
                return Err(io_error(
                    io::ErrorKind::PermissionDenied,
                    "cannot link non-regular file",
                    original,
                ))
            }
            None => return Err(not_found(original)),
        };
        if state.entries.contains_key(link) {
            return Err(io_error(io::ErrorKind::AlreadyExists, "file exists", link));
        }
        if !state.parent_exists(link) {
            return Err(not_found(link));
        }
        state.entries.insert(link.to_path_buf(), Node::File(inode));
        Ok(())
    }

    fn open_append(&self, path: &Path) -> Result<MockFile, FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(FsOp::OpenAppend(path.to_path_buf()), path)?;

        match state.entries.get(path) {
            Some(Node::File(inode)) => Ok(MockFile {
                data: Arc::clone(inode),
            }),
            Some(Node::Dir) => Err(io_error(io::ErrorKind::Other, "is a directory", path)),
            Some(Node::Other(_)) => Err(io_error(
                io::ErrorKind::PermissionDenied,
                "not a regular file",
                path,
            )),
            None if !state.parent_exists(path) => Err(not_found(path)),
            None => {
                let inode: Inode = Arc::new(RwLock::new(Vec::new()));
                state
                    .entries
                    .insert(path.to_path_buf(), Node::File(Arc::clone(&inode)));
                Ok(MockFile { data: inode })
            }
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock().unwrap();
        state.record(FsOp::CreateDir(path.to_path_buf()), path)?;
        state.mkdirs(path);
        Ok(())
    }
}
