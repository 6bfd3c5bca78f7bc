//! Filesystem abstraction for filegen.
//!
//! This crate provides:
//! - Filesystem trait covering the calls generation rotation needs
//!   (stat, rename, unlink, hard link, open for append)
//! - RealFilesystem backed by `std::fs`
//! - MockFilesystem with link counts, failure injection and an operation journal

pub mod filesystem;
pub mod mock;

pub use filesystem::{FileKind, FileStat, Filesystem, FsError, RealFilesystem};
pub use mock::{FsOp, FsOpKind, MockFile, MockFilesystem};
