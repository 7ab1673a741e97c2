//! Fresh metadata queries for entries inside a [`Jail`].

use std::fs::{self, Metadata};
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::JailError;
use crate::jailed_path::JailedPath;
use crate::lookup::Lookup;
use crate::virtual_path::{normalize, VirtualPath};
use crate::Jail;

/// What kind of filesystem object an [`Entry`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

impl EntryKind {
    fn of(meta: &Metadata) -> Self {
        let file_type = meta.file_type();
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Result of [`Jail::stat`]. Never cached; every call queries the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Size in bytes, for regular files only.
    pub size: Option<u64>,
    /// Status change time on Unix, creation time elsewhere.
    pub ctime: SystemTime,
    pub mtime: SystemTime,
    pub physical_path: PathBuf,
    pub virtual_path: VirtualPath,
}

impl Entry {
    fn from_metadata(
        meta: &Metadata,
        target: JailedPath,
        op: &'static str,
    ) -> Result<Self, JailError> {
        let (physical_path, virtual_path) = target.into_parts();
        let mtime = meta
            .modified()
            .map_err(|err| JailError::io(op, &virtual_path, err))?;
        let ctime = change_time(meta).map_err(|err| JailError::io(op, &virtual_path, err))?;
        let kind = EntryKind::of(meta);
        Ok(Self {
            kind,
            size: (kind == EntryKind::File).then(|| meta.len()),
            ctime,
            mtime,
            physical_path,
            virtual_path,
        })
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> io::Result<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    let nanos = Duration::from_nanos(meta.ctime_nsec().clamp(0, 999_999_999) as u64);
    let time = if meta.ctime() >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(meta.ctime() as u64) + nanos)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(meta.ctime().unsigned_abs()))
            .and_then(|t| t.checked_add(nanos))
    };
    time.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "ctime out of range"))
}

#[cfg(not(unix))]
fn change_time(meta: &Metadata) -> io::Result<SystemTime> {
    meta.created().or_else(|_| meta.modified())
}

fn query(target: JailedPath, op: &'static str) -> Lookup<Entry> {
    let meta = match fs::symlink_metadata(target.as_path()) {
        Ok(meta) => meta,
        // Removed between resolution and query
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Lookup::Absent,
        Err(err) => return Lookup::Failed(JailError::io(op, target.virtual_path(), err)),
    };
    Entry::from_metadata(&meta, target, op).map(Some).into()
}

impl Jail {
    /// Describe whatever `path` resolves to.
    ///
    /// Symlinks are followed (and must stay inside the jail unless the jail
    /// follows symlinks), so `kind` is that of the target.
    pub fn stat(&self, path: &str) -> Lookup<Entry> {
        self.resolve_virtual(normalize(path), "stat")
            .and_then(|target| query(target, "stat"))
    }

    /// Like [`stat`](Self::stat), but a symlink at the final segment is
    /// described itself instead of followed.
    pub fn lstat(&self, path: &str) -> Lookup<Entry> {
        if normalize(path).is_root() {
            return self.stat(path);
        }
        self.resolve_entry(path, "lstat")
            .and_then(|target| query(target, "lstat"))
    }

    /// Whether `path` resolves to something inside the jail.
    pub fn exists(&self, path: &str) -> Result<bool, JailError> {
        self.resolve_virtual(normalize(path), "exists")
            .into_result()
            .map(|found| found.is_some())
    }
}

impl JailedPath {
    /// Fresh metadata for this resolved path, without following a symlink
    /// at the final component.
    pub fn entry(&self) -> Lookup<Entry> {
        query(self.clone(), "stat")
    }
}
