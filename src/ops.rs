//! Mutating entry operations: remove, rename, import.
//!
//! These act on the entry at the path, not on what a symlink there points
//! to. The parent directory is always resolved physically and must be
//! inside the jail.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::JailError;
use crate::lookup::Lookup;
use crate::Jail;

impl Jail {
    /// Remove a file or symlink. Directories need [`rmdir`](Self::rmdir).
    pub fn remove(&self, path: &str) -> Lookup<()> {
        self.resolve_entry(path, "remove").and_then(|target| {
            let (physical, rpath) = target.into_parts();
            debug!(path = %rpath, "remove");
            match fs::remove_file(&physical) {
                Ok(()) => Lookup::Found(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Absent,
                Err(err) => Lookup::Failed(JailError::io("remove", &rpath, err)),
            }
        })
    }

    /// Move an entry to a new path inside the jail.
    ///
    /// `Absent` if `old` does not exist. The parent of `new` must exist.
    /// An existing file at `new` is replaced, as the OS does.
    pub fn rename(&self, old: &str, new: &str) -> Lookup<()> {
        let source = match self.resolve_entry(old, "rename") {
            Lookup::Found(source) => source,
            Lookup::Absent => return Lookup::Absent,
            Lookup::Failed(err) => return Lookup::Failed(err),
        };
        let dest = match self.destination_path(new, "rename") {
            Ok(dest) => dest,
            Err(err) => return Lookup::Failed(err),
        };
        debug!(from = %source.virtual_path(), to = %dest.virtual_path(), "rename");

        match fs::rename(source.as_path(), dest.as_path()) {
            Ok(()) => Lookup::Found(()),
            // Source removed between resolution and rename
            Err(err)
                if err.kind() == io::ErrorKind::NotFound
                    && fs::symlink_metadata(source.as_path()).is_err() =>
            {
                Lookup::Absent
            }
            Err(err) => Lookup::Failed(JailError::io("rename", source.virtual_path(), err)),
        }
    }

    /// Move an external file or directory into the jail at `new`.
    ///
    /// Uses a single OS rename, so it is atomic but fails across
    /// filesystems. The parent of `new` must exist inside the jail.
    pub fn put<P: AsRef<Path>>(&self, external: P, new: &str) -> Result<(), JailError> {
        let dest = self.destination_path(new, "put")?;
        debug!(from = %external.as_ref().display(), to = %dest.virtual_path(), "put");
        fs::rename(external.as_ref(), dest.as_path())
            .map_err(|err| JailError::io("put", dest.virtual_path(), err))
    }
}
