//! Directory operations: enumerate, create, remove.

use std::fmt;
use std::fs::{self, DirBuilder, ReadDir};
use std::io;
use std::str::FromStr;

use tracing::debug;

use crate::error::JailError;
use crate::jail::append_leaf;
use crate::lookup::Lookup;
use crate::virtual_path::{normalize, VirtualPath};
use crate::Jail;

/// Permission bits for [`Jail::mkdir`].
///
/// Parses from an octal string (`"755"`, `"0755"`, `"0o755"`) or converts
/// from an integer. Defaults to `0o777`; the process umask still applies.
/// Ignored on non-Unix hosts.
///
/// ```
/// use jail_fs::Mode;
///
/// assert_eq!("0755".parse::<Mode>()?.bits(), 0o755);
/// assert_eq!(Mode::try_from(0o700)?.bits(), 0o700);
/// assert!("9".parse::<Mode>().is_err());
/// # Ok::<(), jail_fs::JailError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    const MAX: u32 = 0o7777;

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self(0o777)
    }
}

impl TryFrom<u32> for Mode {
    type Error = JailError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        if bits > Self::MAX {
            return Err(JailError::InvalidMode(format!("{bits:o}")));
        }
        Ok(Self(bits))
    }
}

impl FromStr for Mode {
    type Err = JailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits
            .strip_prefix("0o")
            .or_else(|| digits.strip_prefix("0O"))
            .unwrap_or(digits);
        let bits =
            u32::from_str_radix(digits, 8).map_err(|_| JailError::InvalidMode(s.to_owned()))?;
        if bits > Self::MAX {
            return Err(JailError::InvalidMode(s.to_owned()));
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// An open directory inside a [`Jail`], yielding child names.
///
/// Never yields `.` or `..`, never recurses. Order is whatever the OS
/// returns. Dropping it closes the directory.
#[derive(Debug)]
pub struct JailedDir {
    inner: ReadDir,
    path: VirtualPath,
}

impl JailedDir {
    #[inline]
    pub fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }
}

impl Iterator for JailedDir {
    type Item = Result<String, JailError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(
            entry
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .map_err(|err| JailError::io("readdir", &self.path, err)),
        )
    }
}

fn dir_builder(mode: Mode, recursive: bool) -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode.bits());
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

impl Jail {
    /// Open a directory for enumeration. The caller owns the handle.
    pub fn opendir(&self, path: &str) -> Lookup<JailedDir> {
        self.resolve_virtual(normalize(path), "opendir")
            .and_then(|target| {
                let (physical, path) = target.into_parts();
                match fs::read_dir(&physical) {
                    Ok(inner) => Lookup::Found(JailedDir { inner, path }),
                    // Removed between resolution and open
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Absent,
                    Err(err) => Lookup::Failed(JailError::io("opendir", &path, err)),
                }
            })
    }

    /// Names of every direct child of a directory.
    pub fn readdir(&self, path: &str) -> Lookup<Vec<String>> {
        self.opendir(path)
            .and_then(|dir| Lookup::from(dir.collect::<Result<Vec<_>, _>>().map(Some)))
    }

    /// Create a directory.
    ///
    /// With `recursive_parents`, missing ancestors are created too and an
    /// existing directory is not an error. Without it, the parent must
    /// exist and the directory must not.
    ///
    /// Only the deepest existing ancestor is resolved physically; everything
    /// below it is created fresh, so nothing can redirect the creation out
    /// of the jail.
    pub fn mkdir(&self, path: &str, mode: Mode, recursive_parents: bool) -> Result<(), JailError> {
        let rpath = normalize(path);
        debug!(path = %rpath, %mode, recursive_parents, "mkdir");

        if !recursive_parents {
            let target = self.creation_path(path, "mkdir")?;
            return dir_builder(mode, false)
                .create(target.as_path())
                .map_err(|err| JailError::io("mkdir", &rpath, err));
        }

        // Walk up to the deepest ancestor that already resolves
        let mut base = rpath.clone();
        let mut missing: Vec<String> = Vec::new();
        let existing = loop {
            match self.resolve_virtual(base.clone(), "mkdir") {
                Lookup::Found(dir) => break dir,
                Lookup::Failed(err) => return Err(err),
                Lookup::Absent => {
                    let Some(name) = base.file_name() else {
                        return Err(JailError::ParentNotFound {
                            op: "mkdir",
                            path: rpath,
                        });
                    };
                    missing.push(name.to_owned());
                    base = base.parent();
                }
            }
        };

        let is_dir = fs::metadata(existing.as_path())
            .map(|meta| meta.is_dir())
            .map_err(|err| JailError::io("mkdir", &base, err))?;
        if !is_dir {
            return Err(JailError::NotADirectory {
                op: "mkdir",
                path: base,
            });
        }
        let Some(first) = missing.last() else {
            return Ok(());
        };

        let mut physical = existing.into_inner();
        // Something there that resolution refused: an escaping or dangling link
        let occupied = fs::symlink_metadata(append_leaf(physical.clone(), first)).is_ok();
        if occupied && !self.follows_symlinks() {
            return Err(JailError::UnresolvableEntry {
                op: "mkdir",
                path: base.join(first),
            });
        }
        for name in missing.iter().rev() {
            physical = append_leaf(physical, name);
        }
        dir_builder(mode, true)
            .create(&physical)
            .map_err(|err| JailError::io("mkdir", &rpath, err))
    }

    /// Remove a directory.
    ///
    /// Without `recursive`, a non-empty directory fails and nothing is
    /// deleted. With it, the directory and everything below are removed;
    /// symlinks inside are unlinked, not followed. A symlink at `path` is
    /// not a directory and fails.
    pub fn rmdir(&self, path: &str, recursive: bool) -> Lookup<()> {
        let target = match self.resolve_entry(path, "rmdir") {
            Lookup::Found(target) => target,
            Lookup::Absent => return Lookup::Absent,
            Lookup::Failed(err) => return Lookup::Failed(err),
        };
        let (physical, rpath) = target.into_parts();
        debug!(path = %rpath, recursive, "rmdir");

        match fs::symlink_metadata(&physical) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Lookup::Failed(JailError::NotADirectory {
                    op: "rmdir",
                    path: rpath,
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Lookup::Absent,
            Err(err) => return Lookup::Failed(JailError::io("rmdir", &rpath, err)),
        }

        let removed = if recursive {
            fs::remove_dir_all(&physical)
        } else {
            fs::remove_dir(&physical)
        };
        match removed {
            Ok(()) => Lookup::Found(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Absent,
            Err(err) => Lookup::Failed(JailError::io("rmdir", &rpath, err)),
        }
    }
}
