//! A physical path produced by the jail's resolver.

use std::ffi::OsStr;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::virtual_path::VirtualPath;

/// A physical path resolved by a [`Jail`](crate::Jail), paired with the
/// virtual path it came from.
///
/// Only [`Jail::resolve`](crate::Jail::resolve) and
/// [`Jail::resolve_for_create`](crate::Jail::resolve_for_create) build one.
/// Unless the jail follows symlinks, the physical path is the jail root or
/// lies below it.
///
/// The value is a snapshot: the filesystem may change after it was made.
/// Resolve again rather than keeping it around.
///
/// ```no_run
/// use jail_fs::Jail;
///
/// let jail = Jail::new("/srv/assets")?;
/// if let Some(path) = jail.resolve("css/site.css").found() {
///     println!("{} -> {}", path.virtual_path(), path.display());
/// }
/// # Ok::<(), jail_fs::JailError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JailedPath {
    physical: PathBuf,
    virtual_path: VirtualPath,
}

impl JailedPath {
    pub(crate) fn new(physical: PathBuf, virtual_path: VirtualPath) -> Self {
        Self {
            physical,
            virtual_path,
        }
    }

    /// The jail-relative path this was resolved from.
    #[inline]
    pub fn virtual_path(&self) -> &VirtualPath {
        &self.virtual_path
    }

    #[inline]
    pub fn as_path(&self) -> &Path {
        &self.physical
    }

    /// Consumes the `JailedPath` and returns the physical [`PathBuf`].
    #[inline]
    pub fn into_inner(self) -> PathBuf {
        self.physical
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (PathBuf, VirtualPath) {
        (self.physical, self.virtual_path)
    }
}

impl Deref for JailedPath {
    type Target = Path;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.physical
    }
}

impl AsRef<Path> for JailedPath {
    #[inline]
    fn as_ref(&self) -> &Path {
        &self.physical
    }
}

impl AsRef<OsStr> for JailedPath {
    #[inline]
    fn as_ref(&self) -> &OsStr {
        self.physical.as_os_str()
    }
}

// Display shows the virtual path so it is safe to put in user-facing text.
impl fmt::Display for JailedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.virtual_path, f)
    }
}

impl From<JailedPath> for PathBuf {
    #[inline]
    fn from(path: JailedPath) -> Self {
        path.physical
    }
}
