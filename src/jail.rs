use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::JailError;
use crate::jailed_path::JailedPath;
use crate::lookup::Lookup;
use crate::virtual_path::{dirname, normalize, VirtualPath};

/// A directory that every operation is confined to.
///
/// Built once, never mutated. Every call normalizes its input, resolves it
/// against the real filesystem and re-checks containment; nothing is cached,
/// so symlinks planted between calls are still caught.
///
/// Paths are jail-relative: `"/etc/passwd"` and `"etc/passwd"` both mean
/// `<root>/etc/passwd`. `..` clamps at the root instead of erroring.
#[derive(Debug, Clone)]
pub struct Jail {
    root: PathBuf,
    follow_symlinks: bool,
}

/// Builder for [`Jail`].
///
/// ```no_run
/// use jail_fs::Jail;
///
/// let jail = Jail::builder("/srv/tenants/acme")
///     .follow_symlinks(true)
///     .build()?;
/// assert!(jail.follows_symlinks());
/// # Ok::<(), jail_fs::JailError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use = "call build() to create the jail"]
pub struct JailBuilder {
    root: PathBuf,
    follow_symlinks: bool,
}

impl JailBuilder {
    /// Allow symlinks inside the jail to point anywhere.
    ///
    /// Off by default. When on, resolution skips the containment check.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Canonicalize and validate the root.
    ///
    /// Errors if the root does not exist, is not a directory, or is a
    /// filesystem root (`/`, `C:\`).
    pub fn build(self) -> Result<Jail, JailError> {
        let root = fs::canonicalize(&self.root).map_err(|err| JailError::InvalidRoot {
            root: self.root.clone(),
            reason: err.to_string(),
        })?;
        // Filesystem roots have no parent and would make the jail pointless
        if root.parent().is_none() {
            return Err(JailError::InvalidRoot {
                root,
                reason: "filesystem root cannot be a jail".into(),
            });
        }
        if !root.is_dir() {
            return Err(JailError::InvalidRoot {
                root,
                reason: "not a directory".into(),
            });
        }
        debug!(root = %root.display(), follow_symlinks = self.follow_symlinks, "jail created");
        Ok(Jail {
            root,
            follow_symlinks: self.follow_symlinks,
        })
    }
}

impl Jail {
    /// Create a jail rooted at the given directory, symlink escapes blocked.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, JailError> {
        Self::builder(root).build()
    }

    pub fn builder<P: AsRef<Path>>(root: P) -> JailBuilder {
        JailBuilder {
            root: root.as_ref().to_path_buf(),
            follow_symlinks: false,
        }
    }

    /// Returns the canonicalized root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// A copy of this jail with a different symlink policy, for one-off
    /// calls that need the other behavior.
    pub fn with_follow_symlinks(&self, follow: bool) -> Jail {
        Jail {
            root: self.root.clone(),
            follow_symlinks: follow,
        }
    }

    /// Resolve a caller path to a physical path inside the jail.
    ///
    /// Returns `Absent` when the target does not exist, and also when it
    /// resolves outside the root (unless the jail follows symlinks). Other
    /// OS failures, like permission denied or a file used as a directory,
    /// are `Failed`.
    pub fn resolve(&self, path: &str) -> Lookup<JailedPath> {
        self.resolve_virtual(normalize(path), "resolve")
    }

    pub(crate) fn resolve_virtual(
        &self,
        rpath: VirtualPath,
        op: &'static str,
    ) -> Lookup<JailedPath> {
        let candidate = self.candidate(&rpath);
        let physical = match fs::canonicalize(&candidate) {
            Ok(physical) => physical,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Lookup::Absent,
            Err(err) => return Lookup::Failed(JailError::io(op, &rpath, err)),
        };

        if !self.follow_symlinks && !self.is_contained(&physical) {
            warn!(
                path = %rpath,
                resolved = %physical.display(),
                "path resolves outside the jail"
            );
            return Lookup::Absent;
        }
        Lookup::Found(JailedPath::new(physical, rpath))
    }

    /// Whether `physical` is the root or lies below it.
    ///
    /// Compares whole components, so `/base-evil` is not inside `/base`.
    /// `physical` should already be canonical.
    pub fn is_contained<P: AsRef<Path>>(&self, physical: P) -> bool {
        physical.as_ref().starts_with(&self.root)
    }

    /// Map a physical path inside the jail back to its virtual path.
    ///
    /// Purely lexical: returns `None` if `physical` is not below the root.
    /// Useful for storing portable paths.
    pub fn virtualize<P: AsRef<Path>>(&self, physical: P) -> Option<VirtualPath> {
        let rest = physical.as_ref().strip_prefix(&self.root).ok()?;
        let joined: Vec<String> = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(normalize(&joined.join("/")))
    }

    /// Resolve a path that is about to be created.
    ///
    /// The parent must already exist inside the jail; the final segment is
    /// appended literally. It came out of the normalizer, so it cannot hold
    /// a separator or `..` and the result stays under the verified parent.
    ///
    /// Unless the jail follows symlinks, an existing symlink at the final
    /// segment must itself resolve inside the jail, otherwise this fails
    /// with [`JailError::UnresolvableEntry`].
    pub fn resolve_for_create(&self, path: &str) -> Result<JailedPath, JailError> {
        self.creation_path(path, "create")
    }

    pub(crate) fn creation_path(
        &self,
        path: &str,
        op: &'static str,
    ) -> Result<JailedPath, JailError> {
        let target = self.destination_path(path, op)?;
        if self.follow_symlinks {
            return Ok(target);
        }
        let (physical, rpath) = target.into_parts();
        let physical = self.check_leaf_link(physical, &rpath, op)?;
        Ok(JailedPath::new(physical, rpath))
    }

    /// Verified parent plus the literal final segment. Whatever sits at the
    /// final segment is not looked at, so a rename onto a symlink replaces
    /// the link itself.
    pub(crate) fn destination_path(
        &self,
        path: &str,
        op: &'static str,
    ) -> Result<JailedPath, JailError> {
        let (parent, leaf) = dirname(path);
        if leaf.is_empty() {
            return Err(JailError::RootNotAllowed { op });
        }
        let rpath = parent.join(&leaf);

        let dir = match self.resolve_virtual(parent.clone(), op) {
            Lookup::Found(dir) => dir,
            Lookup::Absent => return Err(JailError::ParentNotFound { op, path: rpath }),
            Lookup::Failed(err) => return Err(err),
        };
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(JailError::NotADirectory { op, path: parent }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(JailError::ParentNotFound { op, path: rpath })
            }
            Err(err) => return Err(JailError::io(op, &parent, err)),
        }

        let physical = append_leaf(dir.into_inner(), &leaf);
        Ok(JailedPath::new(physical, rpath))
    }

    // A symlink at the leaf would make writes land wherever it points.
    // One that resolves inside the jail is swapped for its target.
    fn check_leaf_link(
        &self,
        physical: PathBuf,
        rpath: &VirtualPath,
        op: &'static str,
    ) -> Result<PathBuf, JailError> {
        let is_link = fs::symlink_metadata(&physical)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return Ok(physical);
        }
        match fs::canonicalize(&physical) {
            Ok(target) if self.is_contained(&target) => Ok(target),
            _ => {
                warn!(path = %rpath, "refusing to create through unresolvable symlink");
                Err(JailError::UnresolvableEntry {
                    op,
                    path: rpath.clone(),
                })
            }
        }
    }

    /// Locate an existing entry without following a symlink at its final
    /// segment. The parent is physically resolved and verified.
    ///
    /// Mutating operations use this so they act on the entry itself: a
    /// symlink is renamed or removed, never its target.
    pub(crate) fn resolve_entry(&self, path: &str, op: &'static str) -> Lookup<JailedPath> {
        let (parent, leaf) = dirname(path);
        if leaf.is_empty() {
            return Lookup::Failed(JailError::RootNotAllowed { op });
        }
        let rpath = parent.join(&leaf);

        let dir = match self.resolve_virtual(parent, op) {
            Lookup::Found(dir) => dir,
            Lookup::Absent => return Lookup::Absent,
            Lookup::Failed(err) => return Lookup::Failed(err),
        };
        let physical = append_leaf(dir.into_inner(), &leaf);
        match fs::symlink_metadata(&physical) {
            Ok(_) => Lookup::Found(JailedPath::new(physical, rpath)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Absent,
            Err(err) => Lookup::Failed(JailError::io(op, &rpath, err)),
        }
    }

    // root + rpath as plain concatenation; rpath always starts with '/'.
    fn candidate(&self, rpath: &VirtualPath) -> PathBuf {
        let mut raw: OsString = self.root.clone().into_os_string();
        if !rpath.is_root() {
            raw.push(rpath.as_str());
        }
        PathBuf::from(raw)
    }
}

impl AsRef<Path> for Jail {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}

pub(crate) fn append_leaf(dir: PathBuf, leaf: &str) -> PathBuf {
    let needs_separator = dir.parent().is_some();
    let mut raw = dir.into_os_string();
    if needs_separator {
        raw.push(std::path::MAIN_SEPARATOR_STR);
    }
    raw.push(leaf);
    PathBuf::from(raw)
}
