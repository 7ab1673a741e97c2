//! Purely lexical normalization of jail-relative paths.
//!
//! Nothing here touches the filesystem. A [`VirtualPath`] only says where
//! something would be inside the jail; whether it exists, and whether it
//! physically stays inside, is decided by [`Jail::resolve`](crate::Jail::resolve).

use std::fmt;
use std::ops::Deref;

/// A jail-relative path: starts with `/`, no `.`, `..` or empty segments.
///
/// The jail root is `/`. Only [`normalize`] (and the helpers built on it)
/// can produce one, so every value upholds the invariant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualPath {
    inner: String,
}

impl VirtualPath {
    /// The jail root, `/`.
    pub fn root() -> Self {
        Self {
            inner: "/".to_owned(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// Segments below the root, left to right. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// Final segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent path. The root is its own parent.
    pub fn parent(&self) -> VirtualPath {
        match self.inner.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => Self {
                inner: self.inner[..idx].to_owned(),
            },
        }
    }

    /// Append `child` and normalize the result.
    ///
    /// `..` in `child` clamps at the jail root like any other input.
    pub fn join(&self, child: &str) -> VirtualPath {
        normalize(&format!("{}/{}", self.inner, child))
    }
}

impl Deref for VirtualPath {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AsRef<str> for VirtualPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl PartialEq<str> for VirtualPath {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl PartialEq<&str> for VirtualPath {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

impl From<VirtualPath> for String {
    #[inline]
    fn from(path: VirtualPath) -> Self {
        path.inner
    }
}

#[inline]
fn is_separator(c: char) -> bool {
    // Backslash is an ordinary filename character on Unix
    c == '/' || (cfg!(windows) && c == '\\')
}

/// Normalize any path string into a [`VirtualPath`].
///
/// Input is treated as rooted at `/` whether or not it starts with one.
/// `.` and empty segments are dropped; `..` pops the previous segment and
/// is silently dropped at the root, so the result can never climb above it.
///
/// ```
/// use jail_fs::normalize;
///
/// assert_eq!(normalize("/a/../../b"), "/b");
/// assert_eq!(normalize("a/./b//c/"), "/a/b/c");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> VirtualPath {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }

    if stack.is_empty() {
        return VirtualPath::root();
    }

    let mut inner = String::with_capacity(path.len() + 1);
    for segment in stack {
        inner.push('/');
        inner.push_str(segment);
    }
    VirtualPath { inner }
}

/// Normalize `path` and split off its final segment.
///
/// Returns `(parent, leaf)`. For the root, the leaf is empty and the parent
/// is `/`. The leaf never contains a separator and is never `.` or `..`.
///
/// ```
/// use jail_fs::dirname;
///
/// let (parent, leaf) = dirname("/a/b/../c.txt");
/// assert_eq!(parent, "/a");
/// assert_eq!(leaf, "c.txt");
/// ```
pub fn dirname(path: &str) -> (VirtualPath, String) {
    let normalized = normalize(path);
    let leaf = normalized.file_name().unwrap_or_default().to_owned();
    (normalized.parent(), leaf)
}
