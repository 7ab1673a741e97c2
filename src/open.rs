//! Opening, reading and writing files inside a [`Jail`].
//!
//! Read modes resolve the path physically and return `Absent` for anything
//! missing or outside the jail. Creating modes (`w`, `a`, `w+`, `a+`) fall
//! back to [`Jail::resolve_for_create`] when the target does not exist yet.
//!
//! With the `secure-open` feature on Unix, every open also passes
//! `O_NOFOLLOW`. Resolution already returns a symlink-free path, so this
//! only bites when a symlink is swapped in at the final component between
//! resolution and open; the open then fails instead of following it.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::str::FromStr;

use crate::error::JailError;
use crate::jailed_path::JailedPath;
use crate::lookup::Lookup;
use crate::virtual_path::{normalize, VirtualPath};
use crate::Jail;

// O_NOFOLLOW values by platform (from POSIX/system headers)
#[cfg(all(feature = "secure-open", target_os = "linux"))]
const O_NOFOLLOW: i32 = 0o0400000;

#[cfg(all(
    feature = "secure-open",
    any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    )
))]
const O_NOFOLLOW: i32 = 0x0100;

// Fallback for other Unix-like systems
#[cfg(all(
    feature = "secure-open",
    unix,
    not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))
))]
const O_NOFOLLOW: i32 = 0;

/// Textual open mode, as in `fopen`: `r`, `w`, `a`, `r+`, `w+`, `a+`.
///
/// ```
/// use jail_fs::OpenMode;
///
/// let mode: OpenMode = "a+".parse()?;
/// assert_eq!(mode, OpenMode::AppendRead);
/// assert!(mode.creates());
/// # Ok::<(), jail_fs::JailError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// `r`
    Read,
    /// `w`: create or truncate
    Write,
    /// `a`: create, writes go to the end
    Append,
    /// `r+`: read and write an existing file
    ReadWrite,
    /// `w+`: create or truncate, readable
    WriteRead,
    /// `a+`: create, readable, writes go to the end
    AppendRead,
}

impl OpenMode {
    /// Whether this mode may create the file.
    pub fn creates(self) -> bool {
        !matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::Append => "a",
            Self::ReadWrite => "r+",
            Self::WriteRead => "w+",
            Self::AppendRead => "a+",
        }
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::Write => options.write(true).create(true).truncate(true),
            Self::Append => options.append(true).create(true),
            Self::ReadWrite => options.read(true).write(true),
            Self::WriteRead => options.read(true).write(true).create(true).truncate(true),
            Self::AppendRead => options.read(true).append(true).create(true),
        };
        #[cfg(all(feature = "secure-open", unix))]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(O_NOFOLLOW);
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = JailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // fopen's "b" flag is meaningless here; accept and ignore it
        let mode: String = s.trim().chars().filter(|c| *c != 'b').collect();
        match mode.as_str() {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "a" => Ok(Self::Append),
            "r+" => Ok(Self::ReadWrite),
            "w+" => Ok(Self::WriteRead),
            "a+" => Ok(Self::AppendRead),
            _ => Err(JailError::InvalidMode(s.to_owned())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file opened through a [`Jail`].
///
/// Dropping it closes the file.
#[derive(Debug)]
pub struct JailedFile {
    inner: File,
    path: VirtualPath,
}

impl JailedFile {
    /// Virtual path the file was opened at.
    #[inline]
    pub fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    /// Returns the underlying [`File`].
    #[inline]
    pub fn into_inner(self) -> File {
        self.inner
    }
}

impl std::ops::Deref for JailedFile {
    type Target = File;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for JailedFile {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl io::Read for JailedFile {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl io::Write for JailedFile {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl io::Seek for JailedFile {
    #[inline]
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Jail {
    /// Open a file in the given mode.
    ///
    /// The caller owns the returned handle. A missing file in a read mode
    /// is `Absent`; in a creating mode it is created, provided its parent
    /// directory exists inside the jail.
    ///
    /// ```no_run
    /// use jail_fs::{Jail, OpenMode};
    /// use std::io::Write;
    ///
    /// let jail = Jail::new("/var/uploads")?;
    /// if let Some(mut log) = jail.open("audit.log", OpenMode::Append).into_result()? {
    ///     log.write_all(b"uploaded\n")?;
    /// }
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(&self, path: &str, mode: OpenMode) -> Lookup<JailedFile> {
        self.open_as(path, mode, "open")
    }

    fn open_as(&self, path: &str, mode: OpenMode, op: &'static str) -> Lookup<JailedFile> {
        let target = match self.resolve_virtual(normalize(path), op) {
            Lookup::Found(target) => target,
            Lookup::Absent if mode.creates() => match self.creation_path(path, op) {
                Ok(target) => target,
                Err(err) => return Lookup::Failed(err),
            },
            Lookup::Absent => return Lookup::Absent,
            Lookup::Failed(err) => return Lookup::Failed(err),
        };
        open_resolved(target, mode, op)
    }

    /// Read a whole file.
    pub fn read(&self, path: &str) -> Lookup<Vec<u8>> {
        self.open_as(path, OpenMode::Read, "read").and_then(|mut file| {
            let mut contents = Vec::new();
            match file.read_to_end(&mut contents) {
                Ok(_) => Lookup::Found(contents),
                Err(err) => Lookup::Failed(JailError::io("read", &file.path, err)),
            }
        })
    }

    /// Read a whole file as UTF-8.
    pub fn read_to_string(&self, path: &str) -> Lookup<String> {
        self.open_as(path, OpenMode::Read, "read").and_then(|mut file| {
            let mut contents = String::new();
            match file.read_to_string(&mut contents) {
                Ok(_) => Lookup::Found(contents),
                Err(err) => Lookup::Failed(JailError::io("read", &file.path, err)),
            }
        })
    }

    /// Create or truncate a file and write `contents` to it.
    pub fn write<C: AsRef<[u8]>>(&self, path: &str, contents: C) -> Result<(), JailError> {
        let mut file = match self.open_as(path, OpenMode::Write, "write") {
            Lookup::Found(file) => file,
            // Parent vanished between resolution and open
            Lookup::Absent => {
                return Err(JailError::ParentNotFound {
                    op: "write",
                    path: normalize(path),
                })
            }
            Lookup::Failed(err) => return Err(err),
        };
        let written = file.write_all(contents.as_ref()).and_then(|()| file.flush());
        written.map_err(|err| JailError::io("write", &file.path, err))
    }
}

impl JailedPath {
    /// Open this already-resolved path.
    ///
    /// Does not re-resolve; prefer [`Jail::open`] unless the path was
    /// resolved just now.
    pub fn open(&self, mode: OpenMode) -> Lookup<JailedFile> {
        open_resolved(self.clone(), mode, "open")
    }
}

fn open_resolved(target: JailedPath, mode: OpenMode, op: &'static str) -> Lookup<JailedFile> {
    let (physical, path) = target.into_parts();
    match mode.options().open(&physical) {
        Ok(inner) => Lookup::Found(JailedFile { inner, path }),
        // Removed between resolution and open
        Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::Absent,
        Err(err) => Lookup::Failed(JailError::io(op, &path, err)),
    }
}
