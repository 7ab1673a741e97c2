//! Filesystem operations confined to a root directory.
//!
//! Every path a caller hands in is normalized lexically, resolved against
//! the real filesystem, and checked for containment before anything is
//! touched. Traversal (`../../etc/passwd`) clamps at the jail root and
//! symlinks that point outside the jail behave as if nothing were there.
//!
//! # Quick Start
//!
//! ```no_run
//! use jail_fs::{Jail, Lookup, OpenMode};
//! use std::io::Write;
//!
//! let jail = Jail::new("/var/uploads")?;
//!
//! jail.write("report.txt", b"hello")?;
//! match jail.read("report.txt") {
//!     Lookup::Found(bytes) => assert_eq!(bytes, b"hello"),
//!     Lookup::Absent => println!("no such file"),
//!     Lookup::Failed(err) => return Err(err.into()),
//! }
//!
//! let mut log = jail.open("audit.log", OpenMode::Append).unwrap_found();
//! log.write_all(b"read report.txt\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Outcomes
//!
//! Operations return [`Lookup`]: `Found`, `Absent` or `Failed`. A path that
//! does not exist and a path that escapes the jail both come back `Absent`,
//! so callers cannot probe what lies outside. Everything else the OS
//! reports (permission denied, a file used as a directory, a non-empty
//! directory removed without `recursive`) is `Failed` with a [`JailError`]
//! naming the operation and the virtual path.
//!
//! # Security
//!
//! - Resolution is never cached; the filesystem may change between calls.
//! - Containment compares whole path components, so `/base-evil` is not
//!   inside `/base`.
//! - Mutating operations resolve the parent physically and act on the entry
//!   itself, never on a symlink's target.
//! - Symlinks pointing outside the jail can be allowed jail-wide with
//!   [`JailBuilder::follow_symlinks`].
//!
//! This does not protect against a local attacker racing the filesystem
//! between resolution and use. The `secure-open` feature narrows that
//! window for the final path component on Unix.

mod config;
mod dir;
mod error;
mod jail;
mod jailed_path;
mod lookup;
mod metadata;
mod open;
mod ops;
mod virtual_path;

pub use config::JailConfig;
pub use dir::{JailedDir, Mode};
pub use error::JailError;
pub use jail::{Jail, JailBuilder};
pub use jailed_path::JailedPath;
pub use lookup::Lookup;
pub use metadata::{Entry, EntryKind};
pub use open::{JailedFile, OpenMode};
pub use virtual_path::{dirname, normalize, VirtualPath};
