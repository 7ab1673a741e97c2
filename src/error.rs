use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::virtual_path::VirtualPath;

/// Errors produced by jail construction and confined operations.
///
/// Per-call variants name the operation and the *virtual* path, so messages
/// never reveal where the jail lives on disk.
#[derive(Debug, Error)]
pub enum JailError {
    /// Jail root is missing, not a directory, or the filesystem root.
    #[error("invalid jail root '{}': {reason}", root.display())]
    InvalidRoot { root: PathBuf, reason: String },

    /// Underlying OS call failed.
    #[error("{op} '{path}': {source}")]
    Io {
        op: &'static str,
        path: VirtualPath,
        #[source]
        source: io::Error,
    },

    /// Parent directory of a path being created does not exist.
    #[error("{op} '{path}': parent directory does not exist")]
    ParentNotFound { op: &'static str, path: VirtualPath },

    /// A directory was required but something else was found.
    #[error("{op} '{path}': not a directory")]
    NotADirectory { op: &'static str, path: VirtualPath },

    /// The jail root itself cannot be the target of this operation.
    #[error("{op} '/': not allowed on the jail root")]
    RootNotAllowed { op: &'static str },

    /// Something exists at the path but cannot be resolved inside the jail
    /// (a dangling or escaping symlink).
    #[error("{op} '{path}': entry cannot be resolved inside the jail")]
    UnresolvableEntry { op: &'static str, path: VirtualPath },

    /// Malformed open or permission mode.
    #[error("invalid mode '{0}'")]
    InvalidMode(String),
}

impl JailError {
    pub(crate) fn io(op: &'static str, path: &VirtualPath, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.clone(),
            source,
        }
    }

    /// Name of the operation that failed, if the error came from one.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Self::Io { op, .. }
            | Self::ParentNotFound { op, .. }
            | Self::NotADirectory { op, .. }
            | Self::RootNotAllowed { op }
            | Self::UnresolvableEntry { op, .. } => Some(op),
            Self::InvalidRoot { .. } | Self::InvalidMode(_) => None,
        }
    }

    /// Underlying OS error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
