//! Declarative jail configuration.
//!
//! With the `serde` feature, [`JailConfig`] can be loaded from any serde
//! format, e.g. a `[storage]` table in an application's config file:
//!
//! ```toml
//! root = "/srv/tenants/acme"
//! follow_symlinks = false
//! ```

use std::path::PathBuf;

use crate::error::JailError;
use crate::Jail;

/// Settings for building a [`Jail`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JailConfig {
    pub root: PathBuf,
    #[cfg_attr(feature = "serde", serde(default))]
    pub follow_symlinks: bool,
}

impl JailConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
        }
    }

    /// Validate the root and build the jail.
    pub fn build(&self) -> Result<Jail, JailError> {
        Jail::builder(&self.root)
            .follow_symlinks(self.follow_symlinks)
            .build()
    }
}

impl TryFrom<JailConfig> for Jail {
    type Error = JailError;

    fn try_from(config: JailConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

impl TryFrom<&JailConfig> for Jail {
    type Error = JailError;

    fn try_from(config: &JailConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

impl From<&Jail> for JailConfig {
    fn from(jail: &Jail) -> Self {
        Self {
            root: jail.root().to_path_buf(),
            follow_symlinks: jail.follows_symlinks(),
        }
    }
}
