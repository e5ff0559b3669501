// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Engine settings layout.
//!
//! Specify the layout for the settings file that Uthemer uses to locate
//! every directory and document it touches. File I/O is left to the caller
//! to figure out.
//!
//! Every store the engine coordinates is an explicit field here, so callers
//! (and tests) can redirect the package directory, the staged theme root,
//! the pristine cache, the record store, the live resource tree, and the
//! external plugin configuration document independently. Nothing in the
//! engine reaches for a hardcoded path.

use crate::path;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Engine settings.
///
/// Collects the filesystem roots the engine operates over. On a real
/// deployment `resource_root` points at the mounted live resource tree of
/// the system menu, and `plugin_config` at the configuration document owned
/// by the cooperating theme-loader plugin; the defaults keep everything
/// under the engine's own data directory so a fresh run is harmless.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Directory scanned for `.utheme` package files.
    pub packages_dir: PathBuf,

    /// Root holding one staged install directory per installed theme.
    pub themes_root: PathBuf,

    /// Root of the pristine-resource cache. Mirrors the canonical relative
    /// path hierarchy of the live resource tree.
    pub cache_root: PathBuf,

    /// Directory holding one install record per installed theme.
    pub records_root: PathBuf,

    /// Live system resource tree that pristine sources are read from.
    pub resource_root: PathBuf,

    /// External plugin configuration document tracking the active theme.
    /// Owned by the plugin, not by this engine.
    pub plugin_config: PathBuf,
}

impl Settings {
    /// Construct settings rooted under the default data directory.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if the data directory cannot be
    ///   determined.
    pub fn try_default() -> Result<Self> {
        let data = path::data_dir().map_err(ConfigError::NoWayHome)?;

        Ok(Self {
            packages_dir: data.join("themes"),
            themes_root: data.join("themes"),
            cache_root: data.join("cache"),
            records_root: data.join("installed"),
            resource_root: data.join("menu-content"),
            plugin_config: data.join("plugins").join("config").join("style-mii-u.json"),
        })
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        for field in [
            &mut settings.packages_dir,
            &mut settings.themes_root,
            &mut settings.cache_root,
            &mut settings.records_root,
            &mut settings.resource_root,
            &mut settings.plugin_config,
        ] {
            *field = PathBuf::from(
                shellexpand::full(field.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            );
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize settings.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize settings.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on settings.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to determine default data directory.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Handy result alias.
type Result<T, E = ConfigError> = std::result::Result<T, E>;
