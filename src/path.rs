// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations for the directories and files the engine
//! manages when the user has not redirected them through a settings file.

use std::path::PathBuf;

/// Determine default absolute path to the engine's data directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/uthemer` as the default
/// location for every engine-owned store. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the user's data directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("uthemer"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the engine's settings file.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if the user's config directory cannot be
///   determined.
pub fn default_settings_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("uthemer").join("settings.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Handy result alias.
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
