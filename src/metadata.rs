// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Theme metadata extraction.
//!
//! A theme package is a zip archive that must carry one descriptor entry,
//! `metadata.json`, holding the identifying fields of the theme. This module
//! reads that descriptor, derives the filesystem-safe forms of its fields,
//! and reads/writes the symmetric install record persisted for every
//! installed theme.
//!
//! # Sanitization
//!
//! Two fields get derived forms on ingestion:
//!
//! - `theme_id_path` is `theme_id` with every character that is illegal in a
//!   path stripped out. It is the key an installed theme is filed under, so
//!   distinct themes with colliding display names still land in distinct
//!   records and directories.
//! - `theme_name` and `theme_author` are ASCII-sanitized for safe display
//!   and path embedding. Non-ASCII code points are dropped, not substituted.
//!
//! `theme_id` and `theme_version` are preserved verbatim.

use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};
use tracing::debug;
use zip::{result::ZipError, ZipArchive};

/// Name of the required descriptor entry inside a theme package.
pub const METADATA_ENTRY: &str = "metadata.json";

/// Descriptive metadata of one theme package.
///
/// Produced by parsing a package's embedded descriptor. Immutable once read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeDescriptor {
    /// Theme identifier, preserved unsanitized.
    pub theme_id: String,

    /// Theme identifier with path-illegal characters stripped. Used as the
    /// filesystem-safe key for records and staged directories.
    pub theme_id_path: String,

    /// Display name, ASCII-sanitized.
    pub theme_name: String,

    /// Author name, ASCII-sanitized.
    pub theme_author: String,

    /// Theme version, preserved unsanitized.
    pub theme_version: String,
}

impl ThemeDescriptor {
    /// Construct descriptor from raw package fields, deriving the sanitized
    /// forms.
    pub fn new(
        theme_id: impl Into<String>,
        theme_name: impl AsRef<str>,
        theme_author: impl AsRef<str>,
        theme_version: impl Into<String>,
    ) -> Self {
        let theme_id = theme_id.into();

        Self {
            theme_id_path: strip_path_illegal(&theme_id),
            theme_name: strip_non_ascii(theme_name.as_ref()),
            theme_author: strip_non_ascii(theme_author.as_ref()),
            theme_id,
            theme_version: theme_version.into(),
        }
    }

    /// Compose the display label of this theme.
    ///
    /// The label doubles as the staged install directory name and as the
    /// value written into the plugin configuration document, so two themes
    /// with the same display name remain distinguishable through their
    /// identifiers.
    ///
    /// # Invariants
    ///
    /// The label must always be a single path component. The name half gets
    /// the same path-illegal stripping as `theme_id_path`, so a descriptor
    /// carrying separators or traversal sequences in its name cannot steer
    /// the staged directory outside the themes root.
    pub fn display_label(&self) -> String {
        format!(
            "{} ({})",
            strip_path_illegal(&self.theme_name),
            self.theme_id_path
        )
    }
}

/// Persisted metadata of one installed theme.
///
/// Descriptor fields plus the staged directory holding the patched
/// resources. One record exists per distinct `theme_id_path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstalledThemeRecord {
    /// Descriptor of the theme as it was installed.
    pub descriptor: ThemeDescriptor,

    /// Staged directory holding the patched resource files.
    pub installed_path: PathBuf,
}

impl InstalledThemeRecord {
    /// Serialize record into its on-disk JSON form.
    ///
    /// # Errors
    ///
    /// - Return [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&RecordFile::from(self))
    }
}

/// Read package-level descriptive metadata.
///
/// Opens the package archive, locates the required `metadata.json` entry,
/// parses it, and derives the sanitized descriptor fields.
///
/// # Errors
///
/// - Return [`MetadataError::ArchiveOpen`] if the package cannot be opened.
/// - Return [`MetadataError::ArchiveRead`] if the archive is unreadable.
/// - Return [`MetadataError::MetadataMissing`] if the descriptor entry is
///   absent.
/// - Return [`MetadataError::MetadataMalformed`] if the descriptor cannot be
///   parsed.
pub fn read_package_metadata(package: impl AsRef<Path>) -> Result<ThemeDescriptor, MetadataError> {
    let package = package.as_ref();
    debug!("read package metadata from {}", package.display());

    let file = File::open(package).map_err(|source| MetadataError::ArchiveOpen {
        path: package.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| MetadataError::ArchiveRead {
        path: package.to_path_buf(),
        source,
    })?;

    let mut entry = match archive.by_name(METADATA_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(MetadataError::MetadataMissing {
                path: package.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(MetadataError::ArchiveRead {
                path: package.to_path_buf(),
                source,
            })
        }
    };

    let mut raw = String::new();
    entry
        .read_to_string(&mut raw)
        .map_err(|source| MetadataError::ArchiveRead {
            path: package.to_path_buf(),
            source: ZipError::Io(source),
        })?;

    let wire: MetadataFile =
        serde_json::from_str(&raw).map_err(|source| MetadataError::MetadataMalformed {
            path: package.to_path_buf(),
            source,
        })?;

    Ok(ThemeDescriptor::new(
        wire.metadata.theme_id,
        wire.metadata.theme_name,
        wire.metadata.theme_author,
        wire.metadata.theme_version,
    ))
}

/// Read one persisted install record.
///
/// Symmetric reader for the records written by the registry; fields map
/// one-to-one and are not re-sanitized.
///
/// # Errors
///
/// - Return [`RecordError::Open`] if the record file cannot be read.
/// - Return [`RecordError::Malformed`] if the record cannot be parsed.
pub fn read_installed_record(path: impl AsRef<Path>) -> Result<InstalledThemeRecord, RecordError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| RecordError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let wire: RecordFile =
        serde_json::from_str(&raw).map_err(|source| RecordError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(InstalledThemeRecord::from(wire))
}

/// Drop every non-ASCII code point from given string.
pub fn strip_non_ascii(value: &str) -> String {
    value.chars().filter(char::is_ascii).collect()
}

/// Characters never allowed into a record key or directory name.
const ILLEGAL_PATH_CHARS: &[char] = &[':', '/', '\\', '*', '?', '"', '<', '>', '|'];

/// Strip characters that are illegal in paths from given identifier.
pub fn strip_path_illegal(value: &str) -> String {
    value
        .chars()
        .filter(|c| !ILLEGAL_PATH_CHARS.contains(c))
        .collect()
}

/// Wire format of the `metadata.json` descriptor entry.
#[derive(Debug, Deserialize)]
struct MetadataFile {
    #[serde(rename = "Metadata")]
    metadata: MetadataFields,
}

#[derive(Debug, Deserialize)]
struct MetadataFields {
    #[serde(rename = "themeID")]
    theme_id: String,

    #[serde(rename = "themeName")]
    theme_name: String,

    #[serde(rename = "themeAuthor")]
    theme_author: String,

    #[serde(rename = "themeVersion")]
    theme_version: String,
}

/// Wire format of one install record file.
#[derive(Debug, Deserialize, Serialize)]
struct RecordFile {
    #[serde(rename = "ThemeData")]
    theme_data: RecordFields,
}

#[derive(Debug, Deserialize, Serialize)]
struct RecordFields {
    #[serde(rename = "themeID")]
    theme_id: String,

    #[serde(rename = "themeIDPath")]
    theme_id_path: String,

    #[serde(rename = "themeName")]
    theme_name: String,

    #[serde(rename = "themeAuthor")]
    theme_author: String,

    #[serde(rename = "themeVersion")]
    theme_version: String,

    #[serde(rename = "themeInstallPath")]
    theme_install_path: PathBuf,
}

impl From<&InstalledThemeRecord> for RecordFile {
    fn from(record: &InstalledThemeRecord) -> Self {
        Self {
            theme_data: RecordFields {
                theme_id: record.descriptor.theme_id.clone(),
                theme_id_path: record.descriptor.theme_id_path.clone(),
                theme_name: record.descriptor.theme_name.clone(),
                theme_author: record.descriptor.theme_author.clone(),
                theme_version: record.descriptor.theme_version.clone(),
                theme_install_path: record.installed_path.clone(),
            },
        }
    }
}

impl From<RecordFile> for InstalledThemeRecord {
    fn from(wire: RecordFile) -> Self {
        // INVARIANT: Record fields were sanitized at install time. Never
        // sanitize them again on the way back in.
        Self {
            descriptor: ThemeDescriptor {
                theme_id: wire.theme_data.theme_id,
                theme_id_path: wire.theme_data.theme_id_path,
                theme_name: wire.theme_data.theme_name,
                theme_author: wire.theme_data.theme_author,
                theme_version: wire.theme_data.theme_version,
            },
            installed_path: wire.theme_data.theme_install_path,
        }
    }
}

/// Package metadata error types.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Package archive cannot be opened.
    #[error("cannot open theme archive {path}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Package archive cannot be read.
    #[error("cannot read theme archive {path}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    /// Required descriptor entry is absent.
    #[error("theme archive {path} has no metadata.json entry")]
    MetadataMissing { path: PathBuf },

    /// Descriptor entry cannot be parsed.
    #[error("malformed metadata.json in theme archive {path}")]
    MetadataMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Install record error types.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Record file cannot be opened.
    #[error("cannot open install record {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record file cannot be parsed.
    #[error("malformed install record {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Record file cannot be written.
    #[error("cannot write install record {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
