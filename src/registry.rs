// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Installed-theme registry and current-theme tracking.
//!
//! The registry owns the install-record store: one JSON document per
//! installed theme, filed under the records directory by the theme's
//! filesystem-safe key. It also tracks the single active theme, which lives
//! as one field inside a configuration document owned by the cooperating
//! theme-loader plugin — that document is only ever read-modify-written,
//! and every field other than the current-theme pointer is preserved.

use crate::metadata::{self, InstalledThemeRecord, RecordError};

use serde_json::Value;
use std::{ffi::OsStr, fs, path::PathBuf};
use tracing::{info, warn};

/// Installed-theme registry.
#[derive(Clone, Debug)]
pub struct Registry {
    records_root: PathBuf,
    plugin_config: PathBuf,
}

impl Registry {
    /// Construct registry over given records directory and plugin
    /// configuration document.
    pub fn new(records_root: impl Into<PathBuf>, plugin_config: impl Into<PathBuf>) -> Self {
        Self {
            records_root: records_root.into(),
            plugin_config: plugin_config.into(),
        }
    }

    /// Path of the record file for given theme key.
    pub fn record_path(&self, theme_id_path: &str) -> PathBuf {
        self.records_root.join(format!("{theme_id_path}.json"))
    }

    /// Check whether a record exists for given theme key.
    pub fn is_installed(&self, theme_id_path: &str) -> bool {
        self.record_path(theme_id_path).exists()
    }

    /// Read the install record for given theme key.
    ///
    /// # Errors
    ///
    /// - Return [`RecordError`] if the record is absent or unreadable.
    pub fn read(&self, theme_id_path: &str) -> Result<InstalledThemeRecord> {
        metadata::read_installed_record(self.record_path(theme_id_path))
    }

    /// Persist an install record, overwriting any prior record for the same
    /// theme key.
    ///
    /// # Errors
    ///
    /// - Return [`RecordError::Write`] if the records directory or the
    ///   record file cannot be written.
    pub fn persist(&self, record: &InstalledThemeRecord) -> Result<()> {
        let path = self.record_path(&record.descriptor.theme_id_path);

        mkdirp::mkdirp(&self.records_root).map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;
        let json = record.to_json().map_err(|source| RecordError::Malformed {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| RecordError::Write { path, source })?;

        Ok(())
    }

    /// List every readable install record, sorted by theme name.
    ///
    /// Unreadable record files are skipped with a warning rather than
    /// failing the whole listing.
    pub fn list(&self) -> Vec<InstalledThemeRecord> {
        let mut records = Vec::new();
        let entries = match fs::read_dir(&self.records_root) {
            Ok(entries) => entries,
            Err(_) => return records,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension() != Some(OsStr::new("json")) {
                continue;
            }

            match metadata::read_installed_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping unreadable install record {}: {err}", path.display()),
            }
        }

        records.sort_by(|a, b| a.descriptor.theme_name.cmp(&b.descriptor.theme_name));
        records
    }

    /// Point the plugin configuration document at given theme label.
    ///
    /// Failure is reported and returned as `false`, never propagated: the
    /// resources of an otherwise-successful install are correctly in place
    /// even when activation bookkeeping fails.
    pub fn set_current_theme(&self, label: &str) -> bool {
        match self.rewrite_current_theme(label) {
            Ok(()) => {
                info!("successfully set {label} as the current theme");
                true
            }
            Err(err) => {
                warn!(
                    "cannot update plugin config {}: {err}",
                    self.plugin_config.display()
                );
                false
            }
        }
    }

    /// Read the active theme label from the plugin configuration document.
    ///
    /// Returns an empty string if the document or the field is absent.
    pub fn current_theme(&self) -> String {
        let Ok(raw) = fs::read_to_string(&self.plugin_config) else {
            return String::new();
        };
        let Ok(doc) = serde_json::from_str::<Value>(&raw) else {
            return String::new();
        };

        doc.pointer("/storageitems/enabledThemes")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn rewrite_current_theme(&self, label: &str) -> Result<(), PluginConfigError> {
        let raw =
            fs::read_to_string(&self.plugin_config).map_err(PluginConfigError::Open)?;
        let mut doc: Value = serde_json::from_str(&raw).map_err(PluginConfigError::Parse)?;

        // INVARIANT: Rewrite exactly one field. Every other field in the
        // document belongs to the plugin and must survive untouched. The
        // document shape is the plugin's to get wrong, so an unexpected
        // shape is an error, never a panic.
        let root = doc.as_object_mut().ok_or(PluginConfigError::Shape)?;
        let items = root
            .entry("storageitems")
            .or_insert_with(|| Value::Object(Default::default()))
            .as_object_mut()
            .ok_or(PluginConfigError::Shape)?;
        items.insert("enabledThemes".to_string(), Value::String(label.to_string()));

        let output =
            serde_json::to_string_pretty(&doc).map_err(PluginConfigError::Parse)?;
        fs::write(&self.plugin_config, output).map_err(PluginConfigError::Write)?;

        Ok(())
    }
}

/// Plugin configuration document error types.
#[derive(Debug, thiserror::Error)]
pub enum PluginConfigError {
    /// Document cannot be opened.
    #[error("cannot open plugin config")]
    Open(#[source] std::io::Error),

    /// Document cannot be parsed or re-serialized.
    #[error("cannot parse plugin config")]
    Parse(#[source] serde_json::Error),

    /// Document is valid JSON but not shaped like a plugin config.
    #[error("plugin config is not a JSON object document")]
    Shape,

    /// Document cannot be rewritten.
    #[error("cannot write plugin config")]
    Write(#[source] std::io::Error),
}

/// Handy result alias.
type Result<T, E = RecordError> = std::result::Result<T, E>;
