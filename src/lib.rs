// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Theme installation and caching engine.
//!
//! Uthemer installs third-party visual theme packages onto a fixed set of
//! system resource files by applying binary delta patches. Pristine copies of
//! every patched resource are cached locally, so reinstalling or installing
//! another theme never has to re-read the slow backing storage that holds the
//! live resource tree.
//!
//! # Stores
//!
//! The engine coordinates three independent stores:
//!
//! 1. The __pristine cache__: a directory tree mirroring canonical resource
//!    paths, holding unmodified copies of every resource ever patched.
//! 2. The __installed-theme registry__: one JSON record per installed theme,
//!    keyed by the theme's filesystem-safe identifier.
//! 3. The __staged theme root__: one directory per installed theme holding
//!    its patched resource files.
//!
//! A theme is either fully installed (its record exists and its staged
//! directory exists) or not installed at all. A failed install rolls back
//! every partial output before returning.

pub mod config;
pub mod installer;
pub mod metadata;
pub mod path;
pub mod registry;

pub use config::Settings;
pub use installer::{InstallReport, Installer};
pub use metadata::{InstalledThemeRecord, ThemeDescriptor};
pub use registry::Registry;
