// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Pristine resource caching.
//!
//! Guarantees a pristine copy of a target resource exists locally before it
//! gets patched. The cache root mirrors the canonical relative-path
//! hierarchy of the live resource tree, and a cache entry, once created, is
//! treated as immutable truth for that path: it is never refreshed in
//! place. Staleness is an accepted tradeoff for install speed, given how
//! slow the backing storage that holds the live tree can be.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Local cache of pristine resource files.
#[derive(Clone, Debug)]
pub struct PristineCache {
    cache_root: PathBuf,
    source_root: PathBuf,
}

impl PristineCache {
    /// Construct cache over given cache root and live source root.
    pub fn new(cache_root: impl Into<PathBuf>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            source_root: source_root.into(),
        }
    }

    /// Produce the pristine bytes for a canonical relative resource path.
    ///
    /// A cache hit returns the cached bytes verbatim with no freshness
    /// check. A miss reads the live source file, persists a verbatim copy
    /// into the cache (creating intermediate directories as needed), and
    /// returns the bytes.
    ///
    /// # Errors
    ///
    /// - Return [`CacheError::SourceMissing`] if the live source file does
    ///   not exist. Callers treat this as non-fatal for the entry: it
    ///   commonly indicates optional regional content absent on this
    ///   system, and the entry must be skipped rather than aborting the
    ///   whole install.
    /// - Return [`CacheError::ReadCache`], [`CacheError::ReadSource`], or
    ///   [`CacheError::WriteCache`] on I/O failure.
    pub fn ensure_cached(&self, rel_path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let rel_path = rel_path.as_ref();
        let cache_path = self.cache_root.join(rel_path);

        if cache_path.exists() {
            debug!("found {} in cache at {}", rel_path.display(), cache_path.display());
            return fs::read(&cache_path).map_err(|source| CacheError::ReadCache {
                path: cache_path,
                source,
            });
        }

        let source_path = self.source_root.join(rel_path);
        info!(
            "cache does not exist, creating cache for {}",
            source_path.display()
        );

        let bytes = match fs::read(&source_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CacheError::SourceMissing { path: source_path })
            }
            Err(source) => {
                return Err(CacheError::ReadSource {
                    path: source_path,
                    source,
                })
            }
        };

        if let Some(parent) = cache_path.parent() {
            mkdirp::mkdirp(parent).map_err(|source| CacheError::WriteCache {
                path: cache_path.clone(),
                source,
            })?;
        }
        fs::write(&cache_path, &bytes).map_err(|source| CacheError::WriteCache {
            path: cache_path.clone(),
            source,
        })?;
        debug!("cached pristine copy to {}", cache_path.display());

        Ok(bytes)
    }
}

/// Cache error types.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Live source file does not exist. Non-fatal for the entry.
    #[error("no pristine source at {path}")]
    SourceMissing { path: PathBuf },

    /// Existing cache entry cannot be read.
    #[error("cannot read cache entry {path}")]
    ReadCache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Live source file exists but cannot be read.
    #[error("cannot read pristine source {path}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache entry cannot be written.
    #[error("cannot write cache entry {path}")]
    WriteCache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handy result alias.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
