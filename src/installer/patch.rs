// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Delta patch application.
//!
//! Thin contract wrapping the external delta-patch library. Patching is a
//! pure function over byte buffers with no side effects; the engine never
//! inspects patch internals. Any non-success result is fatal for the install
//! in progress, because a resource left un-patched or half-patched would
//! make the shared menu resources inconsistent.

/// Delta patch formats understood by the engine.
///
/// BPS is the only format theme packages currently carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatchFormat {
    /// Beat patch system, the format `.bps` package entries carry.
    #[default]
    Bps,
}

/// Layer of indirection for delta patch application.
pub trait Patcher {
    /// Apply `patch` to `base`, producing the patched bytes.
    ///
    /// # Errors
    ///
    /// - Return [`PatchError`] if the patch cannot be applied. Callers treat
    ///   any failure as fatal for the current install.
    fn apply(&self, base: &[u8], patch: &[u8], format: PatchFormat) -> Result<Vec<u8>>;
}

/// Patch application through the Flips delta library.
#[derive(Clone, Copy, Debug, Default)]
pub struct BpsPatcher;

impl Patcher for BpsPatcher {
    fn apply(&self, base: &[u8], patch: &[u8], format: PatchFormat) -> Result<Vec<u8>> {
        match format {
            PatchFormat::Bps => {
                let output = flips::BpsPatch::new(patch).apply(base)?;
                let bytes: &[u8] = output.as_ref();
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Patch application error types.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The delta library rejected the patch.
    #[error(transparent)]
    Bps(#[from] flips::Error),

    /// Patch payload is not usable for the requested format.
    #[error("unusable {format:?} patch: {reason}")]
    Rejected { format: PatchFormat, reason: String },
}

/// Handy result alias.
pub type Result<T, E = PatchError> = std::result::Result<T, E>;
