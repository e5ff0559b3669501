// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Theme install orchestration.
//!
//! The installer drives the end-to-end install sequence: open the package,
//! walk its entries, resolve each entry to a canonical resource target,
//! obtain pristine bytes from the cache, apply the delta patch, and write
//! the patched output into a staged install directory. On full success an
//! install record is persisted and the current-theme pointer is updated; on
//! any fatal failure the staged directory and record are erased so that no
//! half-installed theme survives.
//!
//! # Failure Policy
//!
//! Per-entry conditions are split into two classes. An entry with no known
//! resource target, or whose pristine source does not exist on this system,
//! is skipped: regional content legitimately does not exist everywhere, and
//! its absence must never abort an otherwise-healthy install. A patch
//! failure is different: it aborts the entire install on first occurrence,
//! because a half-patched resource set would leave the shared menu
//! resources inconsistent.
//!
//! Record persistence and current-theme activation failures are reported in
//! the [`InstallReport`] without rolling anything back. The patched
//! resources are correctly in place and independently useful even when the
//! bookkeeping around them failed.
//!
//! # Execution Model
//!
//! Everything here is synchronous and blocking. An install runs to full
//! completion or abort within one call, and only one install may be in
//! flight at a time; callers are expected to enforce that structurally.
//! There is no mid-flight cancellation.

pub mod cache;
pub mod patch;
pub mod resolve;

use crate::{
    config::Settings,
    installer::{
        cache::{CacheError, PristineCache},
        patch::{BpsPatcher, PatchError, PatchFormat, Patcher},
        resolve::{resolve, Resolved},
    },
    metadata::{InstalledThemeRecord, ThemeDescriptor},
    registry::Registry,
};

use std::{
    fs::{self, File},
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use zip::{result::ZipError, ZipArchive};

/// Subdirectory of a staged install holding the patched resource tree.
const CONTENT_DIR: &str = "content";

/// Theme installer.
///
/// Owns the collaborators an install needs: the pristine cache, the
/// installed-theme registry, and the delta patcher. The patcher is a type
/// parameter so tests can drive the whole orchestration with a stub instead
/// of real delta payloads.
#[derive(Debug)]
pub struct Installer<P = BpsPatcher>
where
    P: Patcher,
{
    settings: Settings,
    cache: PristineCache,
    registry: Registry,
    patcher: P,
}

impl Installer<BpsPatcher> {
    /// Construct installer over given settings with the default patcher.
    pub fn new(settings: Settings) -> Self {
        Self::with_patcher(settings, BpsPatcher)
    }
}

impl<P> Installer<P>
where
    P: Patcher,
{
    /// Construct installer over given settings and patcher.
    pub fn with_patcher(settings: Settings, patcher: P) -> Self {
        let cache = PristineCache::new(&settings.cache_root, &settings.resource_root);
        let registry = Registry::new(&settings.records_root, &settings.plugin_config);

        Self {
            settings,
            cache,
            registry,
            patcher,
        }
    }

    /// Access the installed-theme registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Install a theme package.
    ///
    /// Reinstalling an already-installed theme overwrites its prior staged
    /// directory and record; last install wins, and no explicit uninstall
    /// is required first.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError`] if the archive cannot be read, a patch
    ///   fails, or staged output cannot be written. Partial output is
    ///   erased before the error is returned.
    #[instrument(skip(self, package, descriptor), level = "debug")]
    pub fn install(
        &self,
        package: impl AsRef<Path>,
        descriptor: &ThemeDescriptor,
    ) -> Result<InstallReport> {
        let package = package.as_ref();
        let staged_dir = self.settings.themes_root.join(descriptor.display_label());
        let record_path = self.registry.record_path(&descriptor.theme_id_path);
        info!(
            "installing {} to {}",
            descriptor.theme_name,
            staged_dir.display()
        );

        // INVARIANT: An unreadable package must not disturb a prior healthy
        // install of the same theme, so the archive is opened before any
        // staged state gets touched.
        let mut archive = open_package(package)?;

        let (patched, skipped) = match self.write_staged_tree(&mut archive, &staged_dir) {
            Ok(counts) => counts,
            Err(err) => {
                // INVARIANT: No half-installed theme survives a failure.
                warn!(
                    "install of {} failed, erasing partial output",
                    descriptor.theme_name
                );
                self.delete(&staged_dir, &record_path);
                return Err(err);
            }
        };

        if patched == 0 {
            warn!(
                "no entry of {} produced output; every patchable entry was skipped",
                descriptor.theme_name
            );
        }

        let record = InstalledThemeRecord {
            descriptor: descriptor.clone(),
            installed_path: staged_dir.clone(),
        };
        let recorded = match self.registry.persist(&record) {
            Ok(()) => {
                info!("saved install record to {}", record_path.display());
                true
            }
            Err(err) => {
                warn!("theme installed, but its record could not be persisted: {err}");
                false
            }
        };
        let activated = self.registry.set_current_theme(&descriptor.display_label());

        Ok(InstallReport {
            staged_dir,
            record_path,
            patched,
            skipped,
            recorded,
            activated,
        })
    }

    /// Delete a staged install directory and its record file.
    ///
    /// Used both for explicit uninstall and for rollback after a failed
    /// install. Absence of either target is not an error; the operation is
    /// idempotent. Returns whether both targets are confirmed absent
    /// afterwards.
    pub fn delete(&self, staged_dir: impl AsRef<Path>, record_path: impl AsRef<Path>) -> bool {
        let staged_dir = staged_dir.as_ref();
        let record_path = record_path.as_ref();

        remove_path(staged_dir);
        remove_path(record_path);

        !staged_dir.exists() && !record_path.exists()
    }

    /// Uninstall a theme by its record key.
    ///
    /// Reads the install record to find the staged directory, then deletes
    /// both. A theme that was never installed counts as fully removed.
    #[instrument(skip(self), level = "debug")]
    pub fn uninstall(&self, theme_id_path: &str) -> bool {
        let record_path = self.registry.record_path(theme_id_path);

        match self.registry.read(theme_id_path) {
            Ok(record) => {
                info!("uninstalling {}", record.descriptor.display_label());
                self.delete(&record.installed_path, &record_path)
            }
            Err(_) if !record_path.exists() => {
                debug!("no install record for {theme_id_path}, nothing to remove");
                true
            }
            Err(err) => {
                warn!("unreadable install record for {theme_id_path}, removing it anyway: {err}");
                remove_path(&record_path);
                !record_path.exists()
            }
        }
    }

    /// Walk package entries and write every patched resource under the
    /// staged directory. Returns how many entries produced output and which
    /// entry names were skipped.
    fn write_staged_tree(
        &self,
        archive: &mut ZipArchive<File>,
        staged_dir: &Path,
    ) -> Result<(usize, Vec<String>)> {
        // Last install wins: start from a clean staged tree so stale output
        // from a prior install of the same theme cannot linger.
        remove_path(staged_dir);

        // INVARIANT: The staged directory exists even when every entry ends
        // up skipped, so a persisted record always points at a real path.
        mkdirp::mkdirp(staged_dir).map_err(|source| InstallError::StageWrite {
            path: staged_dir.to_path_buf(),
            source,
        })?;

        let mut patched = 0;
        let mut skipped = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|source| InstallError::EntryOpen { index, source })?;
            let entry_name = entry.name().to_string();

            let target = match resolve(&entry_name) {
                Resolved::Target(target) => target,
                Resolved::Skip => continue,
                Resolved::Unknown => {
                    warn!("no canonical target for entry {entry_name}, skipping");
                    skipped.push(entry_name);
                    continue;
                }
            };
            debug!("entry {entry_name} patches {}", target.display());

            let mut patch_bytes = Vec::new();
            entry
                .read_to_end(&mut patch_bytes)
                .map_err(|source| InstallError::EntryRead {
                    name: entry_name.clone(),
                    source,
                })?;

            let base = match self.cache.ensure_cached(&target) {
                Ok(bytes) => bytes,
                Err(CacheError::SourceMissing { path }) => {
                    // Out-of-region content: the source legitimately does
                    // not exist on this system, so the install continues.
                    info!(
                        "no pristine source at {}, skipping optional entry {entry_name}",
                        path.display()
                    );
                    skipped.push(entry_name);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let output = self
                .patcher
                .apply(&base, &patch_bytes, PatchFormat::Bps)
                .map_err(|source| InstallError::Patch {
                    entry: entry_name.clone(),
                    source,
                })?;

            let out_path = staged_dir.join(CONTENT_DIR).join(&target);
            if let Some(parent) = out_path.parent() {
                mkdirp::mkdirp(parent).map_err(|source| InstallError::StageWrite {
                    path: out_path.clone(),
                    source,
                })?;
            }
            fs::write(&out_path, &output).map_err(|source| InstallError::StageWrite {
                path: out_path.clone(),
                source,
            })?;
            debug!("wrote {}", out_path.display());
            patched += 1;
        }

        Ok((patched, skipped))
    }
}

/// Outcome of one successful install.
///
/// `recorded` and `activated` let callers distinguish "installed" from
/// "installed, but could not be recorded/activated"; both failures leave
/// the staged resources in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallReport {
    /// Staged directory the patched resources were written to.
    pub staged_dir: PathBuf,

    /// Path of the install record for this theme.
    pub record_path: PathBuf,

    /// Number of entries that produced patched output.
    pub patched: usize,

    /// Entry names skipped as unknown or missing optional content.
    pub skipped: Vec<String>,

    /// Whether the install record was persisted.
    pub recorded: bool,

    /// Whether the current-theme pointer was updated.
    pub activated: bool,
}

/// Open a theme package archive.
fn open_package(package: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(package).map_err(|source| InstallError::ArchiveOpen {
        path: package.to_path_buf(),
        source,
    })?;

    ZipArchive::new(file).map_err(|source| InstallError::ArchiveRead {
        path: package.to_path_buf(),
        source,
    })
}

/// Remove one path, file or directory, treating absence as success.
fn remove_path(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => debug!("deleted {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} could not be found, nothing to delete", path.display());
        }
        Err(err) => warn!("error deleting {}: {err}", path.display()),
    }
}

/// Install error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
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

    /// One archive entry cannot be opened.
    #[error("cannot open entry {index} of theme archive")]
    EntryOpen {
        index: usize,
        #[source]
        source: ZipError,
    },

    /// One archive entry cannot be read out.
    #[error("cannot read entry {name} from theme archive")]
    EntryRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Pristine cache failed for a reason other than absent source.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Delta patch application failed. Always fatal for the install.
    #[error("patch entry {entry} failed")]
    Patch {
        entry: String,
        #[source]
        source: PatchError,
    },

    /// Patched output cannot be written into the staged directory.
    #[error("cannot write staged resource {path}")]
    StageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handy result alias.
type Result<T, E = InstallError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    /// Stub patcher: output is base bytes with patch bytes appended, and a
    /// patch payload of `!corrupt` fails the way a rejected delta would.
    #[derive(Debug, Default)]
    struct StubPatcher;

    impl Patcher for StubPatcher {
        fn apply(
            &self,
            base: &[u8],
            patch: &[u8],
            format: PatchFormat,
        ) -> std::result::Result<Vec<u8>, PatchError> {
            if patch == b"!corrupt" {
                return Err(PatchError::Rejected {
                    format,
                    reason: "stub rejection".into(),
                });
            }

            let mut output = base.to_vec();
            output.extend_from_slice(patch);
            Ok(output)
        }
    }

    const EXAMPLE_METADATA: &str = r#"
        {
            "Metadata": {
                "themeID": "Example:1",
                "themeName": "Café",
                "themeAuthor": "Dev",
                "themeVersion": "1.0"
            }
        }
    "#;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        installer: Installer<StubPatcher>,
    }

    fn fixture() -> anyhow::Result<Fixture> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().to_path_buf();
        let settings = Settings {
            packages_dir: root.join("packages"),
            themes_root: root.join("themes"),
            cache_root: root.join("cache"),
            records_root: root.join("installed"),
            resource_root: root.join("live"),
            plugin_config: root.join("config").join("style-mii-u.json"),
        };
        let installer = Installer::with_patcher(settings, StubPatcher);

        Ok(Fixture {
            _dir: dir,
            root,
            installer,
        })
    }

    impl Fixture {
        fn write_live(&self, rel_path: &str, bytes: &[u8]) -> anyhow::Result<()> {
            let path = self.root.join("live").join(rel_path);
            mkdirp::mkdirp(path.parent().unwrap())?;
            fs::write(&path, bytes)?;

            Ok(())
        }

        fn write_plugin_config(&self, raw: &str) -> anyhow::Result<()> {
            let path = self.root.join("config").join("style-mii-u.json");
            mkdirp::mkdirp(path.parent().unwrap())?;
            fs::write(&path, raw)?;

            Ok(())
        }

        fn write_package(&self, name: &str, entries: &[(&str, &[u8])]) -> anyhow::Result<PathBuf> {
            let path = self.root.join(name);
            let file = File::create(&path)?;
            let mut archive = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            for (name, bytes) in entries {
                archive.start_file(*name, options)?;
                archive.write_all(bytes)?;
            }
            archive.finish()?;

            Ok(path)
        }
    }

    fn example_descriptor() -> ThemeDescriptor {
        ThemeDescriptor::new("Example:1", "Café", "Dev", "1.0")
    }

    #[test]
    fn install_stages_record_and_activates() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;
        fixture.write_live("UsEnglish/Message/AllMessage.szs", b"base-msg")?;
        fixture.write_plugin_config(r#"{"storageitems": {"enabledThemes": ""}}"#)?;

        let package = fixture.write_package(
            "example.utheme",
            &[
                ("metadata.json", EXAMPLE_METADATA.as_bytes()),
                ("Men.bps", b"+men"),
                ("AllMessage_UsEn.bps", b"+msg"),
            ],
        )?;

        let descriptor = example_descriptor();
        let report = fixture.installer.install(&package, &descriptor)?;

        assert_eq!(report.patched, 2);
        assert_eq!(report.skipped, Vec::<String>::new());
        assert!(report.recorded);
        assert!(report.activated);

        let staged = fixture.root.join("themes").join("Caf (Example1)");
        assert_eq!(report.staged_dir, staged);
        assert_eq!(
            fs::read(staged.join("content/Common/Package/Men.pack"))?,
            b"base-men+men"
        );
        assert_eq!(
            fs::read(staged.join("content/UsEnglish/Message/AllMessage.szs"))?,
            b"base-msg+msg"
        );

        let record = fixture.installer.registry().read("Example1")?;
        assert_eq!(record.descriptor, descriptor);
        assert_eq!(record.installed_path, staged);

        assert_eq!(
            fixture.installer.registry().current_theme(),
            "Caf (Example1)"
        );

        Ok(())
    }

    #[test]
    fn install_tolerates_unknown_and_missing_entries() -> anyhow::Result<()> {
        let fixture = fixture()?;

        // The reserved resource's live source is deliberately absent; only
        // the UsEn text bundle exists on this system.
        fixture.write_live("UsEnglish/Message/AllMessage.szs", b"base-msg")?;

        let package = fixture.write_package(
            "example.utheme",
            &[
                ("metadata.json", EXAMPLE_METADATA.as_bytes()),
                ("Men.bps", b"+men"),
                ("AllMessage_UsEn.bps", b"+msg"),
                ("AllMessage_ZzZz.bps", b"+zz"),
            ],
        )?;

        let descriptor = example_descriptor();
        let report = fixture.installer.install(&package, &descriptor)?;

        assert_eq!(report.patched, 1);
        assert_eq!(
            report.skipped,
            vec!["Men.bps".to_string(), "AllMessage_ZzZz.bps".to_string()]
        );

        let staged = report.staged_dir;
        assert!(staged.join("content/UsEnglish/Message/AllMessage.szs").exists());
        assert!(!staged.join("content/Common/Package/Men.pack").exists());

        let record = fixture.installer.registry().read("Example1")?;
        assert_eq!(record.descriptor.theme_id_path, "Example1");
        assert_eq!(record.descriptor.theme_name, "Caf");

        Ok(())
    }

    #[test]
    fn install_stages_under_themes_root_despite_hostile_name() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        let package = fixture.write_package(
            "evil.utheme",
            &[
                ("metadata.json", EXAMPLE_METADATA.as_bytes()),
                ("Men.bps", b"+men"),
            ],
        )?;

        // A descriptor name carrying separators and traversal sequences
        // must collapse into a single directory component under the root.
        let descriptor = ThemeDescriptor::new("Evil:1", "x/../../escaped", "Dev", "1.0");
        let report = fixture.installer.install(&package, &descriptor)?;

        let staged = fixture.root.join("themes").join("x....escaped (Evil1)");
        assert_eq!(report.staged_dir, staged);
        assert!(staged.join("content/Common/Package/Men.pack").exists());
        assert!(!fixture.root.join("escaped (Evil1)").exists());

        Ok(())
    }

    #[test]
    fn install_rolls_back_on_patch_failure() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;
        fixture.write_live("Common/Package/Men2.pack", b"base-men2")?;

        let package = fixture.write_package(
            "broken.utheme",
            &[
                ("metadata.json", EXAMPLE_METADATA.as_bytes()),
                ("Men.bps", b"+men"),
                ("Men2.bps", b"!corrupt"),
            ],
        )?;

        let descriptor = example_descriptor();
        let result = fixture.installer.install(&package, &descriptor);
        assert!(matches!(result, Err(InstallError::Patch { .. })));

        let staged = fixture.root.join("themes").join("Caf (Example1)");
        assert!(!staged.exists());
        assert!(!fixture.installer.registry().is_installed("Example1"));

        Ok(())
    }

    #[test]
    fn failed_reinstall_erases_prior_install() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        let good = fixture.write_package(
            "good.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+men")],
        )?;
        let bad = fixture.write_package(
            "bad.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"!corrupt")],
        )?;

        let descriptor = example_descriptor();
        fixture.installer.install(&good, &descriptor)?;
        assert!(fixture.installer.registry().is_installed("Example1"));

        let result = fixture.installer.install(&bad, &descriptor);
        assert!(result.is_err());
        assert!(!fixture.installer.registry().is_installed("Example1"));
        assert!(!fixture.root.join("themes").join("Caf (Example1)").exists());

        Ok(())
    }

    #[test]
    fn reinstall_is_last_install_wins() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        let first = fixture.write_package(
            "first.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+one")],
        )?;
        let second = fixture.write_package(
            "second.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+two")],
        )?;

        let descriptor = example_descriptor();
        fixture.installer.install(&first, &descriptor)?;
        let report = fixture.installer.install(&second, &descriptor)?;

        // Exactly one record, whose staged contents equal a fresh install
        // of the second package.
        assert_eq!(fixture.installer.registry().list().len(), 1);
        assert_eq!(
            fs::read(report.staged_dir.join("content/Common/Package/Men.pack"))?,
            b"base-men+two"
        );

        Ok(())
    }

    #[test]
    fn install_succeeds_with_all_entries_skipped() -> anyhow::Result<()> {
        let fixture = fixture()?;

        let package = fixture.write_package(
            "sparse.utheme",
            &[
                ("metadata.json", EXAMPLE_METADATA.as_bytes()),
                ("AllMessage_EuRu.bps", b"+ru"),
            ],
        )?;

        let descriptor = example_descriptor();
        let report = fixture.installer.install(&package, &descriptor)?;

        assert_eq!(report.patched, 0);
        assert!(report.recorded);
        assert!(report.staged_dir.exists());

        Ok(())
    }

    #[test]
    fn install_reports_activation_failure_without_rollback() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        // No plugin config document exists, so activation bookkeeping must
        // fail while the install itself succeeds.
        let package = fixture.write_package(
            "example.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+men")],
        )?;

        let descriptor = example_descriptor();
        let report = fixture.installer.install(&package, &descriptor)?;

        assert!(report.recorded);
        assert!(!report.activated);
        assert!(report.staged_dir.exists());

        Ok(())
    }

    #[test]
    fn uninstall_removes_record_and_staged_dir() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        let package = fixture.write_package(
            "example.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+men")],
        )?;

        let descriptor = example_descriptor();
        let report = fixture.installer.install(&package, &descriptor)?;

        assert!(fixture.installer.uninstall("Example1"));
        assert!(!report.staged_dir.exists());
        assert!(!report.record_path.exists());

        Ok(())
    }

    #[test]
    fn uninstall_of_absent_theme_is_fully_removed() -> anyhow::Result<()> {
        let fixture = fixture()?;

        assert!(fixture.installer.uninstall("Ghost"));

        Ok(())
    }

    #[test]
    fn cache_reads_live_source_at_most_once_across_installs() -> anyhow::Result<()> {
        let fixture = fixture()?;
        fixture.write_live("Common/Package/Men.pack", b"base-men")?;

        let package = fixture.write_package(
            "example.utheme",
            &[("metadata.json", EXAMPLE_METADATA.as_bytes()), ("Men.bps", b"+men")],
        )?;

        let descriptor = example_descriptor();
        fixture.installer.install(&package, &descriptor)?;

        // Mutate the live source between installs; the second install must
        // keep patching against the original cached bytes.
        fixture.write_live("Common/Package/Men.pack", b"MUTATED!")?;
        let report = fixture.installer.install(&package, &descriptor)?;

        assert_eq!(
            fs::read(report.staged_dir.join("content/Common/Package/Men.pack"))?,
            b"base-men+men"
        );

        Ok(())
    }
}
