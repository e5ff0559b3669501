// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

//! Resource target resolution.
//!
//! Maps an archive entry name to the canonical relative path of the system
//! resource it patches. The mapping is constant for the process lifetime
//! and is expressed as plain data: a small closed table of reserved
//! filenames, plus a derived mapping for localized text resources.
//!
//! # Localized Text Resources
//!
//! Entries named `AllMessage_<RegionLang>.<ext>` patch the per-locale text
//! bundle of the matching region and language, e.g. `AllMessage_UsEn.bps`
//! patches `UsEnglish/Message/AllMessage.szs`. A token outside the lookup
//! table resolves to [`Resolved::Unknown`]: it is reported and skipped,
//! never patched into an undefined path, since regional content absence is
//! an expected condition rather than a defect.

use crate::metadata::METADATA_ENTRY;

use std::path::PathBuf;
use tracing::warn;

/// Outcome of resolving one archive entry name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Entry patches the resource at this canonical relative path.
    Target(PathBuf),

    /// Entry is not a patchable resource (the package descriptor).
    Skip,

    /// Entry name maps to no known resource. Reported, never fatal.
    Unknown,
}

/// Reserved entry names with fixed canonical targets.
const RESERVED_TARGETS: &[(&str, &str)] = &[
    ("Men.bps", "Common/Package/Men.pack"),
    ("Men2.bps", "Common/Package/Men2.pack"),
    ("cafe_barista_men.bps", "Common/Sound/Men/cafe_barista_men.bfsar"),
];

/// Region/language tokens and the per-locale text resource each one maps to.
const REGION_LANG_TARGETS: &[(&str, &str)] = &[
    ("UsEn", "UsEnglish/Message/AllMessage.szs"),
    ("UsFr", "UsFrench/Message/AllMessage.szs"),
    ("UsPt", "UsPortuguese/Message/AllMessage.szs"),
    ("UsEs", "UsSpanish/Message/AllMessage.szs"),
    ("EuNl", "EuDutch/Message/AllMessage.szs"),
    ("EuEn", "EuEnglish/Message/AllMessage.szs"),
    ("EuFr", "EuFrench/Message/AllMessage.szs"),
    ("EuDe", "EuGerman/Message/AllMessage.szs"),
    ("EuIt", "EuItalian/Message/AllMessage.szs"),
    ("EuPt", "EuPortuguese/Message/AllMessage.szs"),
    ("EuRu", "EuRussian/Message/AllMessage.szs"),
    ("EuEs", "EuSpanish/Message/AllMessage.szs"),
    ("JpJa", "JpJapanese/Message/AllMessage.szs"),
];

const ALL_MESSAGE_PREFIX: &str = "AllMessage_";

/// Resolve an archive entry name to its canonical resource target.
pub fn resolve(entry_name: &str) -> Resolved {
    if entry_name == METADATA_ENTRY {
        return Resolved::Skip;
    }

    if let Some((_, target)) = RESERVED_TARGETS
        .iter()
        .find(|(reserved, _)| *reserved == entry_name)
    {
        return Resolved::Target(PathBuf::from(target));
    }

    if let Some(rest) = entry_name.strip_prefix(ALL_MESSAGE_PREFIX) {
        let token = rest.split('.').next().unwrap_or(rest);

        return match REGION_LANG_TARGETS
            .iter()
            .find(|(candidate, _)| *candidate == token)
        {
            Some((_, target)) => Resolved::Target(PathBuf::from(target)),
            None => {
                warn!("unknown AllMessage region and language: {token}");
                Resolved::Unknown
            }
        };
    }

    Resolved::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("Men.bps", "Common/Package/Men.pack"; "men package")]
    #[test_case("Men2.bps", "Common/Package/Men2.pack"; "men2 package")]
    #[test_case(
        "cafe_barista_men.bps",
        "Common/Sound/Men/cafe_barista_men.bfsar";
        "sound bank"
    )]
    #[test_case("AllMessage_UsEn.bps", "UsEnglish/Message/AllMessage.szs"; "us english")]
    #[test_case("AllMessage_EuDe.bps", "EuGerman/Message/AllMessage.szs"; "eu german")]
    #[test_case("AllMessage_JpJa.bps", "JpJapanese/Message/AllMessage.szs"; "jp japanese")]
    #[test]
    fn resolve_maps_known_entries(entry: &str, target: &str) {
        assert_eq!(resolve(entry), Resolved::Target(PathBuf::from(target)));
    }

    #[test]
    fn resolve_skips_descriptor_entry() {
        assert_eq!(resolve("metadata.json"), Resolved::Skip);
    }

    #[test_case("AllMessage_ZzZz.bps"; "unknown region token")]
    #[test_case("AllMessage_.bps"; "empty region token")]
    #[test_case("readme.txt"; "stray file")]
    #[test_case("Men3.bps"; "unreserved patch name")]
    #[test]
    fn resolve_reports_unknown_entries(entry: &str) {
        assert_eq!(resolve(entry), Resolved::Unknown);
    }

    #[test]
    fn every_region_token_resolves() {
        for (token, target) in REGION_LANG_TARGETS {
            let entry = format!("AllMessage_{token}.bps");
            assert_eq!(resolve(&entry), Resolved::Target(PathBuf::from(target)));
        }
    }
}
