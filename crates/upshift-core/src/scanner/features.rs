//! Detection of features removed in the target major.

use crate::models::FileCategory;
use regex::Regex;
use std::sync::LazyLock;

static AMP_USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]next/amp['"]|\bamp\s*:\s*(?:true|['"]hybrid['"])"#).unwrap()
});

static PPR_FLAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bppr\s*:").unwrap());

static DYNAMIC_IO_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdynamicIO\s*:").unwrap());

/// A feature whose use blocks the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemovedFeature {
    Amp,
    PartialPrerendering,
    DynamicIo,
}

impl RemovedFeature {
    pub const ALL: [RemovedFeature; 3] = [
        RemovedFeature::Amp,
        RemovedFeature::PartialPrerendering,
        RemovedFeature::DynamicIo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RemovedFeature::Amp => "AMP support",
            RemovedFeature::PartialPrerendering => "The `experimental.ppr` flag",
            RemovedFeature::DynamicIo => "The `experimental.dynamicIO` flag",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RemovedFeature::Amp => {
                "Remove `next/amp` imports and `amp` page config before upgrading"
            }
            RemovedFeature::PartialPrerendering => {
                "Replace `experimental.ppr` with the top-level `cacheComponents: true` option"
            }
            RemovedFeature::DynamicIo => {
                "Rename `experimental.dynamicIO` to the top-level `cacheComponents` option"
            }
        }
    }

    /// Whether `text` from a file of `category` uses this feature.
    pub fn is_used(&self, category: FileCategory, text: &str) -> bool {
        match self {
            RemovedFeature::Amp => AMP_USAGE.is_match(text),
            RemovedFeature::PartialPrerendering => {
                category == FileCategory::Config && PPR_FLAG.is_match(text)
            }
            RemovedFeature::DynamicIo => {
                category == FileCategory::Config && DYNAMIC_IO_FLAG.is_match(text)
            }
        }
    }
}

/// Removed features used by one file.
pub fn find_removed_features(category: FileCategory, text: &str) -> Vec<RemovedFeature> {
    RemovedFeature::ALL
        .into_iter()
        .filter(|feature| feature.is_used(category, text))
        .collect()
}
