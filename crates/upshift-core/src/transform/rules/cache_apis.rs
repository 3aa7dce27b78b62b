//! Stabilized cache APIs: `unstable_cacheLife` → `cacheLife`,
//! `unstable_cacheTag` → `cacheTag`.

use crate::transform::{Edit, SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::sync::LazyLock;

static UNSTABLE_CACHE_API: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bunstable_cache(?:Life|Tag)\b").unwrap());

const RENAMES: &[(&str, &str)] = &[
    ("unstable_cacheLife", "cacheLife"),
    ("unstable_cacheTag", "cacheTag"),
];

/// Identifier-like node kinds that can carry the old names.
const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "property_identifier",
    "shorthand_property_identifier",
];

pub struct StableCacheApis;

impl TransformRule for StableCacheApis {
    fn tag(&self) -> TransformTag {
        TransformTag::StableCacheApis
    }

    fn description(&self) -> &'static str {
        "Replace `unstable_cacheLife`/`unstable_cacheTag` with the stable `cacheLife`/`cacheTag`"
    }

    fn detect(&self, text: &str) -> bool {
        UNSTABLE_CACHE_API.is_match(&super::strip_comments(text))
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        let edits = tree
            .descendants()
            .into_iter()
            .filter(|node| IDENTIFIER_KINDS.contains(&node.kind()))
            .filter_map(|node| {
                let text = tree.text(node);
                RENAMES
                    .iter()
                    .find(|(old, _)| *old == text)
                    .map(|(_, new)| Edit::replace(node.byte_range(), *new))
            })
            .collect();
        tree.apply(edits)
    }
}
