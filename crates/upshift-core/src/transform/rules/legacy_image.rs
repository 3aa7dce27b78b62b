//! `next/legacy/image` → `next/image`.

use crate::transform::{Edit, SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::sync::LazyLock;

static LEGACY_IMAGE_SPECIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']next/legacy/image["']"#).unwrap());

const LEGACY_MODULE: &str = "next/legacy/image";
const MODULE: &str = "next/image";

pub struct LegacyImageImport;

impl TransformRule for LegacyImageImport {
    fn tag(&self) -> TransformTag {
        TransformTag::LegacyImageImport
    }

    fn description(&self) -> &'static str {
        "Import `Image` from `next/image` instead of the removed `next/legacy/image`"
    }

    fn detect(&self, text: &str) -> bool {
        LEGACY_IMAGE_SPECIFIER.is_match(&super::strip_comments(text))
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        let edits = tree
            .nodes_of_kind("string")
            .into_iter()
            .filter_map(|node| {
                let literal = tree.text(node);
                let quote = literal.chars().next()?;
                let inner = literal.get(1..literal.len().checked_sub(1)?)?;
                (inner == LEGACY_MODULE)
                    .then(|| Edit::replace(node.byte_range(), format!("{quote}{MODULE}{quote}")))
            })
            .collect();
        tree.apply(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Dialect;

    #[test]
    fn test_rewrites_static_and_dynamic_imports() {
        let source = r#"import Image from "next/legacy/image";
const Lazy = dynamic(() => import('next/legacy/image'));
"#;
        let rule = LegacyImageImport;
        assert!(rule.detect(source));

        let tree = SyntaxTree::parse(Dialect::Tsx, source).unwrap();
        let rewritten = rule.rewrite(&tree).unwrap();

        assert_eq!(
            rewritten.source(),
            "import Image from \"next/image\";\nconst Lazy = dynamic(() => import('next/image'));\n"
        );
        assert!(!rule.detect(rewritten.source()));
    }

    #[test]
    fn test_leaves_other_strings() {
        let source = "const path = 'next/legacy/image-helpers';\n";
        assert!(!LegacyImageImport.detect(source));
    }

    #[test]
    fn test_ignores_commented_import() {
        let source = "// import Image from 'next/legacy/image';\nimport Image from 'next/image';\n";
        assert!(!LegacyImageImport.detect(source));
    }
}
