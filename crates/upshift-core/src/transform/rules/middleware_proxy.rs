//! `middleware` → `proxy` rename.
//!
//! The request interceptor entry point is now called `proxy` and lives in
//! `proxy.{ts,js}`. The identifier rename is a text rewrite; moving the file
//! is reported through [`TransformRule::renamed_path`] and carried out by the
//! engine after the content has been written. Only the entry file at the
//! project root or under `src/` is touched; other modules that happen to
//! export a `middleware` keep it.

use crate::transform::{Edit, SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static EXPORTED_MIDDLEWARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"export\s+(?:default\s+)?(?:async\s+)?function\s+middleware\b|export\s+(?:const|let|var)\s+middleware\b",
    )
    .unwrap()
});

const OLD_NAME: &str = "middleware";
const NEW_NAME: &str = "proxy";

pub struct MiddlewareToProxy;

impl TransformRule for MiddlewareToProxy {
    fn tag(&self) -> TransformTag {
        TransformTag::MiddlewareToProxy
    }

    fn description(&self) -> &'static str {
        "Rename the exported `middleware` function to `proxy`"
    }

    fn detect(&self, text: &str) -> bool {
        EXPORTED_MIDDLEWARE.is_match(&super::strip_comments(text))
    }

    fn applies_to(&self, path: &Path) -> bool {
        is_entry_file(path)
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        // Imported bindings belong to other modules and keep their names
        let edits = tree
            .nodes_of_kind("identifier")
            .into_iter()
            .filter(|node| tree.text(*node) == OLD_NAME)
            .filter(|node| !super::has_ancestor(*node, "import_statement"))
            .map(|node| Edit::replace(node.byte_range(), NEW_NAME))
            .collect();
        tree.apply(edits)
    }

    fn renamed_path(&self, path: &Path) -> Option<PathBuf> {
        if !is_entry_file(path) {
            return None;
        }
        let extension = path.extension()?.to_str()?;
        Some(path.with_file_name(format!("{}.{}", NEW_NAME, extension)))
    }
}

/// `middleware.*` at the project root or directly under `src/`.
fn is_entry_file(path: &Path) -> bool {
    let stem = path.file_stem().and_then(|s| s.to_str());
    let parent = path.parent().and_then(|p| p.to_str());
    stem == Some(OLD_NAME) && matches!(parent, Some("" | "src"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Dialect;

    const MIDDLEWARE: &str = r#"import { NextResponse } from 'next/server';
import type { NextRequest } from 'next/server';

export function middleware(request: NextRequest) {
  return NextResponse.redirect(new URL('/home', request.url));
}

export const config = { matcher: '/about/:path*' };
"#;

    #[test]
    fn test_detects_exported_function() {
        let rule = MiddlewareToProxy;
        assert!(rule.detect(MIDDLEWARE));
        assert!(rule.detect("export default async function middleware(req) {}"));
        assert!(rule.detect("export const middleware = auth((req) => {});"));
        assert!(!rule.detect("import { middleware } from './chain';"));
    }

    #[test]
    fn test_renames_declaration() {
        let rule = MiddlewareToProxy;
        let tree = SyntaxTree::parse(Dialect::TypeScript, MIDDLEWARE).unwrap();
        let rewritten = rule.rewrite(&tree).unwrap();

        assert!(rewritten
            .source()
            .contains("export function proxy(request: NextRequest)"));
        assert!(rewritten.source().contains("export const config"));
        assert!(!rule.detect(rewritten.source()));
    }

    #[test]
    fn test_renamed_path_only_for_middleware_files() {
        let rule = MiddlewareToProxy;
        assert_eq!(
            rule.renamed_path(Path::new("src/middleware.ts")),
            Some(PathBuf::from("src/proxy.ts"))
        );
        assert_eq!(
            rule.renamed_path(Path::new("middleware.js")),
            Some(PathBuf::from("proxy.js"))
        );
        assert_eq!(rule.renamed_path(Path::new("lib/auth.ts")), None);
        assert_eq!(rule.renamed_path(Path::new("lib/middleware.ts")), None);
    }

    #[test]
    fn test_applies_only_to_entry_files() {
        let rule = MiddlewareToProxy;
        assert!(rule.applies_to(Path::new("middleware.ts")));
        assert!(rule.applies_to(Path::new("src/middleware.js")));
        assert!(!rule.applies_to(Path::new("lib/middleware.ts")));
        assert!(!rule.applies_to(Path::new("src/lib/middleware.ts")));
        assert!(!rule.applies_to(Path::new("lib/auth.ts")));
    }
}
