//! Built-in rewrite rules for the 15 → 16 upgrade.
//!
//! Detection is a plain text predicate per rule so it can run over every
//! candidate file without parsing. Predicates only look at code: comments are
//! stripped first, since rewrites never touch them. Rewrites work on the
//! parsed tree.

mod cache_apis;
mod legacy_image;
mod middleware_proxy;
mod request_apis;
mod revalidate_tag;
mod route_params;

pub use cache_apis::StableCacheApis;
pub use legacy_image::LegacyImageImport;
pub use middleware_proxy::MiddlewareToProxy;
pub use request_apis::AsyncRequestApis;
pub use revalidate_tag::RevalidateTagProfile;
pub use route_params::AsyncRouteParams;

use super::{Edit, SyntaxTree};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;
use tree_sitter::Node;

static USE_CLIENT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A\s*(?:['"]use strict['"]\s*;?\s*)?['"]use client['"]"#).unwrap()
});

/// `text` with `//` and `/* */` comments removed.
///
/// Newlines are kept so line-anchored patterns still line up. String and
/// template literals are copied through untouched; regex literals are not
/// recognised.
fn strip_comments(text: &str) -> Cow<'_, str> {
    if !text.contains("//") && !text.contains("/*") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if ch == open || (ch == '\n' && open != '`') {
                quote = None;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (ch, next) {
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|c| *c != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = ' ';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
                out.push(' ');
            }
            ('\'' | '"' | '`', _) => {
                quote = Some(ch);
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    Cow::Owned(out)
}

/// Whether the module starts with a `'use client'` directive.
fn is_client_module(text: &str) -> bool {
    USE_CLIENT_DIRECTIVE.is_match(&strip_comments(text))
}

/// Node kinds that introduce a function body.
const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function_declaration",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Nearest function whose body contains `node`.
fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if FUNCTION_KINDS.contains(&candidate.kind()) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

fn is_async(function: Node<'_>) -> bool {
    let mut cursor = function.walk();
    let found = function
        .children(&mut cursor)
        .any(|child| child.kind() == "async");
    found
}

/// Whether any ancestor of `node` has the given kind.
fn has_ancestor(node: Node<'_>, kind: &str) -> bool {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if candidate.kind() == kind {
            return true;
        }
        current = candidate.parent();
    }
    false
}

/// An awaited expression in head position of a member access or call needs
/// parentheses: `cookies().get(x)` becomes `(await cookies()).get(x)`.
fn needs_parens(node: Node<'_>) -> bool {
    match node.parent() {
        Some(parent) => {
            matches!(
                parent.kind(),
                "member_expression"
                    | "subscript_expression"
                    | "call_expression"
                    | "non_null_expression"
            ) && parent.start_byte() == node.start_byte()
        }
        None => false,
    }
}

/// Edits that await expressions and mark their functions `async`.
#[derive(Default)]
struct AwaitPlan {
    edits: Vec<Edit>,
    async_functions: HashSet<usize>,
}

impl AwaitPlan {
    /// Prefix `node` with `await`, adding parentheses where precedence needs them.
    fn await_node(&mut self, tree: &SyntaxTree, node: Node<'_>) {
        let text = tree.text(node);
        let replacement = if needs_parens(node) {
            format!("(await {})", text)
        } else {
            format!("await {}", text)
        };
        self.edits.push(Edit::replace(node.byte_range(), replacement));
        self.require_async(node);
    }

    fn require_async(&mut self, node: Node<'_>) {
        let Some(function) = enclosing_function(node) else {
            // Module scope: top-level await
            return;
        };
        if is_async(function) || !self.async_functions.insert(function.start_byte()) {
            return;
        }
        let at = if function.kind() == "method_definition" {
            match function.child_by_field_name("name") {
                Some(name) => name.start_byte(),
                None => return,
            }
        } else {
            function.start_byte()
        };
        self.edits.push(Edit::insert(at, "async "));
    }

    fn into_edits(self) -> Vec<Edit> {
        self.edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Dialect;

    #[test]
    fn test_strip_comments() {
        let source = "// revalidateTag('a');\nrevalidateTag('b', 'max'); /* x\ny */ done();\n";
        assert_eq!(
            strip_comments(source),
            "\nrevalidateTag('b', 'max'); \n  done();\n"
        );
        // Comment markers inside strings are code
        let url = "fetch('https://example.com/*'); // trailing\n";
        assert_eq!(strip_comments(url), "fetch('https://example.com/*'); \n");
        assert!(matches!(strip_comments("a / b;"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_is_client_module() {
        assert!(is_client_module("'use client';\nexport default function A() {}"));
        assert!(is_client_module("// Search box\n\"use client\"\n"));
        assert!(!is_client_module("import x from 'y';\n'use client';"));
        assert!(!is_client_module("'use server';\n"));
    }

    #[test]
    fn test_enclosing_function_and_async() {
        let tree = SyntaxTree::parse(
            Dialect::TypeScript,
            "async function outer() { const inner = () => value; }\n",
        )
        .unwrap();
        let value = tree
            .nodes_of_kind("identifier")
            .into_iter()
            .find(|n| tree.text(*n) == "value")
            .unwrap();

        let function = enclosing_function(value).unwrap();
        assert_eq!(function.kind(), "arrow_function");
        assert!(!is_async(function));
        assert!(is_async(enclosing_function(function).unwrap()));
    }

    #[test]
    fn test_await_plan_marks_function_once() {
        let tree = SyntaxTree::parse(
            Dialect::TypeScript,
            "function load() { a(); b(); }\n",
        )
        .unwrap();
        let mut plan = AwaitPlan::default();
        for call in tree.nodes_of_kind("call_expression") {
            plan.await_node(&tree, call);
        }

        let rewritten = tree.apply(plan.into_edits()).unwrap();
        assert_eq!(
            rewritten.source(),
            "async function load() { await a(); await b(); }\n"
        );
    }

    #[test]
    fn test_method_gets_async_before_name() {
        let tree = SyntaxTree::parse(
            Dialect::TypeScript,
            "class Store { static load() { return read(); } }\n",
        )
        .unwrap();
        let call = tree.nodes_of_kind("call_expression")[0];
        let mut plan = AwaitPlan::default();
        plan.await_node(&tree, call);

        let rewritten = tree.apply(plan.into_edits()).unwrap();
        assert_eq!(
            rewritten.source(),
            "class Store { static async load() { return await read(); } }\n"
        );
    }
}
