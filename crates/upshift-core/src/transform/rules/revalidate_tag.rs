//! `revalidateTag(tag)` takes a cache-life profile as its second argument.
//!
//! Single-argument calls gain the `'max'` profile unless the file already
//! sets a profile through `cacheLife(...)`.

use crate::transform::{Edit, SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::sync::LazyLock;

static REVALIDATE_TAG_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brevalidateTag\s*\(").unwrap());

// Also matches `unstable_cacheLife(`
static CACHE_PROFILE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cacheLife\s*\(").unwrap());

const FUNCTION_NAME: &str = "revalidateTag";
const DEFAULT_PROFILE_ARGUMENT: &str = ", 'max'";

pub struct RevalidateTagProfile;

impl TransformRule for RevalidateTagProfile {
    fn tag(&self) -> TransformTag {
        TransformTag::RevalidateTagProfile
    }

    fn description(&self) -> &'static str {
        "Pass the `'max'` cache-life profile to single-argument `revalidateTag` calls"
    }

    fn detect(&self, text: &str) -> bool {
        let text = super::strip_comments(text);
        if CACHE_PROFILE_MARKER.is_match(&text) {
            return false;
        }
        REVALIDATE_TAG_CALL.find_iter(&text).any(|m| {
            let preceded_by_dot = text[..m.start()].ends_with('.');
            !preceded_by_dot && count_arguments(&text[m.end()..]) == Some(1)
        })
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        let mut edits = Vec::new();

        for call in tree.nodes_of_kind("call_expression") {
            let is_target = call
                .child_by_field_name("function")
                .is_some_and(|f| f.kind() == "identifier" && tree.text(f) == FUNCTION_NAME);
            if !is_target {
                continue;
            }
            let Some(arguments) = call.child_by_field_name("arguments") else {
                continue;
            };

            let mut cursor = arguments.walk();
            let values: Vec<_> = arguments
                .named_children(&mut cursor)
                .filter(|node| node.kind() != "comment")
                .collect();
            if let [only] = values.as_slice() {
                edits.push(Edit::insert(only.end_byte(), DEFAULT_PROFILE_ARGUMENT));
            }
        }

        tree.apply(edits)
    }
}

/// Count the top-level arguments of a call whose `(` has just been consumed.
///
/// Returns `None` when the closing parenthesis is never found.
fn count_arguments(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut any_argument = false;
    let mut value_since_comma = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in rest.chars() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                any_argument = true;
                value_since_comma = true;
            }
            '(' | '[' | '{' => {
                depth += 1;
                any_argument = true;
                value_since_comma = true;
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    if !any_argument {
                        return Some(0);
                    }
                    // A trailing comma does not start another argument
                    return Some(if value_since_comma { commas + 1 } else { commas });
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                commas += 1;
                value_since_comma = false;
            }
            c if c.is_whitespace() => {}
            _ => {
                any_argument = true;
                value_since_comma = true;
            }
        }
    }

    None
}
