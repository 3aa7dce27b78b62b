//! Async request APIs: `cookies()`, `headers()` and `draftMode()` return
//! promises and must be awaited.
//!
//! Detection is deliberately coarse: a file importing `next/headers` that
//! calls one of the accessors is flagged only when no awaited call appears
//! anywhere in it. Files mixing awaited and bare calls are missed, and matches
//! inside strings or comments count.

use super::AwaitPlan;
use crate::transform::{SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::sync::LazyLock;

const REQUEST_APIS: &[&str] = &["cookies", "headers", "draftMode"];
const REQUEST_API_MODULE: &str = "next/headers";

static REQUEST_API_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:cookies|headers|draftMode)\(\s*\)").unwrap());

static AWAITED_REQUEST_API_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bawait\s+(?:cookies|headers|draftMode)\(\s*\)").unwrap());

pub struct AsyncRequestApis;

impl TransformRule for AsyncRequestApis {
    fn tag(&self) -> TransformTag {
        TransformTag::AsyncRequestApis
    }

    fn description(&self) -> &'static str {
        "Await `cookies()`, `headers()` and `draftMode()` and make callers async"
    }

    fn detect(&self, text: &str) -> bool {
        let text = super::strip_comments(text);
        text.contains(REQUEST_API_MODULE)
            && REQUEST_API_CALL.is_match(&text)
            && !AWAITED_REQUEST_API_CALL.is_match(&text)
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        let mut plan = AwaitPlan::default();

        for call in tree.nodes_of_kind("call_expression") {
            let Some(function) = call.child_by_field_name("function") else {
                continue;
            };
            if function.kind() != "identifier" || !REQUEST_APIS.contains(&tree.text(function)) {
                continue;
            }
            let takes_no_arguments = call
                .child_by_field_name("arguments")
                .is_some_and(|args| args.named_child_count() == 0);
            let already_awaited = call
                .parent()
                .is_some_and(|parent| parent.kind() == "await_expression");
            if takes_no_arguments && !already_awaited {
                plan.await_node(tree, call);
            }
        }

        tree.apply(plan.into_edits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Dialect;

    const PAGE: &str = r#"import { cookies, headers } from 'next/headers';

export default function Page() {
  const theme = cookies().get('theme');
  const agent = headers();
  return <main data-theme={theme?.value}>{agent.get('user-agent')}</main>;
}
"#;

    #[test]
    fn test_detects_unawaited_calls() {
        let rule = AsyncRequestApis;
        assert!(rule.detect(PAGE));
        // No import from next/headers
        assert!(!rule.detect("const h = headers();"));
        // One awaited call anywhere suppresses detection
        assert!(!rule.detect(
            "import { cookies } from 'next/headers';\nconst a = await cookies();\nconst b = cookies();"
        ));
    }

    #[test]
    fn test_awaits_calls_and_marks_async() {
        let rule = AsyncRequestApis;
        let tree = SyntaxTree::parse(Dialect::Tsx, PAGE).unwrap();
        let rewritten = rule.rewrite(&tree).unwrap();
        let source = rewritten.source();

        assert!(source.contains("export default async function Page()"));
        assert!(source.contains("const theme = (await cookies()).get('theme');"));
        assert!(source.contains("const agent = await headers();"));
        assert!(!rule.detect(source));
    }

    #[test]
    fn test_arrow_route_handler() {
        let source = r#"import { headers } from 'next/headers';

export const GET = () => {
  return Response.json({ host: headers().get('host') });
};
"#;
        let tree = SyntaxTree::parse(Dialect::TypeScript, source).unwrap();
        let rewritten = AsyncRequestApis.rewrite(&tree).unwrap();

        assert!(rewritten
            .source()
            .contains("export const GET = async () => {"));
        assert!(rewritten.source().contains("host: (await headers()).get('host')"));
    }
}
