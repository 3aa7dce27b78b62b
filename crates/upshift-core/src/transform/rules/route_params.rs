//! Async route props: `params` and `searchParams` are promises.
//!
//! `params.slug` becomes `(await params).slug` and `const p = params` becomes
//! `const p = await params`; the enclosing function is made async. Like the
//! request API rule, detection is suppressed by any awaited use in the file.
//!
//! Client modules are left alone, as is any name the file declares as a
//! local variable (`const searchParams = useSearchParams()`).

use super::AwaitPlan;
use crate::transform::{Edit, SyntaxTree, TransformError, TransformRule, TransformTag};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const ROUTE_PROPS: &[&str] = &["params", "searchParams"];

static SYNC_PROP_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[^.\w$])(params|searchParams)\.[A-Za-z_$]").unwrap()
});

static SYNC_PROP_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)=\s*(params|searchParams)\s*(?:;|$)").unwrap());

static LOCAL_PROP_BINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:const|let|var)\s+(params|searchParams)\s*[:=;]").unwrap());

static AWAITED_PROP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bawait\s+(?:params|searchParams)\b").unwrap());

pub struct AsyncRouteParams;

impl TransformRule for AsyncRouteParams {
    fn tag(&self) -> TransformTag {
        TransformTag::AsyncRouteParams
    }

    fn description(&self) -> &'static str {
        "Await the `params`/`searchParams` route props before reading them"
    }

    fn detect(&self, text: &str) -> bool {
        if super::is_client_module(text) {
            return false;
        }
        let text = super::strip_comments(text);
        if AWAITED_PROP.is_match(&text) {
            return false;
        }

        let locals: HashSet<&str> = LOCAL_PROP_BINDING
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();
        SYNC_PROP_ACCESS
            .captures_iter(&text)
            .chain(SYNC_PROP_ALIAS.captures_iter(&text))
            .filter_map(|caps| caps.get(1))
            .any(|m| !locals.contains(m.as_str()))
    }

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError> {
        if super::is_client_module(tree.source()) {
            return Ok(tree.clone());
        }

        let locals = local_bindings(tree);
        let is_route_prop = |name: &str| ROUTE_PROPS.contains(&name) && !locals.contains(name);
        let mut plan = AwaitPlan::default();

        for member in tree.nodes_of_kind("member_expression") {
            let Some(object) = member.child_by_field_name("object") else {
                continue;
            };
            if object.kind() == "identifier" && is_route_prop(tree.text(object)) {
                plan.await_node(tree, object);
            }
        }

        for declarator in tree.nodes_of_kind("variable_declarator") {
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };
            if value.kind() == "identifier" && is_route_prop(tree.text(value)) {
                plan.await_node(tree, value);
            }
        }

        let edits: Vec<Edit> = plan.into_edits();
        tree.apply(edits)
    }
}

/// Route prop names the file declares as plain variables.
fn local_bindings(tree: &SyntaxTree) -> HashSet<&str> {
    tree.nodes_of_kind("variable_declarator")
        .into_iter()
        .filter_map(|declarator| declarator.child_by_field_name("name"))
        .filter(|name| name.kind() == "identifier")
        .map(|name| tree.text(name))
        .filter(|name| ROUTE_PROPS.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Dialect;

    #[test]
    fn test_detection() {
        let rule = AsyncRouteParams;
        assert!(rule.detect("export default function Page({ params }) { return params.slug; }"));
        assert!(rule.detect("function f(props) {\n  const q = searchParams;\n}"));
        assert!(!rule.detect("const id = router.params.id;"));
        assert!(!rule.detect("const { slug } = await params;\nparams.slug;"));
        assert!(!rule.detect("// params.slug\nexport const x = 1;"));
    }

    #[test]
    fn test_leaves_search_params_hook_alone() {
        let source = r#"import { useSearchParams } from 'next/navigation';

export default function Search() {
  const searchParams = useSearchParams();
  return <p>{searchParams.get('q')}</p>;
}
"#;
        let rule = AsyncRouteParams;
        assert!(!rule.detect(source));

        let tree = SyntaxTree::parse(Dialect::Tsx, source).unwrap();
        assert_eq!(rule.rewrite(&tree).unwrap().source(), source);

        let client = "'use client';\nexport function Filters({ searchParams }) {\n  return searchParams.q;\n}\n";
        assert!(!rule.detect(client));
        let tree = SyntaxTree::parse(Dialect::Tsx, client).unwrap();
        assert_eq!(rule.rewrite(&tree).unwrap().source(), client);
    }

    #[test]
    fn test_local_binding_only_shadows_its_own_name() {
        let source = r#"export default function Page({ params }: Props) {
  const searchParams = new URLSearchParams();
  return <a href={`?${searchParams.toString()}`}>{params.slug}</a>;
}
"#;
        let rule = AsyncRouteParams;
        assert!(rule.detect(source));

        let tree = SyntaxTree::parse(Dialect::Tsx, source).unwrap();
        let output = rule.rewrite(&tree).unwrap();
        assert!(output.source().contains("{(await params).slug}"));
        assert!(output.source().contains("searchParams.toString()"));
        assert!(!rule.detect(output.source()));
    }

    #[test]
    fn test_awaits_member_access_and_alias() {
        let source = r#"type Props = { params: { slug: string }; searchParams: { q?: string } };

export default function Page({ params, searchParams }: Props) {
  const query = searchParams;
  return <h1>{params.slug} {query.q}</h1>;
}
"#;
        let rule = AsyncRouteParams;
        assert!(rule.detect(source));

        let tree = SyntaxTree::parse(Dialect::Tsx, source).unwrap();
        let rewritten = rule.rewrite(&tree).unwrap();
        let output = rewritten.source();

        assert!(output.contains("export default async function Page({ params, searchParams }: Props)"));
        assert!(output.contains("const query = await searchParams;"));
        assert!(output.contains("<h1>{(await params).slug} {query.q}</h1>"));
        assert!(!rule.detect(output));
    }

    #[test]
    fn test_generate_metadata_arrow() {
        let source = "export const generateMetadata = ({ params }: Props) => ({ title: params.id });\n";
        let tree = SyntaxTree::parse(Dialect::TypeScript, source).unwrap();
        let rewritten = AsyncRouteParams.rewrite(&tree).unwrap();
        assert_eq!(
            rewritten.source(),
            "export const generateMetadata = async ({ params }: Props) => ({ title: (await params).id });\n"
        );
    }
}
