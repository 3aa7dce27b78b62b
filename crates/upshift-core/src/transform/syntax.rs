//! Immutable tree-sitter parse of one source file.
//!
//! Rules never edit a tree in place: they compute byte-range [`Edit`]s and
//! [`SyntaxTree::apply`] returns a freshly parsed tree, so every step of the
//! rewrite pipeline keeps its own before/after snapshot.

use super::TransformError;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Node, Parser, Tree};

/// Grammar used to parse a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Plain TypeScript (`.ts`, `.mts`, `.cts`); angle-bracket casts allowed.
    TypeScript,
    /// TSX, which also covers JavaScript and JSX sources.
    Tsx,
}

impl Dialect {
    /// Pick the grammar from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, TransformError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "ts" | "mts" | "cts" => Ok(Dialect::TypeScript),
            "tsx" | "js" | "jsx" | "mjs" | "cjs" => Ok(Dialect::Tsx),
            other => Err(TransformError::UnsupportedDialect(other.to_string())),
        }
    }

    fn language(&self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Replace `range` of the source with `replacement`. Empty ranges insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }
}

/// Parsed source text. Cheap to clone.
#[derive(Clone)]
pub struct SyntaxTree {
    dialect: Dialect,
    source: Arc<str>,
    tree: Tree,
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("dialect", &self.dialect)
            .field("bytes", &self.source.len())
            .finish()
    }
}

impl SyntaxTree {
    /// Parse `source`, rejecting text that contains syntax errors.
    pub fn parse(dialect: Dialect, source: impl Into<Arc<str>>) -> Result<Self, TransformError> {
        let source: Arc<str> = source.into();

        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language())
            .map_err(|e| TransformError::Language(format!("{:?}", e)))?;

        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or(TransformError::ParseFailed)?;

        let parsed = Self {
            dialect,
            source,
            tree,
        };

        if let Some((line, column)) = parsed.first_error() {
            return Err(TransformError::Syntax { line, column });
        }

        Ok(parsed)
    }

    /// Parse using the dialect implied by `path`.
    pub fn parse_file(path: &Path, source: impl Into<Arc<str>>) -> Result<Self, TransformError> {
        Self::parse(Dialect::from_path(path)?, source)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Every node in pre-order.
    pub fn descendants(&self) -> Vec<Node<'_>> {
        let mut nodes = Vec::new();
        let mut cursor = self.tree.walk();
        loop {
            nodes.push(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return nodes;
                }
            }
        }
    }

    /// Nodes of the given kind, in source order.
    pub fn nodes_of_kind(&self, kind: &str) -> Vec<Node<'_>> {
        self.descendants()
            .into_iter()
            .filter(|node| node.kind() == kind)
            .collect()
    }

    /// Apply edits and re-parse. Returns an unchanged clone for no edits.
    pub fn apply(&self, mut edits: Vec<Edit>) -> Result<SyntaxTree, TransformError> {
        if edits.is_empty() {
            return Ok(self.clone());
        }

        edits.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then(a.range.end.cmp(&b.range.end))
        });
        edits.dedup();

        for pair in edits.windows(2) {
            if pair[1].range.start < pair[0].range.end {
                return Err(TransformError::OverlappingEdits(pair[1].range.start));
            }
        }

        let added: usize = edits.iter().map(|e| e.replacement.len()).sum();
        let mut output = String::with_capacity(self.source.len() + added);
        let mut position = 0;
        for edit in &edits {
            output.push_str(&self.source[position..edit.range.start]);
            output.push_str(&edit.replacement);
            position = edit.range.end;
        }
        output.push_str(&self.source[position..]);

        SyntaxTree::parse(self.dialect, output).map_err(|e| match e {
            TransformError::Syntax { line, column } => TransformError::InvalidOutput { line, column },
            other => other,
        })
    }

    /// 1-based position of the first error or missing node.
    fn first_error(&self) -> Option<(usize, usize)> {
        if !self.root().has_error() {
            return None;
        }
        let node = self
            .descendants()
            .into_iter()
            .find(|node| node.is_error() || node.is_missing())
            .unwrap_or_else(|| self.root());
        let point = node.start_position();
        Some((point.row + 1, point.column + 1))
    }
}
