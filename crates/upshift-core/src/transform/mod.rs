//! Transformation registry.
//!
//! Each [`TransformRule`] pairs a pure text predicate (`detect`) with a rewrite
//! over a parsed [`SyntaxTree`]. The [`TransformRegistry`] fixes the global
//! order in which rules run: structural renames first, call-site rewrites
//! last, so that later rules see the identifiers earlier rules produced.

mod syntax;

pub mod rules;

pub use syntax::{Dialect, Edit, SyntaxTree};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifier of one rewrite rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformTag {
    MiddlewareToProxy,
    StableCacheApis,
    LegacyImageImport,
    AsyncRequestApis,
    AsyncRouteParams,
    RevalidateTagProfile,
}

impl TransformTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformTag::MiddlewareToProxy => "middleware-to-proxy",
            TransformTag::StableCacheApis => "stable-cache-apis",
            TransformTag::LegacyImageImport => "legacy-image-import",
            TransformTag::AsyncRequestApis => "async-request-apis",
            TransformTag::AsyncRouteParams => "async-route-params",
            TransformTag::RevalidateTagProfile => "revalidate-tag-profile",
        }
    }
}

impl std::fmt::Display for TransformTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while parsing or rewriting a single file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("unsupported file extension: {0}")]
    UnsupportedDialect(String),

    #[error("parser initialization failed: {0}")]
    Language(String),

    #[error("parse failed")]
    ParseFailed,

    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("overlapping edits at byte {0}")]
    OverlappingEdits(usize),

    #[error("rewrite produced invalid source at {line}:{column}")]
    InvalidOutput { line: usize, column: usize },

    #[error("{} already exists", .0.display())]
    TargetExists(PathBuf),
}

/// A mechanical rewrite keyed by a [`TransformTag`].
pub trait TransformRule: Send + Sync {
    fn tag(&self) -> TransformTag;

    /// Human-readable summary used in previews and the change log.
    fn description(&self) -> &'static str;

    /// Whether the rule applies to this file content. Must be pure.
    fn detect(&self, text: &str) -> bool;

    /// Whether the rule may run on the file at `path`, relative to the project root.
    fn applies_to(&self, _path: &Path) -> bool {
        true
    }

    /// Produce a rewritten tree. The input is never mutated.
    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree, TransformError>;

    /// New on-disk location for the file once its rewrite has succeeded.
    fn renamed_path(&self, _path: &Path) -> Option<PathBuf> {
        None
    }
}

/// Ordered collection of rules; registration order is execution order.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    rules: Vec<Arc<dyn TransformRule>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry with every built-in rule in its canonical order.
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        registry.register(rules::MiddlewareToProxy);
        registry.register(rules::StableCacheApis);
        registry.register(rules::LegacyImageImport);
        registry.register(rules::AsyncRequestApis);
        registry.register(rules::AsyncRouteParams);
        registry.register(rules::RevalidateTagProfile);
        registry
    }

    /// Append a rule. A tag registered twice keeps its first position.
    pub fn register<R: TransformRule + 'static>(&mut self, rule: R) {
        if self.get(rule.tag()).is_some() {
            tracing::warn!("Transform {} already registered, ignoring", rule.tag());
            return;
        }
        self.rules.push(Arc::new(rule));
    }

    pub fn get(&self, tag: TransformTag) -> Option<&dyn TransformRule> {
        self.rules
            .iter()
            .find(|rule| rule.tag() == tag)
            .map(|rule| rule.as_ref())
    }

    pub fn tags(&self) -> Vec<TransformTag> {
        self.rules.iter().map(|rule| rule.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tags of the rules that apply to `path` and match `text`, in
    /// registration order.
    pub fn detect(&self, path: &Path, text: &str) -> Vec<TransformTag> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(path) && rule.detect(text))
            .map(|rule| rule.tag())
            .collect()
    }

    /// Reorder arbitrary tags into registration order, dropping unknown ones.
    pub fn ordered(&self, tags: &[TransformTag]) -> Vec<TransformTag> {
        self.rules
            .iter()
            .map(|rule| rule.tag())
            .filter(|tag| tags.contains(tag))
            .collect()
    }
}
