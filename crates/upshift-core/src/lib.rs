//! Upshift Core - Headless engine for upgrading Next.js projects across a
//! major version.
//!
//! The crate scans a project, rewrites the files that need mechanical changes
//! and keeps reversible snapshots of everything it touches. The CLI in
//! `upshift-cli` is a thin consumer of the types exported here.
//!
//! # Example
//!
//! ```rust,ignore
//! use upshift::{MigrateOptions, Migrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> upshift::Result<()> {
//!     let migrator = Migrator::new("/path/to/site")?;
//!
//!     let report = migrator.analyze().await;
//!     println!("{} file(s) to migrate", report.file_records.len());
//!
//!     if report.is_compatible {
//!         let outcome = migrator.migrate(&report, MigrateOptions::default()).await?;
//!         println!("{:?}", outcome);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod perf;
pub mod scanner;
pub mod snapshot;
pub mod transform;

mod atomic;
mod migrator;

// Re-export commonly used types
pub use engine::{FileState, PipelineRun, PipelineStep, RewriteEngine};
pub use error::{Result, UpshiftError};
pub use migrator::{MigrateOptions, MigrationOutcome, Migrator};
pub use models::{
    AnalysisReport, Change, ChangeKind, ComplexityTier, FileCategory, FileError, FileRecord,
    Issue, IssueKind, MigrationResult, PlannedChange, Severity,
};
pub use perf::{measure_build, BuildCommand, BuildDelta, BuildMetrics};
pub use scanner::{Analyzer, NodeRuntime, RuntimeProbe, StaticRuntime};
pub use snapshot::{
    CleanupReport, RestoreManager, RestoreReport, RestoreStatus, Snapshot, SnapshotAttempt,
    SnapshotCatalog, SnapshotManager,
};
pub use transform::{SyntaxTree, TransformError, TransformRegistry, TransformRule, TransformTag};
