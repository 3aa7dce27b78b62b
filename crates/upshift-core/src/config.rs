//! Centralized configuration for upshift.
//!
//! Version thresholds, scan patterns, snapshot layout and process timeouts.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    /// Directory (relative to the project root) holding all upshift state.
    pub const STATE_DIR_NAME: &'static str = ".upshift";
}

/// Framework and runtime version requirements.
pub struct VersionConfig;

impl VersionConfig {
    pub const FRAMEWORK_PACKAGE: &'static str = "next";
    pub const FRAMEWORK_NAME: &'static str = "Next.js";
    /// Lowest framework major the rewrite rules understand.
    pub const MIN_FRAMEWORK_MAJOR: u64 = 15;
    /// Major version the rules migrate to.
    pub const TARGET_FRAMEWORK_MAJOR: u64 = 16;
    /// Minimum Node.js version required by the target major.
    pub const MIN_NODE_VERSION: (u64, u64, u64) = (20, 9, 0);

    /// Auxiliary packages known not to work with the target major, paired
    /// with the recommendation shown for each.
    pub const INCOMPATIBLE_DEPENDENCIES: &'static [(&'static str, &'static str)] = &[
        (
            "@next/font",
            "Replace `@next/font` imports with the built-in `next/font` module",
        ),
        (
            "next-transpile-modules",
            "Remove `next-transpile-modules` and use the `transpilePackages` config option",
        ),
        (
            "next-pwa",
            "`next-pwa` is unmaintained; evaluate `@serwist/next` before upgrading",
        ),
    ];
}

/// Candidate file discovery.
pub struct ScanConfig;

impl ScanConfig {
    pub const MANIFEST_FILE: &'static str = "package.json";

    /// Individual files checked at fixed locations.
    pub const CANDIDATE_FILES: &'static [&'static str] = &[
        "next.config.js",
        "next.config.mjs",
        "next.config.ts",
        "next.config.cjs",
        "middleware.ts",
        "middleware.js",
        "proxy.ts",
        "proxy.js",
        "src/middleware.ts",
        "src/middleware.js",
        "src/proxy.ts",
        "src/proxy.js",
    ];

    /// Directory trees walked recursively.
    pub const CANDIDATE_TREES: &'static [&'static str] = &[
        "app",
        "pages",
        "components",
        "lib",
        "src/app",
        "src/pages",
        "src/components",
        "src/lib",
    ];

    pub const SOURCE_EXTENSIONS: &'static [&'static str] =
        &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

    /// Directory names never descended into.
    pub const IGNORED_DIRS: &'static [&'static str] =
        &["node_modules", ".next", ".git", ".upshift", "dist", "build", "out"];

    // Complexity thresholds (strictly greater than)
    pub const HIGH_FILE_THRESHOLD: usize = 50;
    pub const HIGH_ISSUE_THRESHOLD: usize = 5;
    pub const MEDIUM_FILE_THRESHOLD: usize = 20;
    pub const MEDIUM_ISSUE_THRESHOLD: usize = 2;
}

/// Snapshot catalog and file-copy layout.
pub struct SnapshotConfig;

impl SnapshotConfig {
    pub const CATALOG_FILENAME: &'static str = "snapshots.json";
    pub const SNAPSHOTS_DIR_NAME: &'static str = "snapshots";
    /// Entries kept after every insert.
    pub const CATALOG_CAPACITY: usize = 10;
    /// Entries kept after an explicit cleanup.
    pub const CLEANUP_RETAIN: usize = 5;

    /// Project-root files copied into every snapshot.
    pub const CRITICAL_FILES: &'static [&'static str] = &[
        "package.json",
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "bun.lockb",
        "tsconfig.json",
        "next.config.js",
        "next.config.mjs",
        "next.config.ts",
        "next.config.cjs",
        ".env",
        ".env.local",
        ".env.development",
        ".env.development.local",
        ".env.production",
        ".env.production.local",
        ".env.test",
        "middleware.ts",
        "middleware.js",
        "proxy.ts",
        "proxy.js",
        "src/middleware.ts",
        "src/middleware.js",
        "src/proxy.ts",
        "src/proxy.js",
    ];

    /// Files a migration may create by renaming. Restoring a snapshot that
    /// did not contain them removes them.
    pub const GENERATED_FILES: &'static [&'static str] = &[
        "proxy.ts",
        "proxy.js",
        "src/proxy.ts",
        "src/proxy.js",
    ];

    pub const COMMIT_PREFIX: &'static str = "upshift backup";
    pub const PENDING_COMMIT_MESSAGE: &'static str =
        "upshift: save pending changes before snapshot";
    // Identity used when the repository has no committer configured
    pub const FALLBACK_GIT_NAME: &'static str = "upshift";
    pub const FALLBACK_GIT_EMAIL: &'static str = "upshift@localhost";
}

/// Subprocess timeouts.
pub struct ProcessConfig;

impl ProcessConfig {
    pub const SUBPROCESS_QUICK_TIMEOUT: Duration = Duration::from_secs(5);
    pub const SUBPROCESS_STANDARD_TIMEOUT: Duration = Duration::from_secs(30);
    pub const BUILD_TIMEOUT: Duration = Duration::from_secs(600);
    pub const BUILD_OUTPUT_DIR: &'static str = ".next/static";
}
