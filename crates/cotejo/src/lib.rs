//! Cotejo: golden-master visual regression runner for document hosts.
//!
//! Cotejo (Spanish: "collation, side-by-side check") drives an external
//! document-editing host through its asset-generation pipeline and compares
//! what comes out against a golden-master output tree, file by file, with a
//! pixel-difference metric per pair.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SuiteOrchestrator                                           │
//! │    ├─ discover()           test tree -> TestCases            │
//! │    └─ per test: TestRunner                                   │
//! │         ├─ WorkspaceManager     isolated working dir         │
//! │         ├─ DocumentHost         open / activate / idle       │
//! │         └─ compare_trees        golden vs generated          │
//! │              └─ run_batch       bounded concurrent diffs     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tests run sequentially because the host holds a single document context;
//! only the pixel comparisons inside one test run concurrently.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod batch;
mod compare;
mod config;
mod discovery;
mod host;
mod report;
mod result;
mod runner;
mod scan;
mod suite;
mod workspace;

pub use batch::run_batch;
pub use compare::{
    compare_trees, ByteDiffComparator, Comparator, ComparisonResult, FileComparison,
    MagickComparator,
};
pub use config::{
    SuiteConfig, TestConfig, DEFAULT_ACTIVATION_GRACE_MS, DEFAULT_CONFIG_FILE_NAME,
    DEFAULT_DISABLED_SUFFIX, DEFAULT_HOST_POLL_INTERVAL_MS, DEFAULT_HOST_READY_TIMEOUT_MS,
    DEFAULT_MAX_COMPARISONS, DEFAULT_OUTPUT_SUFFIX, TEST_CONFIG_NAMESPACE,
};
pub use discovery::{discover, TestCase};
pub use host::{
    await_generation, wait_until_ready, ActivationStrategy, DocumentHost, DocumentId,
    HostCapabilities, ScriptedHost,
};
pub use report::{SuiteSummary, TestReport};
pub use result::{CotejoError, CotejoResult};
pub use runner::{TestOutcome, TestPhase, TestRunner};
pub use scan::scan_tree;
pub use suite::SuiteOrchestrator;
pub use workspace::WorkspaceManager;
