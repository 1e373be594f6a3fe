//! Per-test execution.
//!
//! One test moves through Setup, Generating, Comparing, and TearingDown;
//! any phase failure short-circuits to an errored outcome, but the runner
//! boundary never lets a single test abort the suite. Teardown runs after a
//! mid-test failure too, and a teardown failure can never mask an earlier
//! error.

use crate::compare::{compare_trees, Comparator, ComparisonResult};
use crate::discovery::TestCase;
use crate::host::{await_generation, ActivationStrategy, DocumentHost};
use crate::result::CotejoResult;
use crate::workspace::WorkspaceManager;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Phase a test failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestPhase {
    /// Workspace allocation and input copy
    Setup,
    /// Document open and asset generation
    Generating,
    /// Output-tree comparison
    Comparing,
    /// Working-directory removal
    TearingDown,
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Generating => "generating",
            Self::Comparing => "comparing",
            Self::TearingDown => "tearing down",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcome of one test
#[derive(Debug, Clone, Serialize)]
pub enum TestOutcome {
    /// Comparison ran and every check held
    Passed(ComparisonResult),
    /// Comparison ran and recorded diagnostics
    Failed(ComparisonResult),
    /// A phase failed before a comparison verdict existed
    Errored {
        /// Phase the first error occurred in
        phase: TestPhase,
        /// The error, rendered
        message: String,
    },
}

impl TestOutcome {
    /// True only for a clean pass
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    /// Diagnostic strings for reporting (empty for a pass)
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::Passed(_) => Vec::new(),
            Self::Failed(result) => result.errors.clone(),
            Self::Errored { phase, message } => {
                vec![format!("error while {phase}: {message}")]
            }
        }
    }
}

/// Runs one test through its full lifecycle
pub struct TestRunner {
    host: Arc<dyn DocumentHost>,
    comparator: Arc<dyn Comparator>,
    workspace: WorkspaceManager,
    strategy: ActivationStrategy,
    comparison_limit: usize,
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("strategy", &self.strategy)
            .field("comparison_limit", &self.comparison_limit)
            .finish_non_exhaustive()
    }
}

impl TestRunner {
    /// Assemble a runner from its collaborators
    #[must_use]
    pub fn new(
        host: Arc<dyn DocumentHost>,
        comparator: Arc<dyn Comparator>,
        workspace: WorkspaceManager,
        strategy: ActivationStrategy,
        comparison_limit: usize,
    ) -> Self {
        Self {
            host,
            comparator,
            workspace,
            strategy,
            comparison_limit,
        }
    }

    /// Run `test` to a terminal outcome.
    ///
    /// Never returns an error: every failure is folded into the outcome so
    /// the suite can keep going.
    pub async fn run(&self, test: &mut TestCase) -> TestOutcome {
        info!(test = %test.name, "test starting");

        if let Err(e) = self.workspace.setup(test).await {
            // nothing allocated means nothing to tear down
            if test.working_dir.is_some() {
                self.teardown_after_error(test).await;
            }
            return TestOutcome::Errored {
                phase: TestPhase::Setup,
                message: e.to_string(),
            };
        }

        if let Err(e) = self.generate(test).await {
            self.teardown_after_error(test).await;
            return TestOutcome::Errored {
                phase: TestPhase::Generating,
                message: e.to_string(),
            };
        }

        let comparison = self.compare(test).await;

        if let Err(e) = self.workspace.teardown(test).await {
            // first error wins; a teardown failure only surfaces when the
            // test was otherwise clean
            if matches!(&comparison, Ok(result) if result.passed) {
                return TestOutcome::Errored {
                    phase: TestPhase::TearingDown,
                    message: e.to_string(),
                };
            }
            warn!(test = %test.name, error = %e, "teardown failed after earlier failure");
        }

        match comparison {
            Ok(result) if result.passed => TestOutcome::Passed(result),
            Ok(result) => TestOutcome::Failed(result),
            Err(e) => TestOutcome::Errored {
                phase: TestPhase::Comparing,
                message: e.to_string(),
            },
        }
    }

    /// Open the working copy in the host and wait for generation to settle,
    /// recording the generation window on the test.
    async fn generate(&self, test: &mut TestCase) -> CotejoResult<()> {
        let working_dir = test
            .working_dir
            .clone()
            .expect("generate runs only after setup");
        let document = working_dir.join(&test.input);

        test.started_at = Some(std::time::Instant::now());
        let id = self.host.open_document(&document).await?;
        test.document_id = Some(id);
        info!(test = %test.name, document = %id, "document opened, awaiting generation");

        await_generation(self.host.as_ref(), self.strategy, id).await?;
        test.stopped_at = Some(std::time::Instant::now());
        Ok(())
    }

    /// Compare the golden tree to the output tree the host wrote next to
    /// the working copy of the document.
    async fn compare(&self, test: &TestCase) -> CotejoResult<ComparisonResult> {
        let working_dir = test
            .working_dir
            .clone()
            .expect("compare runs only after setup");
        let mut result = compare_trees(
            &test.golden_path(),
            &working_dir.join(&test.output),
            test.max_compare_metric,
            self.comparator.as_ref(),
            self.comparison_limit,
        )
        .await?;
        result.time = test.generation_seconds();
        Ok(result)
    }

    async fn teardown_after_error(&self, test: &TestCase) {
        if let Err(e) = self.workspace.teardown(test).await {
            warn!(test = %test.name, error = %e, "teardown failed after earlier failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ByteDiffComparator;
    use crate::config::SuiteConfig;
    use crate::discovery::discover;
    use crate::host::ScriptedHost;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn fixture(root: &Path, golden: &[(&str, &[u8])]) -> SuiteConfig {
        let dir = root.join("sample");
        fs::create_dir_all(dir.join("sample-assets")).unwrap();
        fs::write(dir.join("sample.psd"), b"psd bytes").unwrap();
        for (file, bytes) in golden {
            let path = dir.join("sample-assets").join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        SuiteConfig::new(root)
    }

    fn runner_for(config: &SuiteConfig, host: Arc<ScriptedHost>) -> TestRunner {
        TestRunner::new(
            host,
            Arc::new(ByteDiffComparator),
            WorkspaceManager::new(config),
            ActivationStrategy::StatusEvents,
            config.max_concurrent_comparisons,
        )
    }

    #[tokio::test]
    async fn test_passes_when_generated_matches_golden() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(
            root.path(),
            &[("icon.png", b"pixels"), ("banner.png", b"banner")],
        );
        let host = Arc::new(ScriptedHost::new().with_generated_files(vec![
            ("icon.png".to_string(), b"pixels".to_vec()),
            ("banner.png".to_string(), b"banner".to_vec()),
        ]));
        let runner = runner_for(&config, Arc::clone(&host));
        let mut test = discover(&config).unwrap().remove(0);

        let outcome = runner.run(&mut test).await;
        match outcome {
            TestOutcome::Passed(result) => {
                assert!(result.errors.is_empty());
                assert_eq!(result.comparisons.len(), 2);
                assert!(result.time.is_some());
            }
            other => panic!("expected Passed, got {other:?}"),
        }
        assert!(!test.working_dir.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_fails_when_generated_diverges() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(
            root.path(),
            &[("icon.png", b"pixels"), ("banner.png", b"banner")],
        );
        let host = Arc::new(ScriptedHost::new().with_generated_files(vec![
            ("icon.png".to_string(), b"other!".to_vec()),
            ("stray.png".to_string(), b"stray".to_vec()),
        ]));
        let runner = runner_for(&config, Arc::clone(&host));
        let mut test = discover(&config).unwrap().remove(0);

        let outcome = runner.run(&mut test).await;
        match outcome {
            TestOutcome::Failed(result) => {
                // icon differs, banner missing, stray unexpected
                assert_eq!(result.errors.len(), 3);
                assert!(result.errors.iter().any(|e| e.contains("banner.png") && e.contains("missing")));
                assert!(result.errors.iter().any(|e| e.contains("stray.png") && e.contains("unexpectedly")));
                assert!(result.errors.iter().any(|e| e.contains("icon.png") && e.contains("exceeds")));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // workspace still cleaned after a failing comparison
        assert!(!test.working_dir.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_errored_on_host_open_failure_still_tears_down() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path(), &[]);
        let host = Arc::new(ScriptedHost::new().with_failing_open());
        let runner = runner_for(&config, host);
        let mut test = discover(&config).unwrap().remove(0);

        let outcome = runner.run(&mut test).await;
        match &outcome {
            TestOutcome::Errored { phase, message } => {
                assert_eq!(*phase, TestPhase::Generating);
                assert!(message.contains("refused to open"));
            }
            other => panic!("expected Errored, got {other:?}"),
        }
        assert!(!outcome.is_passed());
        assert!(!test.working_dir.as_ref().unwrap().exists());
        assert_eq!(outcome.errors().len(), 1);
        assert!(outcome.errors()[0].contains("while generating"));
    }

    #[tokio::test]
    async fn test_errored_on_setup_failure_skips_generation() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path(), &[]);
        let host = Arc::new(ScriptedHost::new());
        let runner = runner_for(&config, Arc::clone(&host));
        let mut test = discover(&config).unwrap().remove(0);
        fs::remove_file(test.input_path()).unwrap();

        let outcome = runner.run(&mut test).await;
        assert!(matches!(
            outcome,
            TestOutcome::Errored {
                phase: TestPhase::Setup,
                ..
            }
        ));
        assert!(host.open_documents().is_empty(), "host never contacted");
        // partial setup was torn down
        assert!(!test.working_dir.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_records_generation_window() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path(), &[("a.png", b"x")]);
        let host = Arc::new(
            ScriptedHost::new()
                .with_legacy_capabilities()
                .with_generated_files(vec![("a.png".to_string(), b"x".to_vec())]),
        );
        let runner = TestRunner::new(
            Arc::clone(&host) as Arc<dyn DocumentHost>,
            Arc::new(ByteDiffComparator),
            WorkspaceManager::new(&config),
            ActivationStrategy::LegacyToggle {
                grace: Duration::from_millis(5),
            },
            4,
        );
        let mut test = discover(&config).unwrap().remove(0);

        let outcome = runner.run(&mut test).await;
        assert!(outcome.is_passed());
        let window = test.generation_seconds().unwrap();
        assert!(window >= 0.005, "window covers the grace period: {window}");
    }
}
