//! Suite orchestration.
//!
//! Tests run strictly one at a time: the document host holds a single active
//! document context, so concurrency lives only inside each test's comparison
//! phase. The orchestrator gates on host readiness once before the first
//! test and closes all host documents after the last one, whatever the
//! individual outcomes were.

use crate::compare::Comparator;
use crate::config::SuiteConfig;
use crate::discovery::discover;
use crate::host::{wait_until_ready, ActivationStrategy, DocumentHost};
use crate::report::SuiteSummary;
use crate::result::CotejoResult;
use crate::runner::TestRunner;
use crate::workspace::WorkspaceManager;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Discovers and runs every test under the configured root
pub struct SuiteOrchestrator {
    config: SuiteConfig,
    host: Arc<dyn DocumentHost>,
    comparator: Arc<dyn Comparator>,
    workspace: WorkspaceManager,
}

impl std::fmt::Debug for SuiteOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SuiteOrchestrator {
    /// Assemble an orchestrator; the workspace manager is derived from the
    /// configuration.
    #[must_use]
    pub fn new(
        config: SuiteConfig,
        host: Arc<dyn DocumentHost>,
        comparator: Arc<dyn Comparator>,
    ) -> Self {
        let workspace = WorkspaceManager::new(&config);
        Self {
            config,
            host,
            comparator,
            workspace,
        }
    }

    /// The workspace manager, exposed so an interrupt handler can sweep
    /// still-tracked working directories.
    #[must_use]
    pub fn workspace(&self) -> &WorkspaceManager {
        &self.workspace
    }

    /// Run every discovered test and return the summary.
    ///
    /// # Errors
    ///
    /// Only discovery failure and host-readiness timeout are fatal; every
    /// per-test failure is folded into the summary.
    pub async fn run(&self) -> CotejoResult<SuiteSummary> {
        let suite_started = Instant::now();
        let mut summary = SuiteSummary::default();

        let mut tests = discover(&self.config)?;
        info!(count = tests.len(), root = %self.config.test_root.display(), "tests discovered");
        if tests.is_empty() {
            // nothing to run; the host and comparison tool are never touched
            summary.total_duration = suite_started.elapsed();
            return Ok(summary);
        }

        wait_until_ready(
            self.host.as_ref(),
            self.config.host_poll_interval(),
            self.config.host_ready_timeout(),
        )
        .await?;

        let strategy =
            ActivationStrategy::select(self.host.capabilities(), self.config.activation_grace());
        info!(?strategy, "activation strategy selected");

        let runner = TestRunner::new(
            Arc::clone(&self.host),
            Arc::clone(&self.comparator),
            self.workspace.clone(),
            strategy,
            self.config.max_concurrent_comparisons,
        );

        for test in &mut tests {
            let started = Instant::now();
            let outcome = runner.run(test).await;
            summary.record(test.name.clone(), outcome, started.elapsed());
        }

        if let Err(e) = self.host.close_all_documents().await {
            warn!(error = %e, "failed to close host documents after suite");
        }
        self.workspace.cleanup_all();

        summary.total_duration = suite_started.elapsed();
        Ok(summary)
    }
}
