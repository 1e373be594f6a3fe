//! Per-test working directories.
//!
//! Every test runs against a private copy of its input document inside a
//! working directory that exists only for that run. The manager tracks live
//! directories so a suite-level `cleanup_all` can sweep anything left behind
//! by an interrupted run.

use crate::config::SuiteConfig;
use crate::discovery::TestCase;
use crate::result::{CotejoError, CotejoResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Allocates, populates, and removes per-test working directories
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    working_root: Option<PathBuf>,
    cleanup: bool,
    config_file_name: String,
    tracked: Arc<Mutex<Vec<PathBuf>>>,
}

impl WorkspaceManager {
    /// Build a manager from the suite configuration
    #[must_use]
    pub fn new(config: &SuiteConfig) -> Self {
        Self {
            working_root: config.working_directory.clone(),
            cleanup: config.cleanup,
            config_file_name: config.config_file_name.clone(),
            tracked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Allocate a working directory for `test` and copy its input document
    /// (and per-test config file, when present) into it.
    ///
    /// `test.working_dir` is populated as soon as allocation succeeds, so a
    /// setup that fails mid-copy still leaves a directory teardown can find.
    ///
    /// # Errors
    ///
    /// Returns a workspace error if allocation or the copy fails; the caller
    /// fails only this test, never the suite.
    pub async fn setup(&self, test: &mut TestCase) -> CotejoResult<()> {
        let dir = self.allocate(&test.name)?;
        self.tracked.lock().unwrap().push(dir.clone());
        test.working_dir = Some(dir.clone());
        debug!(test = %test.name, dir = %dir.display(), "working directory allocated");

        let source = test.input_path();
        let dest = dir.join(&test.input);
        tokio::fs::copy(&source, &dest).await.map_err(|e| {
            CotejoError::workspace(format!(
                "error copying input document {} to working directory: {e}",
                source.display()
            ))
        })?;

        // The per-test config is forwarded verbatim to the generation
        // collaborator; absence is not an error.
        let config_source = test.base_dir.join(&self.config_file_name);
        if config_source.is_file() {
            let config_dest = dir.join(&self.config_file_name);
            tokio::fs::copy(&config_source, &config_dest)
                .await
                .map_err(|e| {
                    CotejoError::workspace(format!(
                        "error copying {} to working directory: {e}",
                        self.config_file_name
                    ))
                })?;
        }

        Ok(())
    }

    /// Remove the test's working directory, unless cleanup is disabled.
    ///
    /// A test without an allocated directory tears down as a no-op.
    ///
    /// # Errors
    ///
    /// Returns a workspace error when removal fails; callers log it rather
    /// than letting it mask an earlier test failure.
    pub async fn teardown(&self, test: &TestCase) -> CotejoResult<()> {
        let Some(dir) = &test.working_dir else {
            return Ok(());
        };

        if !self.cleanup {
            info!(test = %test.name, dir = %dir.display(), "cleanup disabled, keeping working directory");
            self.untrack(dir);
            return Ok(());
        }

        tokio::fs::remove_dir_all(dir).await.map_err(|e| {
            CotejoError::workspace(format!(
                "error removing working directory {}: {e}",
                dir.display()
            ))
        })?;
        self.untrack(dir);
        debug!(test = %test.name, "working directory removed");
        Ok(())
    }

    /// Best-effort removal of every still-tracked working directory.
    ///
    /// Called at suite end and from the interrupt path; with cleanup
    /// disabled this is a no-op.
    pub fn cleanup_all(&self) {
        if !self.cleanup {
            return;
        }
        let dirs: Vec<PathBuf> = self.tracked.lock().unwrap().drain(..).collect();
        for dir in dirs {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %dir.display(), error = %e, "leaked working directory could not be removed");
                }
            }
        }
    }

    /// Working directories currently tracked (still on disk)
    #[must_use]
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.tracked.lock().unwrap().clone()
    }

    fn allocate(&self, test_name: &str) -> CotejoResult<PathBuf> {
        match &self.working_root {
            Some(root) => {
                let dir = root.join(test_name);
                // working dirs are never reused across runs
                if dir.exists() {
                    std::fs::remove_dir_all(&dir).map_err(|e| {
                        CotejoError::workspace(format!(
                            "error resetting working directory {}: {e}",
                            dir.display()
                        ))
                    })?;
                }
                std::fs::create_dir_all(&dir).map_err(|e| {
                    CotejoError::workspace(format!(
                        "error creating working directory {}: {e}",
                        dir.display()
                    ))
                })?;
                Ok(dir)
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(&format!("cotejo-{test_name}-"))
                    .tempdir()
                    .map_err(|e| {
                        CotejoError::workspace(format!("error creating temp directory: {e}"))
                    })?;
                // ownership moves to the tracked list; removal happens in
                // teardown or cleanup_all, not on drop
                Ok(temp.keep())
            }
        }
    }

    fn untrack(&self, dir: &std::path::Path) {
        self.tracked.lock().unwrap().retain(|d| d.as_path() != dir);
    }
}
