//! Document-host automation client.
//!
//! The document-editing host is an external collaborator: this module only
//! issues open/activate/wait/close commands and never touches document
//! content. Newer hosts report document status transitions; older ones need
//! a timed activation toggle. The capability is probed once at startup and
//! encoded as an [`ActivationStrategy`] so call sites carry no version
//! branches.

use crate::result::{CotejoError, CotejoResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opaque handle to a document opened in the external host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub i64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Host features discovered by the startup probe
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCapabilities {
    /// Host proactively emits active/idle status notifications
    pub status_events: bool,
}

/// Abstraction over the external document-editing host
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Whether the host's asset-generation capability is currently present
    async fn is_ready(&self) -> bool;

    /// Features this host version supports
    fn capabilities(&self) -> HostCapabilities;

    /// Open a document and return its handle
    async fn open_document(&self, path: &Path) -> CotejoResult<DocumentId>;

    /// Close every open document
    async fn close_all_documents(&self) -> CotejoResult<()>;

    /// Resolves once the host reports the document has begun active processing
    async fn when_active(&self, id: DocumentId) -> CotejoResult<()>;

    /// Resolves once processing for the document has settled
    async fn when_idle(&self, id: DocumentId) -> CotejoResult<()>;

    /// Best-effort nudge forcing a state transition
    async fn activate(&self, id: DocumentId) -> CotejoResult<()>;

    /// Installation directory of the host executable, for locating bundled tools
    fn executable_location(&self) -> CotejoResult<PathBuf>;
}

/// How to drive a document through one generation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStrategy {
    /// Host notifies on its own: wait for active, then idle
    StatusEvents,
    /// Older host: wait out a grace period, force an activation toggle,
    /// then rely on the idle notification
    LegacyToggle {
        /// Delay before the forced toggle
        grace: Duration,
    },
}

impl ActivationStrategy {
    /// Pick the strategy once, from the startup capability probe
    #[must_use]
    pub const fn select(capabilities: HostCapabilities, grace: Duration) -> Self {
        if capabilities.status_events {
            Self::StatusEvents
        } else {
            Self::LegacyToggle { grace }
        }
    }
}

/// Poll the host until its generation capability appears.
///
/// # Errors
///
/// Returns [`CotejoError::HostNotReady`] when `timeout` elapses first; this
/// is fatal for the suite since no test can run without the host.
pub async fn wait_until_ready(
    host: &dyn DocumentHost,
    poll_interval: Duration,
    timeout: Duration,
) -> CotejoResult<()> {
    let started = Instant::now();
    loop {
        if host.is_ready().await {
            debug!(waited_ms = started.elapsed().as_millis() as u64, "host ready");
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(CotejoError::HostNotReady {
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Drive one document through a full generation cycle and wait for it to
/// settle, following the selected strategy.
///
/// # Errors
///
/// Returns a host error if any round-trip fails; the caller marks the test
/// errored rather than aborting the suite.
pub async fn await_generation(
    host: &dyn DocumentHost,
    strategy: ActivationStrategy,
    id: DocumentId,
) -> CotejoResult<()> {
    match strategy {
        ActivationStrategy::StatusEvents => {
            host.when_active(id).await?;
            host.when_idle(id).await?;
        }
        ActivationStrategy::LegacyToggle { grace } => {
            // Host won't tell us generation started; give it the grace
            // period, then force the toggle and wait for the settle signal.
            tokio::time::sleep(grace).await;
            if let Err(e) = host.activate(id).await {
                warn!(document = %id, error = %e, "activation toggle failed, waiting for idle anyway");
            }
            host.when_idle(id).await?;
        }
    }
    Ok(())
}

// ============================================================================
// Scripted host (replay implementation for tests and dry runs)
// ============================================================================

/// Scripted in-process host used by unit tests and the CLI's dry-run mode.
///
/// Every operation resolves immediately; behavior is configured up front
/// (readiness delay, forced open failures, files to "generate"). When a
/// generation script is configured, `when_idle` writes those files into a
/// `<stem><output-suffix>` directory next to the opened document, the way
/// the real host drops assets next to the source.
#[derive(Debug)]
pub struct ScriptedHost {
    capabilities: HostCapabilities,
    executable_location: Option<PathBuf>,
    fail_open: bool,
    output_suffix: String,
    generated_files: Vec<(String, Vec<u8>)>,
    ready_after_polls: std::sync::atomic::AtomicU32,
    next_id: std::sync::atomic::AtomicI64,
    open_documents: std::sync::Mutex<Vec<(DocumentId, PathBuf)>>,
    close_all_calls: std::sync::atomic::AtomicU32,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    /// Host that is ready immediately and reports status events
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: HostCapabilities {
                status_events: true,
            },
            executable_location: None,
            fail_open: false,
            output_suffix: crate::config::DEFAULT_OUTPUT_SUFFIX.to_string(),
            generated_files: Vec::new(),
            ready_after_polls: std::sync::atomic::AtomicU32::new(0),
            next_id: std::sync::atomic::AtomicI64::new(1),
            open_documents: std::sync::Mutex::new(Vec::new()),
            close_all_calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Pretend to be an older host without status notifications
    #[must_use]
    pub fn with_legacy_capabilities(mut self) -> Self {
        self.capabilities = HostCapabilities {
            status_events: false,
        };
        self
    }

    /// Report not-ready for the first `polls` readiness checks
    #[must_use]
    pub fn with_ready_after(self, polls: u32) -> Self {
        self.ready_after_polls
            .store(polls, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// Make every `open_document` call fail
    #[must_use]
    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Set the reported executable location
    #[must_use]
    pub fn with_executable_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_location = Some(path.into());
        self
    }

    /// Files (relative path, bytes) to write next to each opened document
    /// once generation settles
    #[must_use]
    pub fn with_generated_files(mut self, files: Vec<(String, Vec<u8>)>) -> Self {
        self.generated_files = files;
        self
    }

    /// Handles of documents currently open
    #[must_use]
    pub fn open_documents(&self) -> Vec<DocumentId> {
        self.open_documents
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    /// How many times `close_all_documents` ran
    #[must_use]
    pub fn close_all_calls(&self) -> u32 {
        self.close_all_calls
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentHost for ScriptedHost {
    async fn is_ready(&self) -> bool {
        let remaining = self
            .ready_after_polls
            .load(std::sync::atomic::Ordering::SeqCst);
        if remaining == 0 {
            true
        } else {
            self.ready_after_polls
                .store(remaining - 1, std::sync::atomic::Ordering::SeqCst);
            false
        }
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    async fn open_document(&self, path: &Path) -> CotejoResult<DocumentId> {
        if self.fail_open {
            return Err(CotejoError::host(format!(
                "refused to open {}",
                path.display()
            )));
        }
        let id = DocumentId(
            self.next_id
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst),
        );
        self.open_documents
            .lock()
            .unwrap()
            .push((id, path.to_path_buf()));
        Ok(id)
    }

    async fn close_all_documents(&self) -> CotejoResult<()> {
        self.open_documents.lock().unwrap().clear();
        self.close_all_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn when_active(&self, _id: DocumentId) -> CotejoResult<()> {
        Ok(())
    }

    async fn when_idle(&self, id: DocumentId) -> CotejoResult<()> {
        if self.generated_files.is_empty() {
            return Ok(());
        }
        let document = self
            .open_documents
            .lock()
            .unwrap()
            .iter()
            .find(|(open, _)| *open == id)
            .map(|(_, path)| path.clone())
            .ok_or_else(|| CotejoError::host(format!("{id} is not open")))?;

        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_dir = document
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default()
            .join(format!("{stem}{}", self.output_suffix));

        for (relative, bytes) in &self.generated_files {
            let dest = output_dir.join(relative);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&dest, bytes).await?;
        }
        Ok(())
    }

    async fn activate(&self, _id: DocumentId) -> CotejoResult<()> {
        Ok(())
    }

    fn executable_location(&self) -> CotejoResult<PathBuf> {
        self.executable_location
            .clone()
            .ok_or_else(|| CotejoError::host("no executable location configured"))
    }
}
