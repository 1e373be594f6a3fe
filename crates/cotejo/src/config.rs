//! Suite configuration.
//!
//! All tunables for a run live here; components receive the config (or the
//! pieces they need) explicitly rather than reading process-wide state.

use crate::result::CotejoResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ceiling for concurrent comparison subprocesses
pub const DEFAULT_MAX_COMPARISONS: usize = 10;

/// Default host readiness polling interval (1 second)
pub const DEFAULT_HOST_POLL_INTERVAL_MS: u64 = 1_000;

/// Default host readiness timeout (60 seconds)
pub const DEFAULT_HOST_READY_TIMEOUT_MS: u64 = 60_000;

/// Default grace period before the legacy activation toggle (4 seconds)
pub const DEFAULT_ACTIVATION_GRACE_MS: u64 = 4_000;

/// Suffix marking a test directory as disabled
pub const DEFAULT_DISABLED_SUFFIX: &str = "-disabled";

/// Suffix the golden-output directory carries next to the input document
pub const DEFAULT_OUTPUT_SUFFIX: &str = "-assets";

/// Per-test configuration file name
pub const DEFAULT_CONFIG_FILE_NAME: &str = "cotejo.json";

/// Configuration for one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SuiteConfig {
    /// Root directory holding one subdirectory per test
    pub test_root: PathBuf,
    /// Persistent working root; `None` uses ephemeral temp dirs
    pub working_directory: Option<PathBuf>,
    /// Remove working directories on teardown (default true)
    pub cleanup: bool,
    /// Directory-name suffix that disables a test
    pub disabled_suffix: String,
    /// Recognized input-document extensions (lower case, no dot)
    pub input_extensions: Vec<String>,
    /// Suffix of the golden-output directory name
    pub output_suffix: String,
    /// Name of the optional per-test configuration file
    pub config_file_name: String,
    /// Ceiling on concurrent comparison subprocesses
    pub max_concurrent_comparisons: usize,
    /// Host readiness polling interval in milliseconds
    pub host_poll_interval_ms: u64,
    /// Host readiness timeout in milliseconds
    pub host_ready_timeout_ms: u64,
    /// Grace period before the legacy activation toggle, in milliseconds
    pub activation_grace_ms: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("test"),
            working_directory: None,
            cleanup: true,
            disabled_suffix: DEFAULT_DISABLED_SUFFIX.to_string(),
            input_extensions: vec!["psd".to_string()],
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            max_concurrent_comparisons: DEFAULT_MAX_COMPARISONS,
            host_poll_interval_ms: DEFAULT_HOST_POLL_INTERVAL_MS,
            host_ready_timeout_ms: DEFAULT_HOST_READY_TIMEOUT_MS,
            activation_grace_ms: DEFAULT_ACTIVATION_GRACE_MS,
        }
    }
}

impl SuiteConfig {
    /// Create a configuration rooted at `test_root` with defaults elsewhere
    #[must_use]
    pub fn new(test_root: impl Into<PathBuf>) -> Self {
        Self {
            test_root: test_root.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> CotejoResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Set a persistent working root
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Enable or disable teardown deletion
    #[must_use]
    pub const fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Set the comparison concurrency ceiling
    #[must_use]
    pub const fn with_max_concurrent_comparisons(mut self, limit: usize) -> Self {
        self.max_concurrent_comparisons = limit;
        self
    }

    /// Set the host readiness timeout in milliseconds
    #[must_use]
    pub const fn with_host_ready_timeout(mut self, timeout_ms: u64) -> Self {
        self.host_ready_timeout_ms = timeout_ms;
        self
    }

    /// Host readiness polling interval as a `Duration`
    #[must_use]
    pub const fn host_poll_interval(&self) -> Duration {
        Duration::from_millis(self.host_poll_interval_ms)
    }

    /// Host readiness timeout as a `Duration`
    #[must_use]
    pub const fn host_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.host_ready_timeout_ms)
    }

    /// Legacy activation grace period as a `Duration`
    #[must_use]
    pub const fn activation_grace(&self) -> Duration {
        Duration::from_millis(self.activation_grace_ms)
    }
}

/// Per-test settings read from `<base_dir>/<config_file_name>`
///
/// The file is an arbitrary JSON object; settings for this runner live under
/// the `assets-automation` key, everything else is passed through verbatim to
/// the generation collaborator via the workspace copy.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Largest acceptable mean pixel difference for any compared pair
    pub max_compare_metric: f64,
}

/// Namespace key holding runner settings inside a per-test config file
pub const TEST_CONFIG_NAMESPACE: &str = "assets-automation";

impl TestConfig {
    /// Read the per-test config next to `base_dir`, or defaults when absent.
    ///
    /// A malformed file downgrades to defaults with a warning; only the
    /// presence of the file matters for the workspace copy, not its shape.
    #[must_use]
    pub fn read(base_dir: &Path, config_file_name: &str) -> Self {
        let path = base_dir.join(config_file_name);
        let Ok(data) = std::fs::read_to_string(&path) else {
            return Self::default();
        };

        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(value) => {
                let metric = value
                    .get(TEST_CONFIG_NAMESPACE)
                    .and_then(|ns| ns.get("max-compare-metric"))
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(0.0);
                Self {
                    max_compare_metric: metric,
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unparseable test config, using defaults");
                Self::default()
            }
        }
    }
}
