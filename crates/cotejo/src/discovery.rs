//! Test discovery.
//!
//! A test is a directory under the test root holding an input document plus
//! a sibling golden-output directory named `<stem><output-suffix>`. Directory
//! names ending in the disabled suffix are skipped, as is any directory
//! without a valid pair.

use crate::config::{SuiteConfig, TestConfig};
use crate::host::DocumentId;
use crate::result::{CotejoError, CotejoResult};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// One discovered regression test
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Test name, taken from the base directory name
    pub name: String,
    /// Absolute path of the golden source directory
    pub base_dir: PathBuf,
    /// Input document file name, relative to `base_dir`
    pub input: String,
    /// Golden-output directory name, relative to `base_dir`
    pub output: String,
    /// Working directory, allocated at setup and owned until teardown
    pub working_dir: Option<PathBuf>,
    /// Host document handle, valid only while the test is running
    pub document_id: Option<DocumentId>,
    /// Largest acceptable mean pixel difference per compared pair
    pub max_compare_metric: f64,
    /// Start of the generation window
    pub started_at: Option<Instant>,
    /// End of the generation window
    pub stopped_at: Option<Instant>,
}

impl TestCase {
    /// Absolute path of the input document inside the golden source
    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.base_dir.join(&self.input)
    }

    /// Absolute path of the golden-output directory
    #[must_use]
    pub fn golden_path(&self) -> PathBuf {
        self.base_dir.join(&self.output)
    }

    /// Generation duration in seconds, when both endpoints were recorded
    #[must_use]
    pub fn generation_seconds(&self) -> Option<f64> {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => Some(stop.duration_since(start).as_secs_f64()),
            _ => None,
        }
    }
}

/// Scan `config.test_root` and return every runnable test.
///
/// Policy: only the first input/output pair found in a directory becomes a
/// test; additional pairs in the same directory are collapsed into that one
/// (known limitation, not multi-test support). Discovery order follows
/// directory-listing order and is not guaranteed stable across platforms.
///
/// # Errors
///
/// Returns a fatal discovery error if the test root itself cannot be read;
/// malformed individual entries are skipped, never fatal.
pub fn discover(config: &SuiteConfig) -> CotejoResult<Vec<TestCase>> {
    let root = &config.test_root;
    let entries = std::fs::read_dir(root)
        .map_err(|e| CotejoError::discovery(root.clone(), e.to_string()))?;

    let mut tests = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CotejoError::discovery(root.clone(), e.to_string()))?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if !entry.path().is_dir() {
            continue;
        }
        if name.ends_with(&config.disabled_suffix) {
            debug!(test = %name, "skipping disabled test directory");
            continue;
        }

        if let Some(test) = pair_in_directory(config, &entry.path(), &name) {
            tests.push(test);
        } else {
            debug!(dir = %name, "no input/output pair, skipping");
        }
    }

    Ok(tests)
}

/// Find the first input document with a matching golden directory.
fn pair_in_directory(config: &SuiteConfig, base_dir: &std::path::Path, name: &str) -> Option<TestCase> {
    let entries = std::fs::read_dir(base_dir).ok()?;

    let mut inputs = Vec::new();
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let child = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            subdirs.push(child);
        } else if has_input_extension(config, &child) {
            inputs.push(child);
        }
    }

    for input in inputs {
        let stem = input.rsplit_once('.').map_or(input.as_str(), |(s, _)| s);
        let output = format!("{stem}{}", config.output_suffix);
        if subdirs.iter().any(|d| d == &output) {
            let test_config = TestConfig::read(base_dir, &config.config_file_name);
            return Some(TestCase {
                name: name.to_string(),
                base_dir: base_dir.to_path_buf(),
                input,
                output,
                working_dir: None,
                document_id: None,
                max_compare_metric: test_config.max_compare_metric,
                started_at: None,
                stopped_at: None,
            });
        }
    }

    None
}

fn has_input_extension(config: &SuiteConfig, file_name: &str) -> bool {
    file_name.rsplit_once('.').is_some_and(|(_, ext)| {
        config
            .input_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    })
}
