//! Pixel comparison of golden and generated output trees.
//!
//! A single file pair reduces to a scalar mean-difference metric (0.0 means
//! pixel-identical). Tree comparison scans both sides, pairs files by
//! relative path, and records three kinds of diagnostics: missing files,
//! unexpected files, and pairs whose metric exceeds the test's threshold.

use crate::batch::run_batch;
use crate::result::{CotejoError, CotejoResult};
use crate::scan::scan_tree;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Computes a scalar difference metric for one file pair
#[async_trait]
pub trait Comparator: Send + Sync {
    /// Compare two files; `0.0` means identical, larger means more different.
    async fn compare(&self, golden: &Path, actual: &Path) -> CotejoResult<f64>;
}

// ============================================================================
// ImageMagick-backed comparator
// ============================================================================

/// Comparator shelling out to ImageMagick `convert`.
///
/// The two images are composed with a difference blend, converted to
/// grayscale, and the mean pixel value is read back as the metric.
#[derive(Debug, Clone)]
pub struct MagickComparator {
    tool: PathBuf,
}

#[cfg(windows)]
const CONVERT_BINARY: &str = "convert.exe";
#[cfg(not(windows))]
const CONVERT_BINARY: &str = "convert";

impl MagickComparator {
    /// Locate `convert` relative to the host installation directory.
    ///
    /// # Errors
    ///
    /// Returns [`CotejoError::ComparisonToolNotFound`] when the binary is not
    /// at the expected location; the path is never silently defaulted.
    pub fn resolve(host_location: &Path) -> CotejoResult<Self> {
        let tool = host_location.join(CONVERT_BINARY);
        if tool.is_file() {
            Ok(Self { tool })
        } else {
            Err(CotejoError::ComparisonToolNotFound { path: tool })
        }
    }

    /// Use an explicit tool path, bypassing resolution
    #[must_use]
    pub fn with_tool(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Path of the `convert` binary in use
    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }
}

#[async_trait]
impl Comparator for MagickComparator {
    async fn compare(&self, golden: &Path, actual: &Path) -> CotejoResult<f64> {
        let output = tokio::process::Command::new(&self.tool)
            .arg(golden)
            .arg(actual)
            .args([
                "-compose",
                "difference",
                "-composite",
                "-colorspace",
                "gray",
                "-format",
                "%[mean]",
                "info:",
            ])
            .output()
            .await
            .map_err(|e| {
                CotejoError::comparison_tool(format!(
                    "failed to launch {}: {e}",
                    self.tool.display()
                ))
            })?;

        if !output.status.success() {
            return Err(CotejoError::comparison_tool(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.trim().parse::<f64>().map_err(|_| {
            CotejoError::comparison_tool(format!("unparseable metric output: {stdout:?}"))
        })
    }
}

// ============================================================================
// Byte-diff comparator (scripted/dry-run path)
// ============================================================================

/// Comparator over raw file bytes, for dry runs and tests where no image
/// tool is available. The metric is the mean absolute byte difference
/// normalized to `0.0..=1.0`; length differences pad with zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteDiffComparator;

#[async_trait]
impl Comparator for ByteDiffComparator {
    async fn compare(&self, golden: &Path, actual: &Path) -> CotejoResult<f64> {
        let a = tokio::fs::read(golden).await?;
        let b = tokio::fs::read(actual).await?;
        let len = a.len().max(b.len());
        if len == 0 {
            return Ok(0.0);
        }
        let total: u64 = (0..len)
            .map(|i| {
                let x = a.get(i).copied().unwrap_or(0);
                let y = b.get(i).copied().unwrap_or(0);
                u64::from(x.abs_diff(y))
            })
            .sum();
        Ok(total as f64 / (len as f64 * 255.0))
    }
}

// ============================================================================
// Tree comparison
// ============================================================================

/// Metric for one matched file pair
#[derive(Debug, Clone, Serialize)]
pub struct FileComparison {
    /// Relative path, present in both trees
    pub file: String,
    /// Mean difference metric
    pub metric: f64,
}

/// Outcome of comparing one test's golden tree to its generated tree
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    /// True iff `errors` is empty
    pub passed: bool,
    /// Relative paths expected (golden tree), sorted
    pub expected_files: Vec<String>,
    /// Relative paths produced (working tree), sorted
    pub actual_files: Vec<String>,
    /// Human-readable diagnostics, in deterministic order
    pub errors: Vec<String>,
    /// Metrics for every pair present in both trees
    pub comparisons: Vec<FileComparison>,
    /// Generation duration in seconds, when recorded
    pub time: Option<f64>,
}

/// Compare the golden tree under `golden_root` to the generated tree under
/// `actual_root`, running at most `limit` comparison jobs concurrently.
///
/// File sets are sorted before pairing so diagnostics come out in a
/// deterministic order regardless of directory-listing order. A pair's
/// metric is an error iff it exceeds `max_metric`.
///
/// # Errors
///
/// Returns error if the golden tree cannot be scanned or the comparison
/// tool fails; metric mismatches are diagnostics in the result, not errors.
/// A generated tree that does not exist at all reads as empty, so every
/// golden file surfaces as a missing-file diagnostic instead of an I/O
/// error.
pub async fn compare_trees(
    golden_root: &Path,
    actual_root: &Path,
    max_metric: f64,
    comparator: &dyn Comparator,
    limit: usize,
) -> CotejoResult<ComparisonResult> {
    let expected: BTreeSet<String> = scan_tree(golden_root)?.into_iter().collect();
    let actual: BTreeSet<String> = if actual_root.is_dir() {
        scan_tree(actual_root)?.into_iter().collect()
    } else {
        BTreeSet::new()
    };

    let mut errors = Vec::new();
    for missing in expected.difference(&actual) {
        errors.push(format!("file {missing} missing from output"));
    }
    for unexpected in actual.difference(&expected) {
        errors.push(format!("file {unexpected} unexpectedly in output"));
    }

    let matched: Vec<String> = expected.intersection(&actual).cloned().collect();
    debug!(
        matched = matched.len(),
        missing = expected.difference(&actual).count(),
        unexpected = actual.difference(&expected).count(),
        "comparing output trees"
    );

    let jobs: Vec<_> = matched
        .iter()
        .map(|file| {
            let golden = golden_root.join(file);
            let generated = actual_root.join(file);
            async move { comparator.compare(&golden, &generated).await }
        })
        .collect();
    let metrics = run_batch(jobs, limit).await?;

    let mut comparisons = Vec::with_capacity(matched.len());
    for (file, metric) in matched.iter().zip(metrics) {
        if metric > max_metric {
            errors.push(format!(
                "file {file} mean difference {metric} exceeds maximum {max_metric}"
            ));
        }
        comparisons.push(FileComparison {
            file: file.clone(),
            metric,
        });
    }

    Ok(ComparisonResult {
        passed: errors.is_empty(),
        expected_files: expected.into_iter().collect(),
        actual_files: actual.into_iter().collect(),
        errors,
        comparisons,
        time: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree(files: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, bytes) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, bytes).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_identical_trees_pass() {
        let golden = tree(&[("a.png", b"pixels"), ("sub/b.png", b"more")]);
        let actual = tree(&[("a.png", b"pixels"), ("sub/b.png", b"more")]);

        let result = compare_trees(golden.path(), actual.path(), 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.errors.is_empty());
        assert_eq!(result.comparisons.len(), 2);
        assert!(result.comparisons.iter().all(|c| c.metric == 0.0));
    }

    #[tokio::test]
    async fn test_passed_iff_errors_empty() {
        let golden = tree(&[("a.png", b"aaaa")]);
        let actual = tree(&[("a.png", b"bbbb")]);

        let result = compare_trees(golden.path(), actual.path(), 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert_eq!(result.passed, result.errors.is_empty());
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_missing_file_single_error_no_comparison() {
        let golden = tree(&[("a.png", b"x"), ("b.png", b"y")]);
        let actual = tree(&[("a.png", b"x")]);

        let result = compare_trees(golden.path(), actual.path(), 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        let missing: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.contains("missing from output"))
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("b.png"));
        assert!(result.comparisons.iter().all(|c| c.file != "b.png"));
    }

    #[tokio::test]
    async fn test_unexpected_file_single_error() {
        let golden = tree(&[("a.png", b"x")]);
        let actual = tree(&[("a.png", b"x"), ("extra.png", b"z")]);

        let result = compare_trees(golden.path(), actual.path(), 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        let unexpected: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.contains("unexpectedly in output"))
            .collect();
        assert_eq!(unexpected.len(), 1);
        assert!(unexpected[0].contains("extra.png"));
    }

    #[tokio::test]
    async fn test_metric_over_threshold_is_error() {
        let golden = tree(&[("a.png", &[0u8, 0, 0, 0] as &[u8])]);
        let actual = tree(&[("a.png", &[255u8, 255, 255, 255] as &[u8])]);

        // metric is 1.0; allow up to 0.5
        let result = compare_trees(golden.path(), actual.path(), 0.5, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_metric_within_threshold_passes() {
        let golden = tree(&[("a.png", &[0u8, 0, 0, 0] as &[u8])]);
        let actual = tree(&[("a.png", &[10u8, 0, 0, 0] as &[u8])]);

        let result = compare_trees(golden.path(), actual.path(), 0.5, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.comparisons.len(), 1);
        assert!(result.comparisons[0].metric > 0.0);
    }

    #[tokio::test]
    async fn test_diagnostics_are_deterministically_ordered() {
        let golden = tree(&[("z.png", b"x"), ("a.png", b"x"), ("m.png", b"x")]);
        let actual = tree(&[]);

        let result = compare_trees(golden.path(), actual.path(), 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("a.png"));
        assert!(result.errors[1].contains("m.png"));
        assert!(result.errors[2].contains("z.png"));
    }

    #[tokio::test]
    async fn test_absent_generated_tree_reads_as_empty() {
        let golden = tree(&[("a.png", b"x")]);
        let parent = tempfile::tempdir().unwrap();
        let never_created = parent.path().join("out-assets");

        let result = compare_trees(golden.path(), &never_created, 0.0, &ByteDiffComparator, 4)
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("missing from output"));
        assert!(result.actual_files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_convert_binary_is_explicit_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MagickComparator::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, CotejoError::ComparisonToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_byte_diff_empty_files_identical() {
        let golden = tree(&[("a.png", b"" as &[u8])]);
        let actual = tree(&[("a.png", b"" as &[u8])]);
        let metric = ByteDiffComparator
            .compare(&golden.path().join("a.png"), &actual.path().join("a.png"))
            .await
            .unwrap();
        assert_eq!(metric, 0.0);
    }
}
