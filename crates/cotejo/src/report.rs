//! Suite summary and rendering.

use crate::runner::TestOutcome;
use serde::Serialize;
use std::time::Duration;

/// Outcome of one test, ready for reporting
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    /// Test name
    pub name: String,
    /// Terminal outcome
    pub outcome: TestOutcome,
    /// Wall-clock duration of the whole test (all phases)
    pub duration: Duration,
}

/// Aggregation across all tests in one run. Derived, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteSummary {
    /// Per-test reports, in execution order
    pub reports: Vec<TestReport>,
    /// Total wall-clock suite duration
    pub total_duration: Duration,
}

impl SuiteSummary {
    /// Record one test outcome
    pub fn record(&mut self, name: impl Into<String>, outcome: TestOutcome, duration: Duration) {
        self.reports.push(TestReport {
            name: name.into(),
            outcome,
            duration,
        });
    }

    /// Number of passing tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_passed()).count()
    }

    /// Total number of tests run
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.reports.len()
    }

    /// True when every test passed (vacuously true for an empty suite)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passed_count() == self.total_count()
    }

    /// Render the text report: the headline count, one line per test with
    /// timing or error detail, and the total duration.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}/{} tests passed\n",
            self.passed_count(),
            self.total_count()
        );

        for report in &self.reports {
            match &report.outcome {
                TestOutcome::Passed(result) => {
                    let time = result
                        .time
                        .map_or_else(String::new, |t| format!(", generated in {t:.2}s"));
                    out.push_str(&format!(
                        "PASS {} ({:.2}s{time})\n",
                        report.name,
                        report.duration.as_secs_f64()
                    ));
                }
                outcome => {
                    let errors = outcome.errors();
                    out.push_str(&format!(
                        "FAIL {} ({:.2}s, {} error{})\n",
                        report.name,
                        report.duration.as_secs_f64(),
                        errors.len(),
                        if errors.len() == 1 { "" } else { "s" }
                    ));
                    for error in errors {
                        out.push_str(&format!("     {error}\n"));
                    }
                }
            }
        }

        out.push_str(&format!(
            "total time: {:.2}s\n",
            self.total_duration.as_secs_f64()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ComparisonResult;
    use crate::runner::TestPhase;

    fn clean_result() -> ComparisonResult {
        ComparisonResult {
            passed: true,
            expected_files: vec!["a.png".to_string()],
            actual_files: vec!["a.png".to_string()],
            errors: Vec::new(),
            comparisons: Vec::new(),
            time: Some(1.5),
        }
    }

    fn failed_result() -> ComparisonResult {
        ComparisonResult {
            passed: false,
            expected_files: vec!["a.png".to_string()],
            actual_files: Vec::new(),
            errors: vec!["file a.png missing from output".to_string()],
            comparisons: Vec::new(),
            time: Some(0.4),
        }
    }

    #[test]
    fn test_empty_suite_renders_zero_counts() {
        let summary = SuiteSummary::default();
        assert!(summary.all_passed());
        assert!(summary.render().starts_with("0/0 tests passed"));
    }

    #[test]
    fn test_counts_and_render() {
        let mut summary = SuiteSummary::default();
        summary.record(
            "good",
            TestOutcome::Passed(clean_result()),
            Duration::from_millis(2_300),
        );
        summary.record(
            "bad",
            TestOutcome::Failed(failed_result()),
            Duration::from_millis(900),
        );
        summary.record(
            "broken",
            TestOutcome::Errored {
                phase: TestPhase::Generating,
                message: "host went away".to_string(),
            },
            Duration::from_millis(100),
        );
        summary.total_duration = Duration::from_millis(3_300);

        assert_eq!(summary.passed_count(), 1);
        assert_eq!(summary.total_count(), 3);
        assert!(!summary.all_passed());

        let text = summary.render();
        assert!(text.starts_with("1/3 tests passed"));
        assert!(text.contains("PASS good"));
        assert!(text.contains("FAIL bad"));
        assert!(text.contains("file a.png missing from output"));
        assert!(text.contains("FAIL broken"));
        assert!(text.contains("host went away"));
        assert!(text.contains("total time: 3.30s"));
    }

    #[test]
    fn test_errored_counts_as_failure() {
        let mut summary = SuiteSummary::default();
        summary.record(
            "broken",
            TestOutcome::Errored {
                phase: TestPhase::Setup,
                message: "no workspace".to_string(),
            },
            Duration::ZERO,
        );
        assert_eq!(summary.passed_count(), 0);
        assert!(!summary.all_passed());
    }
}
