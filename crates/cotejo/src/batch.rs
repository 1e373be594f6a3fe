//! Bounded concurrent batch execution.
//!
//! Comparison jobs shell out to an external tool, so the suite caps how many
//! run at once. The window slides: as one job finishes the next queued job
//! starts immediately. The batch is all-or-nothing; the first error wins and
//! partial results are dropped.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run `jobs` with at most `limit` in flight at any instant.
///
/// Results come back in job order. On the first failure the batch resolves
/// to that error; jobs already in flight may still run to completion but
/// their results are discarded. An empty job list resolves immediately.
///
/// # Errors
///
/// Returns the first job error encountered.
pub async fn run_batch<T, E, F>(jobs: Vec<F>, limit: usize) -> Result<Vec<T>, E>
where
    F: Future<Output = Result<T, E>>,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    stream::iter(jobs)
        .buffered(limit.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_batch_resolves_immediately() {
        let jobs: Vec<std::future::Ready<Result<u32, String>>> = Vec::new();
        let results = run_batch(jobs, 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_preserve_job_order() {
        let jobs: Vec<_> = (0..8u64)
            .map(|i| async move {
                // later jobs finish first
                tokio::time::sleep(Duration::from_millis(8 - i)).await;
                Ok::<u64, String>(i)
            })
            .collect();
        let results = run_batch(jobs, 4).await.unwrap();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..25)
            .map(|i| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<usize, String>(i)
                }
            })
            .collect();

        let results = run_batch(jobs, 10).await.unwrap();
        assert_eq!(results.len(), 25);
        assert!(peak.load(Ordering::SeqCst) <= 10);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_error_wins() {
        let jobs: Vec<_> = (0..6u32)
            .map(|i| async move {
                if i == 2 {
                    Err(format!("job {i} failed"))
                } else {
                    Ok(i)
                }
            })
            .collect();
        let err = run_batch(jobs, 2).await.unwrap_err();
        assert_eq!(err, "job 2 failed");
    }

    #[tokio::test]
    async fn test_zero_limit_clamps_to_one() {
        let jobs: Vec<_> = (0..3u32).map(|i| async move { Ok::<u32, String>(i) }).collect();
        let results = run_batch(jobs, 0).await.unwrap();
        assert_eq!(results, vec![0, 1, 2]);
    }
}
