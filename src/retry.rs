//! Retry policy for the I/O boundaries of the pipeline
//!
//! Only operations that touch external resources (input files, output files,
//! the object store) go through this. Pure transformations are never retried
//! because they would fail the same way again.

use crate::error::PipelineError;
use std::{future::Future, num::NonZeroU32, time::Duration};

/// How often and how patiently to retry a failing I/O operation
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: NonZeroU32,

    /// Fixed delay between two consecutive attempts
    pub delay: Duration,
}
//
impl RetryPolicy {
    /// Run an operation until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts
    ///
    /// `op` is called once per attempt and must produce a fresh future each
    /// time. `what` describes the operation in logs.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_attempts.get() => {
                    log::warn!(
                        "Attempt {attempt}/{} at {what} failed ({e}), retrying in {:?}",
                        self.max_attempts,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Giving up on {what} after {attempt} attempt(s): {e}");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        path::Path,
        sync::atomic::{AtomicU32, Ordering},
    };

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: NonZeroU32::new(max_attempts).unwrap(),
            delay: Duration::ZERO,
        }
    }

    fn io_error() -> PipelineError {
        PipelineError::io(
            "reading",
            Path::new("missing.json"),
            io::Error::from(io::ErrorKind::NotFound),
        )
    }

    #[tokio::test]
    async fn io_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = policy(3)
            .run("flaky read", move || async move {
                if calls.fetch_add(1, Ordering::Relaxed) < 2 {
                    Err(io_error())
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_propagate_the_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .run("broken read", move || async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(io_error())
            })
            .await;
        assert!(matches!(result, Err(PipelineError::Io { .. })));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn schema_errors_fail_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .run("bad data", move || async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(PipelineError::schema("reviews.json:1", "missing field `date`"))
            })
            .await;
        assert!(matches!(result, Err(PipelineError::Schema { .. })));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
