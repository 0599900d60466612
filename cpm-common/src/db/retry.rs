//! Bounded exponential-backoff retry for write operations

use crate::config::PersistenceConfig;
use crate::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};

/// Backoff ceiling
const MAX_BACKOFF_MS: u64 = 1000;

/// Whether an error may succeed on a later attempt
fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Database(_) | Error::Io(_) | Error::Internal(_))
}

/// Run `operation` up to `policy.max_attempts` times
///
/// The delay starts at `policy.initial_backoff_ms`, doubles after each failed
/// attempt and is capped at one second. Validation errors are returned
/// immediately without retrying.
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    policy: PersistenceConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff_ms = policy.initial_backoff_ms.min(MAX_BACKOFF_MS);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "Write succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_transient(&err) => return Err(err),
            Err(err) => {
                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        error = %err,
                        "Write failed, retries exhausted"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    error = %err,
                    "Write failed, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}
