// Hand-rolled exponential backoff over `tokio::time::sleep`, matching the
// teacher's habit of inlining retry logic rather than pulling in a retry
// crate (no `otlp2parquet` crate depends on one).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::OrchestratorError;

/// Retries `f` up to `max_retries` additional times (so `max_retries + 1`
/// total attempts) with exponential backoff starting at `base_ms`, but only
/// for errors where `OrchestratorError::is_retryable()` is true. The first
/// non-retryable error, or the last retryable one, is returned as-is.
pub async fn with_retry<T, F, Fut>(
    step_name: &'static str,
    max_retries: u32,
    base_ms: u64,
    mut f: F,
) -> Result<T, OrchestratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrchestratorError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && err.is_retryable() => {
                let delay = Duration::from_millis(base_ms * 2u64.pow(attempt));
                warn!(step = step_name, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying step after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
