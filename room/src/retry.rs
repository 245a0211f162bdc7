use std::{future::Future, pin::Pin, time::Duration};

use tokio::time::sleep;

use crate::error::SyncError;

/// Runs `operation` until it succeeds, doubling the delay between attempts.
/// `max_retries` counts the retries after the first attempt.
pub async fn retry_with_backoff<F, T>(
    what: &str,
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, SyncError>
where
    F: FnMut() -> Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send>>,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                tracing::warn!(
                    "{} attempt {} failed: {}. Retrying in {:?}...",
                    what,
                    attempt + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                return Err(SyncError::RetryExhausted(format!(
                    "{what} failed after {} attempts: {e}",
                    attempt + 1
                )))
            }
        }
    }
}
