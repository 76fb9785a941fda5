//! Retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay before the first retry; doubled for each further attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Errors that may succeed when the operation is repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Run `op`, retrying transient failures up to `retries` more times.
pub async fn with_retries<T, E, F, Fut>(
    what: &str,
    retries: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries && e.is_transient() => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
