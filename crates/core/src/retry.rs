use std::time::Duration;

use crate::error::Result;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Retry a hosted-API call with exponential backoff.
///
/// Only errors classified as transient ([`crate::StageError::is_transient`])
/// are retried; schema violations, client errors, and filesystem failures
/// return immediately. At most `MAX_ATTEMPTS` attempts are made, with the
/// delay doubling after each failure.
pub async fn with_retries<F, Fut, T>(operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = INITIAL_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("loop returns on the final attempt")
}
