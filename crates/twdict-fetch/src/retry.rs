use std::future::Future;

use tokio_util::sync::CancellationToken;
use twdict_config::network::NetworkConfig;

use crate::error::FetchError;

/// Run `op` until it succeeds, fails permanently, or runs out of retries.
///
/// Retries only errors that report [`FetchError::is_retryable`], waiting
/// [`NetworkConfig::backoff`] between attempts. Cancellation is observed both
/// during an attempt and while waiting.
pub async fn with_retries<T, F, Fut>(
    network: &NetworkConfig,
    cancel: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = op() => result,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt <= network.max_retries => {
                let delay = network.backoff(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt,
                    network.max_retries + 1,
                    e,
                    delay
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}
