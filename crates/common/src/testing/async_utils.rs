//! Async test utilities

use std::future::Future;
use std::time::Duration;

/// Poll a condition until it holds or the timeout elapses
///
/// # Returns
/// `true` if the condition held before the timeout
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poll_until_gives_up() {
        let observed =
            poll_until(Duration::from_millis(30), Duration::from_millis(5), || async { false })
                .await;
        assert!(!observed);
    }
}
