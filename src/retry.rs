use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_delay, self.max_delay, self.max_retries)
    }
}

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, retries: u32) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once retries are used up
    pub fn next_delay(&self) -> Option<Duration> {
        if self.current_attempt >= self.max_retries {
            return None;
        }
        let factor = 2u32.saturating_pow(self.current_attempt);
        Some(std::cmp::min(
            self.initial_delay.saturating_mul(factor),
            self.max_delay,
        ))
    }

    /// Sleep before the next attempt. Cancellation cuts the sleep short and
    /// counts as exhaustion.
    pub async fn sleep(&mut self, cancel: &CancellationToken) -> Result<(), MaxRetriesExceeded> {
        let delay = self.next_delay().ok_or(MaxRetriesExceeded)?;

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay.as_millis()
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(MaxRetriesExceeded),
            _ = sleep(delay) => {}
        }
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_and_cap() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(350),
            4,
        );
        let mut delays = Vec::new();
        while let Some(d) = backoff.next_delay() {
            delays.push(d.as_millis());
            backoff.current_attempt += 1;
        }
        assert_eq!(delays, vec![100, 200, 350, 350]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_no_retry_policy() {
        assert_eq!(RetryPolicy::none().backoff().next_delay(), None);
    }

    #[tokio::test]
    async fn test_sleep_exhausts() {
        let cancel = CancellationToken::new();
        let mut backoff = ExponentialBackoff::new(Duration::from_millis(1), Duration::from_millis(1), 1);
        assert!(backoff.sleep(&cancel).await.is_ok());
        assert!(backoff.sleep(&cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_sleep_returns_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(60), Duration::from_secs(60), 3);
        assert!(backoff.sleep(&cancel).await.is_err());
    }
}
