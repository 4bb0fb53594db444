use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::DeliveryError;

/// Bounded exponential backoff with a wall-clock ceiling per step.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub step_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay,
            step_timeout: config.step_timeout,
        }
    }

    /// Delay before the attempt following `attempt` (1-based): doubles each time.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or exceeds the step timeout.
    pub async fn run<T, F, Fut>(&self, step: &str, mut op: F) -> Result<T, DeliveryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DeliveryError>>,
    {
        let attempts = async {
            let mut attempt = 0_u32;
            loop {
                attempt += 1;
                match op().await {
                    Ok(value) => return Ok(value),
                    Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                        let delay = self.delay_after(attempt);
                        tracing::warn!(
                            step,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "step attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(error) => return Err(error),
                }
            }
        };

        tokio::time::timeout(self.step_timeout, attempts)
            .await
            .map_err(|_| DeliveryError::Timeout(self.step_timeout))?
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
