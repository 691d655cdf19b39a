//! Bounded retry for startup steps.
//!
//! Every remote call made while bringing the bridge up goes through
//! [`retry_startup`]. A step that keeps failing aborts startup.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backon::BackoffBuilder;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::common::error::BringupError;

/// How hard to try each startup step.
#[derive(Debug, Clone)]
pub struct BringupPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Fixed delay between attempts.
    pub interval: Duration,
}

impl Default for BringupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

impl BringupPolicy {
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        backon::ConstantBuilder::default()
            .with_delay(self.interval)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .build()
    }
}

/// Run `op` until it succeeds or the policy runs out of attempts.
pub async fn retry_startup<T, E, F, Fut>(
    step: &str,
    policy: &BringupPolicy,
    mut op: F,
) -> Result<T, BringupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {}/{}", step, attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) => match backoff.next() {
                Some(delay) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:.1}s...",
                        step,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
                None => {
                    return Err(BringupError::Exhausted {
                        step: step.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            },
        }
    }
}
