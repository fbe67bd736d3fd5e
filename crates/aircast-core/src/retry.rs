//! Bounded retry with a fixed delay between attempts.

use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

/// Attempt bound and inter-attempt delay for one operation.
///
/// The defaults (3 attempts, 10 ms apart) are tuned to ride out the short
/// windows where the radio holds the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first one
    pub max_attempts: u8,
    /// Wait between two attempts, in milliseconds
    pub retry_delay_ms: u32,
}

impl RetryPolicy {
    pub const DEFAULT: Self = Self::new(3, 10);

    pub const fn new(max_attempts: u8, retry_delay_ms: u32) -> Self {
        Self {
            max_attempts,
            retry_delay_ms,
        }
    }

    /// Run `op` until it succeeds or the attempt bound is reached.
    ///
    /// The delay is only inserted *between* attempts: a success on the first
    /// try costs no delay, and exhausting three attempts costs two. A policy
    /// with `max_attempts == 0` still makes one attempt.
    pub async fn run<T, E, D>(
        &self,
        delay: &mut D,
        mut op: impl AsyncFnMut() -> Result<T, E>,
    ) -> Result<Attempted<T>, Attempted<E>>
    where
        D: DelayNs,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) if attempt >= max_attempts => {
                    return Err(Attempted {
                        value: error,
                        attempts: attempt,
                    });
                }
                Err(_) => {
                    delay.delay_ms(self.retry_delay_ms).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A result together with the number of attempts it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u8,
}
