//! Retrying Access Wrapper
//!
//! Every OneFS call goes through [`accesses_onefs`]: transport failures are
//! classified, "temporarily unavailable" answers are retried after a fixed
//! interval, and everything else surfaces immediately.

use crate::error::{Error, Result};
use crate::onefs::classify::{classify, messages, RemoteError};
use backoff::backoff::Backoff;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Interval between attempts while OneFS reports itself temporarily unavailable
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// How transient OneFS failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay before each retry
    pub interval: Duration,
    /// Retries allowed per call; `None` retries until interrupted
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Retry transient failures until the process is interrupted
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }

    /// Retry transient failures at most `max_retries` times per call
    pub fn bounded(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries: Some(max_retries),
        }
    }

    fn backoff(&self) -> TransientBackoff {
        TransientBackoff {
            interval: self.interval,
            max_retries: self.max_retries,
            retries: 0,
        }
    }
}

/// Constant backoff with an optional retry cap
#[derive(Debug)]
struct TransientBackoff {
    interval: Duration,
    max_retries: Option<u32>,
    retries: u32,
}

impl Backoff for TransientBackoff {
    fn reset(&mut self) {
        self.retries = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_retries) = self.max_retries {
            if self.retries >= max_retries {
                return None;
            }
        }
        self.retries = self.retries.saturating_add(1);
        Some(self.interval)
    }
}

/// Run a OneFS call under `policy`.
///
/// Connection and certificate failures are returned at once. API failures
/// are classified; only the "temporarily unavailable" message is retried.
/// Every other classification is returned with the original payload kept.
pub async fn accesses_onefs<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RemoteError>>,
{
    let operation = || {
        let attempt = call();
        async move {
            attempt.await.map_err(|err| match classify(err) {
                err if err.is_transient() => backoff::Error::transient(err),
                err => backoff::Error::permanent(err),
            })
        }
    };

    backoff::future::retry_notify(policy.backoff(), operation, |_: Error, wait: Duration| {
        info!(retry_in = ?wait, "{}", messages::TRY_AGAIN);
    })
    .await
}
