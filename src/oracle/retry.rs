// ABOUTME: RetryingOracle - wraps any Oracle with a per-call timeout and
// ABOUTME: bounded retries with linear backoff on transient failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Oracle, OracleReply, OracleRequest};
use crate::error::OracleError;

pub struct RetryingOracle {
    inner: Arc<dyn Oracle>,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl RetryingOracle {
    pub fn new(inner: Arc<dyn Oracle>) -> Self {
        Self {
            inner,
            timeout: Duration::from_secs(60),
            retries: 2,
            backoff: Duration::from_millis(500),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Additional attempts after the first.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl Oracle for RetryingOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let mut attempt = 0u32;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "oracle call failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(attempts = attempt + 1, error = %e, "oracle call failed");
                    return Err(e);
                }
            }
        }
    }
}
