// ABOUTME: Tests for RetryingOracle - retries on transient errors, gives up
// ABOUTME: on permanent ones, and converts slow calls into timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::error::OracleError;

struct Flaky {
    failures: u32,
    calls: AtomicU32,
    permanent: bool,
}

#[async_trait]
impl Oracle for Flaky {
    async fn complete(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            if self.permanent {
                return Err(OracleError::Configuration("bad key".into()));
            }
            return Err(OracleError::Api {
                status: 503,
                message: "busy".into(),
            });
        }
        Ok(OracleReply::text("ok"))
    }
}

struct Slow;

#[async_trait]
impl Oracle for Slow {
    async fn complete(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(OracleReply::text("late"))
    }
}

fn flaky(failures: u32, permanent: bool) -> Arc<Flaky> {
    Arc::new(Flaky {
        failures,
        calls: AtomicU32::new(0),
        permanent,
    })
}

#[tokio::test]
async fn test_retries_transient_errors() {
    let inner = flaky(2, false);
    let oracle = RetryingOracle::new(inner.clone())
        .with_retries(2)
        .with_backoff(Duration::from_millis(1));

    let reply = oracle.complete(&OracleRequest::new()).await.unwrap();
    assert_eq!(reply, OracleReply::text("ok"));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_retry_budget() {
    let inner = flaky(5, false);
    let oracle = RetryingOracle::new(inner.clone())
        .with_retries(1)
        .with_backoff(Duration::from_millis(1));

    let err = oracle.complete(&OracleRequest::new()).await.unwrap_err();
    assert!(matches!(err, OracleError::Api { status: 503, .. }));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permanent_error_not_retried() {
    let inner = flaky(1, true);
    let oracle = RetryingOracle::new(inner.clone()).with_backoff(Duration::from_millis(1));

    let err = oracle.complete(&OracleRequest::new()).await.unwrap_err();
    assert!(matches!(err, OracleError::Configuration(_)));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout() {
    let oracle = RetryingOracle::new(Arc::new(Slow))
        .with_timeout(Duration::from_millis(20))
        .with_retries(0);

    let err = oracle.complete(&OracleRequest::new()).await.unwrap_err();
    assert!(matches!(err, OracleError::Timeout(_)));
}
