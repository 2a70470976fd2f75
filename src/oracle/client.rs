// ABOUTME: Defines the Oracle trait - the abstraction that lets agents and the
// ABOUTME: completion judge work with any text-completion backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::{OracleReply, OracleRequest};
use crate::error::OracleError;

/// A fallible, possibly slow text-completion oracle.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        (**self).complete(request).await
    }
}
