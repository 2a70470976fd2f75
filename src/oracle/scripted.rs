// ABOUTME: ScriptedOracle - replays a fixed sequence of replies and records
// ABOUTME: every request, for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Oracle, OracleReply, OracleRequest};
use crate::error::OracleError;

/// An oracle that answers from a script.
///
/// Once the script runs out it keeps returning the fallback reply, or
/// `OracleError::Unavailable` when none is set.
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    fallback: Option<OracleReply>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = OracleReply>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Always answer with the same reply.
    pub fn repeating(reply: OracleReply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    /// Always fail, as if the backend were unreachable.
    pub fn unreachable() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(self, reply: OracleReply) -> Self {
        self.script_mut().push_back(Ok(reply));
        self
    }

    #[must_use]
    pub fn then_error(self, error: OracleError) -> Self {
        self.script_mut().push_back(Err(error));
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, reply: OracleReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn script_mut(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<OracleReply, OracleError>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        match self.script_mut().pop_front() {
            Some(next) => next,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| OracleError::Unavailable("script exhausted".to_string())),
        }
    }
}
