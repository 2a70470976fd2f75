// ABOUTME: Archive of finished task sessions.
// ABOUTME: ArchiveStore is the storage seam; MemoryArchive keeps them in process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{Snapshot, TaskStatus};
use crate::conversation::Conversation;
use crate::orchestrator::{Failure, FinalResult};

/// One end-to-end request, frozen once terminal.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSession {
    pub task_id: String,
    pub original_request: String,
    pub conversation: Conversation,
    pub outcome: Result<FinalResult, Failure>,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskSession {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::finished(&self.task_id, self.conversation.max_rounds(), &self.outcome)
    }
}

/// Storage for finished sessions.
///
/// Implement this for durable backends; sessions are only ever saved once.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn save(&self, session: TaskSession) -> Result<(), anyhow::Error>;

    /// Returns None if nothing was archived under `task_id`.
    async fn load(&self, task_id: &str) -> Result<Option<TaskSession>, anyhow::Error>;

    async fn list(&self) -> Result<Vec<String>, anyhow::Error>;
}

/// In-memory archive.
#[derive(Default)]
pub struct MemoryArchive {
    sessions: RwLock<HashMap<String, TaskSession>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn save(&self, session: TaskSession) -> Result<(), anyhow::Error> {
        self.sessions.write().await.insert(session.task_id.clone(), session);
        Ok(())
    }

    async fn load(&self, task_id: &str) -> Result<Option<TaskSession>, anyhow::Error> {
        Ok(self.sessions.read().await.get(task_id).cloned())
    }

    async fn list(&self) -> Result<Vec<String>, anyhow::Error> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
