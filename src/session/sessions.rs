// ABOUTME: Session entry point - submit a request, poll its progress, cancel it,
// ABOUTME: or wait for the archived result. Each session runs on its own task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ArchiveStore, MemoryArchive, Snapshot, TaskSession, TaskStatus};
use crate::error::SessionError;
use crate::orchestrator::Manager;

struct LiveSession {
    progress: watch::Receiver<Snapshot>,
    cancel: CancellationToken,
}

/// Runs task sessions concurrently over one Manager configuration.
#[derive(Clone)]
pub struct Sessions {
    manager: Manager,
    live: Arc<RwLock<HashMap<String, LiveSession>>>,
    archive: Arc<dyn ArchiveStore>,
}

impl Sessions {
    pub fn new(manager: Manager) -> Self {
        Self {
            manager,
            live: Arc::new(RwLock::new(HashMap::new())),
            archive: MemoryArchive::shared(),
        }
    }

    #[must_use]
    pub fn with_archive(mut self, archive: Arc<dyn ArchiveStore>) -> Self {
        self.archive = archive;
        self
    }

    pub fn archive(&self) -> &Arc<dyn ArchiveStore> {
        &self.archive
    }

    /// Start a session for `request` and return its task id immediately.
    pub async fn submit(&self, request: impl Into<String>) -> String {
        let task_id = Uuid::new_v4().to_string();
        let request = request.into();
        let max_rounds = self.manager.config().max_rounds;

        let (tx, rx) = watch::channel(Snapshot::starting(&task_id, max_rounds));
        let tx = Arc::new(tx);
        let cancel = CancellationToken::new();
        let manager = self
            .manager
            .clone()
            .with_cancel(cancel.clone())
            .with_progress(Arc::clone(&tx));

        self.live
            .write()
            .await
            .insert(task_id.clone(), LiveSession { progress: rx, cancel });
        tracing::info!(task_id = %task_id, "session submitted");

        let live = Arc::clone(&self.live);
        let archive = Arc::clone(&self.archive);
        let id = task_id.clone();
        tokio::spawn(async move {
            let submitted_at = Utc::now();
            let (outcome, conversation) = manager.run_with_transcript(&id, &request).await;
            let snapshot = Snapshot::finished(&id, max_rounds, &outcome);

            let session = TaskSession {
                task_id: id.clone(),
                original_request: request,
                conversation,
                status: TaskStatus::from_outcome(&outcome),
                outcome,
                submitted_at,
                finished_at: Utc::now(),
            };
            if let Err(e) = archive.save(session).await {
                tracing::error!(task_id = %id, error = %e, "failed to archive session");
            }

            live.write().await.remove(&id);
            tx.send_replace(snapshot);
        });

        task_id
    }

    /// Current snapshot of a running or archived session.
    pub async fn poll(&self, task_id: &str) -> Result<Snapshot, SessionError> {
        if let Some(session) = self.live.read().await.get(task_id) {
            return Ok(session.progress.borrow().clone());
        }
        self.archived(task_id).await.map(|s| s.snapshot())
    }

    /// Signal a running session to stop after the current round.
    ///
    /// Returns false when the session has already finished.
    pub async fn cancel(&self, task_id: &str) -> Result<bool, SessionError> {
        if let Some(session) = self.live.read().await.get(task_id) {
            tracing::info!(task_id, "session cancel requested");
            session.cancel.cancel();
            return Ok(true);
        }
        self.archived(task_id).await.map(|_| false)
    }

    /// Wait until the session is terminal and return its archive entry.
    pub async fn wait(&self, task_id: &str) -> Result<TaskSession, SessionError> {
        let progress = self.live.read().await.get(task_id).map(|s| s.progress.clone());
        if let Some(mut progress) = progress {
            if progress.wait_for(|s| s.status.is_terminal()).await.is_err() {
                tracing::warn!(task_id, "session ended without a final snapshot");
            }
        }
        self.archived(task_id).await
    }

    /// Task ids of sessions still running.
    pub async fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.live.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn archived(&self, task_id: &str) -> Result<TaskSession, SessionError> {
        self.archive
            .load(task_id)
            .await
            .map_err(|e| SessionError::Archive(e.to_string()))?
            .ok_or_else(|| SessionError::UnknownTask(task_id.to_string()))
    }
}
