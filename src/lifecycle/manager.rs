//! # Task Lifecycle Manager
//!
//! Owns every mutation of a task after creation: administrative
//! transitions, partial updates, executor status callbacks resolved
//! through the opaque remote handle, dispatch linkage, and retry-as-a-new-
//! row. Each successful change publishes the full updated task onto the
//! owning environment's channel.
//!
//! Timestamps are stamped exactly once: `started` on the first entry into
//! `running`, `completed` on entry into any terminal status.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::states::TaskStatus;
use crate::channel::TaskEventHub;
use crate::error::{Result, TaskopsError};
use crate::models::{NewTask, Task, TaskId, TaskPatch};
use crate::store::Store;

/// Executor status callback payload, keyed by the remote handle the
/// executor was given at dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatusUpdate {
    pub remote_id: String,
    pub status: TaskStatus,
}

pub struct TaskLifecycle {
    store: Arc<dyn Store>,
    hub: TaskEventHub,
}

impl TaskLifecycle {
    pub fn new(store: Arc<dyn Store>, hub: TaskEventHub) -> Self {
        Self { store, hub }
    }

    /// Administrative status transition.
    pub async fn transition(&self, task_id: TaskId, next: TaskStatus) -> Result<Task> {
        self.update(task_id, TaskPatch::status(next)).await
    }

    /// Cancel a task; legal from every non-terminal status.
    pub async fn cancel(&self, task_id: TaskId) -> Result<Task> {
        self.transition(task_id, TaskStatus::Cancelled).await
    }

    /// Apply a partial update. When the patch carries a status, the state
    /// machine validates it and the lifecycle timestamps are stamped; an
    /// illegal transition fails with `InvalidTransition` and leaves the
    /// task untouched.
    pub async fn update(&self, task_id: TaskId, mut patch: TaskPatch) -> Result<Task> {
        let task = Task::get(self.store.as_ref(), task_id).await?;

        if let Some(next) = patch.status {
            if !task.status.can_transition_to(next) {
                return Err(TaskopsError::InvalidTransition {
                    from: task.status.to_string(),
                    to: next.to_string(),
                });
            }
            let now = Utc::now();
            if next.is_active() && task.started.is_none() && patch.started.is_none() {
                patch.started = Some(now);
            }
            if next.is_terminal() && task.completed.is_none() && patch.completed.is_none() {
                patch.completed = Some(now);
            }
        }

        let updated = Task::update(self.store.as_ref(), task_id, patch).await?;
        self.hub.publish(&updated);
        debug!(
            task_id,
            status = %updated.status,
            "task updated"
        );
        Ok(updated)
    }

    /// Record the executor handle for a dispatched task. Fails with
    /// `Validation` when the task already carries one; the linkage is
    /// written once.
    pub async fn mark_dispatched(&self, task_id: TaskId, remote_id: String) -> Result<Task> {
        let task = Task::get(self.store.as_ref(), task_id).await?;
        if task.remote_id.is_some() {
            return Err(TaskopsError::Validation(format!(
                "task {task_id} is already linked to a remote execution"
            )));
        }

        let patch = TaskPatch {
            remote_id: Some(remote_id),
            ..TaskPatch::default()
        };
        let updated = Task::update(self.store.as_ref(), task_id, patch).await?;
        self.hub.publish(&updated);
        info!(task_id, remote_id = %updated.remote_id.as_deref().unwrap_or(""), "task dispatched");
        Ok(updated)
    }

    /// Apply an executor status callback. A callback referencing a remote
    /// handle no task is tracking fails with `UnknownRemoteTask` and never
    /// creates a task.
    pub async fn apply_remote_status(&self, update: RemoteStatusUpdate) -> Result<Task> {
        match Task::find_by_remote_id(self.store.as_ref(), &update.remote_id).await? {
            Some(task) => self.update(task.id, TaskPatch::status(update.status)).await,
            None => Err(TaskopsError::UnknownRemoteTask(update.remote_id)),
        }
    }

    /// Decode and apply a raw executor callback payload. Malformed
    /// payloads fail with `Validation`; this is a caller-facing mutation,
    /// not a live feed, so errors surface instead of being dropped.
    pub async fn apply_remote_payload(&self, payload: serde_json::Value) -> Result<Task> {
        let update: RemoteStatusUpdate =
            serde_json::from_value(payload).map_err(|e| TaskopsError::Validation(e.to_string()))?;
        self.apply_remote_status(update).await
    }

    /// Retry a failed task as a brand-new row carrying the same
    /// environment, service, and command. The failed row stays terminal;
    /// execution history is immutable.
    pub async fn retry(&self, task_id: TaskId) -> Result<Task> {
        let source = Task::get(self.store.as_ref(), task_id).await?;
        if source.status != TaskStatus::Failed {
            return Err(TaskopsError::Validation(format!(
                "task {task_id} is {} and only failed tasks can be retried",
                source.status
            )));
        }

        let mut replacement = NewTask::new(
            source.name.clone(),
            source.environment,
            source.service.clone(),
            source.command.clone(),
        );
        replacement.task_type = source.task_type.clone();
        replacement.advanced_image = source.advanced_image.clone();
        replacement.advanced_payload = source.advanced_payload.clone();

        let created = Task::create(self.store.as_ref(), replacement).await?;
        self.hub.publish(&created);
        info!(
            failed_task_id = task_id,
            retry_task_id = created.id,
            "failed task retried as new task"
        );
        Ok(created)
    }
}
