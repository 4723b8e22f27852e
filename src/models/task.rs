//! # Task Model
//!
//! One execution instance of an operational command against an environment.
//!
//! Tasks are created when dispatched, mutated only through the lifecycle
//! manager or executor status callbacks, and never resurrected: a retry of
//! a failed task is a new row. The owning environment is immutable after
//! creation, which is why [`TaskPatch`] has no environment field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EnvironmentId, ProjectId, TaskId};
use crate::error::{Result, TaskopsError};
use crate::lifecycle::TaskStatus;
use crate::query::{FieldValue, Filter, Record};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub environment: EnvironmentId,
    pub service: String,
    pub command: String,
    pub remote_id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub advanced_image: Option<String>,
    pub advanced_payload: Option<serde_json::Value>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub environment: EnvironmentId,
    pub service: String,
    pub command: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,
    #[serde(default)]
    pub advanced_image: Option<String>,
    #[serde(default)]
    pub advanced_payload: Option<serde_json::Value>,
}

impl NewTask {
    pub fn new(
        name: impl Into<String>,
        environment: EnvironmentId,
        service: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            environment,
            service: service.into(),
            command: command.into(),
            status: None,
            remote_id: None,
            task_type: None,
            advanced_image: None,
            advanced_payload: None,
        }
    }

    /// Decode task fields arriving as raw JSON. Missing required fields and
    /// statuses outside the enumerated set surface as `Validation`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| TaskopsError::Validation(e.to_string()))
    }
}

/// Partial update; unspecified fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub service: Option<String>,
    pub command: Option<String>,
    pub remote_id: Option<String>,
    pub task_type: Option<String>,
    pub advanced_image: Option<String>,
    pub advanced_payload: Option<serde_json::Value>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply the supplied fields onto a task row.
    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(started) = self.started {
            task.started = Some(started);
        }
        if let Some(completed) = self.completed {
            task.completed = Some(completed);
        }
        if let Some(service) = &self.service {
            task.service = service.clone();
        }
        if let Some(command) = &self.command {
            task.command = command.clone();
        }
        if let Some(remote_id) = &self.remote_id {
            task.remote_id = Some(remote_id.clone());
        }
        if let Some(task_type) = &self.task_type {
            task.task_type = Some(task_type.clone());
        }
        if let Some(image) = &self.advanced_image {
            task.advanced_image = Some(image.clone());
        }
        if let Some(payload) = &self.advanced_payload {
            task.advanced_payload = Some(payload.clone());
        }
    }
}

impl Task {
    /// Create a new task. The owning environment must be known to the
    /// store; the initial status defaults to `new`.
    pub async fn create(store: &dyn Store, new_task: NewTask) -> Result<Task> {
        if new_task.name.trim().is_empty() {
            return Err(TaskopsError::Validation("task name must not be empty".into()));
        }
        if store
            .environment_project(new_task.environment)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .is_none()
        {
            return Err(TaskopsError::not_found("environment", new_task.environment));
        }

        let task = Task {
            id: 0,
            name: new_task.name,
            status: new_task.status.unwrap_or_default(),
            created: Utc::now(),
            started: None,
            completed: None,
            environment: new_task.environment,
            service: new_task.service,
            command: new_task.command,
            remote_id: new_task.remote_id,
            task_type: new_task.task_type,
            advanced_image: new_task.advanced_image,
            advanced_payload: new_task.advanced_payload,
        };

        store
            .insert_task(task)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// Fetch a task by id.
    pub async fn get(store: &dyn Store, id: TaskId) -> Result<Task> {
        store
            .task_by_id(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("task", id))
    }

    /// Partial update by id; unspecified fields are unchanged.
    pub async fn update(store: &dyn Store, id: TaskId, patch: TaskPatch) -> Result<Task> {
        store
            .update_task(id, patch)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("task", id))
    }

    /// Delete a task by id (administrative purge).
    pub async fn delete(store: &dyn Store, id: TaskId) -> Result<()> {
        let removed = store
            .delete_task(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        if removed {
            Ok(())
        } else {
            Err(TaskopsError::not_found("task", id))
        }
    }

    /// Resolve the project that owns this task, transitively through its
    /// environment. Used by the external authorization collaborator.
    pub async fn permission_scope(store: &dyn Store, id: TaskId) -> Result<ProjectId> {
        let task = Self::get(store, id).await?;
        store
            .environment_project(task.environment)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("environment", task.environment))
    }

    /// Point lookup by the opaque executor handle.
    pub async fn find_by_remote_id(store: &dyn Store, remote_id: &str) -> Result<Option<Task>> {
        let filter = Filter::new().eq("remote_id", remote_id);
        let mut tasks = store
            .tasks_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        Ok(if tasks.is_empty() {
            None
        } else {
            Some(tasks.remove(0))
        })
    }

    /// Newest-first listing for one environment, optionally capped. This is
    /// the snapshot feed for live task collections.
    pub async fn list_for_environment(
        store: &dyn Store,
        environment: EnvironmentId,
        limit: Option<usize>,
    ) -> Result<Vec<Task>> {
        let filter = Filter::new().eq("environment", environment);
        let mut tasks = store
            .tasks_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        tasks.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    /// Predicate-filtered listing; each constraint applies only when
    /// supplied.
    pub async fn list_where(
        store: &dyn Store,
        environment: Option<EnvironmentId>,
        status: Option<TaskStatus>,
        task_type: Option<&str>,
    ) -> Result<Vec<Task>> {
        let filter = Filter::new()
            .eq_opt("environment", environment)
            .eq_opt("status", status.map(|s| s.to_string()))
            .eq_opt("task_type", task_type);
        store
            .tasks_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }
}

impl Record for Task {
    fn field(&self, column: &str) -> FieldValue {
        match column {
            "id" => FieldValue::Int(self.id),
            "name" => FieldValue::Text(self.name.clone()),
            "status" => FieldValue::Text(self.status.to_string()),
            "environment" => FieldValue::Int(self.environment),
            "service" => FieldValue::Text(self.service.clone()),
            "command" => FieldValue::Text(self.command.clone()),
            "remote_id" => self.remote_id.clone().into(),
            "task_type" => self.task_type.clone().into(),
            _ => FieldValue::Null,
        }
    }
}
