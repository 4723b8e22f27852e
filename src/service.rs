//! Caller-facing facade over the store, the event hub, and the lifecycle
//! manager.
//!
//! [`TaskOps`] bundles the collaborators and exposes the operation surface
//! one method per operation, so embedders (API resolvers, CLI handlers,
//! action consumers) depend on a single entry point instead of wiring the
//! model layer themselves.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::channel::{TaskChanged, TaskEventHub};
use crate::config::TaskopsConfig;
use crate::error::Result;
use crate::lifecycle::{RemoteStatusUpdate, TaskLifecycle, TaskStatus};
use crate::models::{
    AdvancedTaskDefinition, AdvancedTaskDefinitionArgument, DefinitionId, EnvironmentId,
    NewAdvancedTaskDefinition, NewDefinitionArgument, NewTask, ProjectId, RegistrationId, Task,
    TaskId, TaskPatch, TaskRegistration,
};
use crate::reconciler::LiveTaskView;
use crate::store::Store;

pub struct TaskOps {
    store: Arc<dyn Store>,
    hub: TaskEventHub,
    lifecycle: TaskLifecycle,
    config: TaskopsConfig,
}

impl TaskOps {
    pub fn new(store: Arc<dyn Store>, config: TaskopsConfig) -> Self {
        let hub = TaskEventHub::new(config.channel.capacity);
        let lifecycle = TaskLifecycle::new(Arc::clone(&store), hub.clone());
        Self {
            store,
            hub,
            lifecycle,
            config,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn hub(&self) -> &TaskEventHub {
        &self.hub
    }

    pub fn lifecycle(&self) -> &TaskLifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &TaskopsConfig {
        &self.config
    }

    // tasks

    /// Create a task and announce it to the environment's subscribers.
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        let task = Task::create(self.store(), new_task).await?;
        self.hub.publish(&task);
        Ok(task)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        Task::get(self.store(), id).await
    }

    /// Partial update routed through the lifecycle manager so status
    /// changes are validated and broadcast.
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.lifecycle.update(id, patch).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        Task::delete(self.store(), id).await
    }

    pub async fn cancel_task(&self, id: TaskId) -> Result<Task> {
        self.lifecycle.cancel(id).await
    }

    pub async fn transition_task(&self, id: TaskId, next: TaskStatus) -> Result<Task> {
        self.lifecycle.transition(id, next).await
    }

    pub async fn retry_task(&self, id: TaskId) -> Result<Task> {
        self.lifecycle.retry(id).await
    }

    pub async fn task_status_callback(&self, update: RemoteStatusUpdate) -> Result<Task> {
        self.lifecycle.apply_remote_status(update).await
    }

    /// Filtered task listing; each constraint applies only when supplied.
    pub async fn list_tasks(
        &self,
        environment: Option<EnvironmentId>,
        status: Option<TaskStatus>,
        task_type: Option<&str>,
    ) -> Result<Vec<Task>> {
        Task::list_where(self.store(), environment, status, task_type).await
    }

    /// Project owning a task, resolved transitively through its
    /// environment; the authorization collaborator scopes on this.
    pub async fn permission_scope_for_task(&self, id: TaskId) -> Result<ProjectId> {
        Task::permission_scope(self.store(), id).await
    }

    // advanced task definitions

    pub async fn create_advanced_task_definition(
        &self,
        new_definition: NewAdvancedTaskDefinition,
    ) -> Result<AdvancedTaskDefinition> {
        AdvancedTaskDefinition::create(self.store(), new_definition).await
    }

    pub async fn add_definition_argument(
        &self,
        definition: DefinitionId,
        argument: NewDefinitionArgument,
    ) -> Result<AdvancedTaskDefinitionArgument> {
        AdvancedTaskDefinition::add_argument(self.store(), definition, argument).await
    }

    pub async fn get_definition(&self, id: DefinitionId) -> Result<AdvancedTaskDefinition> {
        AdvancedTaskDefinition::get(self.store(), id).await
    }

    pub async fn list_definition_arguments(
        &self,
        definition: DefinitionId,
    ) -> Result<Vec<AdvancedTaskDefinitionArgument>> {
        AdvancedTaskDefinition::arguments(self.store(), definition).await
    }

    pub async fn list_all_definitions(&self) -> Result<Vec<AdvancedTaskDefinition>> {
        AdvancedTaskDefinition::list_all(self.store()).await
    }

    pub async fn list_definitions_for_project(
        &self,
        project: ProjectId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        AdvancedTaskDefinition::list_for_project(self.store(), project).await
    }

    pub async fn list_definitions_for_environment(
        &self,
        environment: EnvironmentId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        AdvancedTaskDefinition::list_for_environment(self.store(), environment).await
    }

    pub async fn find_definition_by_name(
        &self,
        name: &str,
        project: Option<ProjectId>,
        environment: Option<EnvironmentId>,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        AdvancedTaskDefinition::find_by_name_scoped(self.store(), name, project, environment).await
    }

    pub async fn delete_definition(&self, id: DefinitionId) -> Result<()> {
        AdvancedTaskDefinition::delete(self.store(), id).await
    }

    // registrations

    pub async fn register_definition_for_environment(
        &self,
        definition: DefinitionId,
        environment: EnvironmentId,
    ) -> Result<TaskRegistration> {
        TaskRegistration::register(self.store(), definition, environment).await
    }

    pub async fn deregister_definition_for_environment(
        &self,
        registration: RegistrationId,
    ) -> Result<TaskRegistration> {
        TaskRegistration::deregister(self.store(), registration).await
    }

    pub async fn list_active_registrations_for_environment(
        &self,
        environment: EnvironmentId,
    ) -> Result<Vec<TaskRegistration>> {
        TaskRegistration::list_for_environment(self.store(), environment).await
    }

    pub async fn resolve_definitions_for_environment(
        &self,
        environment: EnvironmentId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        TaskRegistration::resolve_definitions_for_environment(self.store(), environment).await
    }

    // live feed

    /// Raw subscription to the environment's upsert stream.
    pub fn subscribe_to_task_changes(
        &self,
        environment: EnvironmentId,
    ) -> broadcast::Receiver<TaskChanged> {
        self.hub.subscribe(environment)
    }

    /// Snapshot-seeded, self-updating collection for one environment. The
    /// snapshot is capped by the configured limit.
    pub async fn live_task_view(&self, environment: EnvironmentId) -> Result<LiveTaskView> {
        LiveTaskView::open(
            self.store(),
            &self.hub,
            environment,
            self.config.tasks.snapshot_limit,
        )
        .await
    }
}
