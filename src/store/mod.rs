//! # Store Collaborator Contract
//!
//! The persistence engine lives outside this crate; the core consumes it
//! through the operations here: point lookup by id, insert with a full
//! field set, partial update by id, delete by id, predicate-filtered
//! listing, and the two join-style lookups (environment ownership,
//! registration resolution happens at the model layer over these
//! primitives).
//!
//! Uniqueness invariants are racy if checked by the caller, so the store
//! owns the atomic check-and-writes: `insert_definition_checked` and
//! `insert_registration_checked` perform the conflict probe and the insert
//! as one serialized operation and report [`StoreError::Conflict`] when a
//! matching row already exists.
//!
//! Inserted rows with a non-positive id receive a store-assigned id.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AdvancedTaskDefinition, AdvancedTaskDefinitionArgument, DefinitionId, EnvironmentId,
    ProjectId, RegistrationId, RegistrationPatch, Task, TaskId, TaskPatch, TaskRegistration,
};
use crate::query::Filter;

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A checked insert found an existing row matching its conflict filter.
    #[error("uniqueness conflict on {0}")]
    Conflict(&'static str),

    /// The backing engine failed.
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Resolve the project owning an environment, or `None` when the
    /// environment is unknown. Environments are external entities; this is
    /// the one piece of them the core needs (permission scoping).
    async fn environment_project(
        &self,
        environment: EnvironmentId,
    ) -> StoreResult<Option<ProjectId>>;

    // task table

    async fn insert_task(&self, task: Task) -> StoreResult<Task>;
    async fn task_by_id(&self, id: TaskId) -> StoreResult<Option<Task>>;
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: TaskId) -> StoreResult<bool>;
    async fn tasks_matching(&self, filter: &Filter) -> StoreResult<Vec<Task>>;

    // advanced_task_definition table

    async fn insert_definition_checked(
        &self,
        definition: AdvancedTaskDefinition,
        conflict: &Filter,
    ) -> StoreResult<AdvancedTaskDefinition>;
    async fn definition_by_id(
        &self,
        id: DefinitionId,
    ) -> StoreResult<Option<AdvancedTaskDefinition>>;
    async fn definitions_matching(
        &self,
        filter: &Filter,
    ) -> StoreResult<Vec<AdvancedTaskDefinition>>;
    async fn delete_definition(&self, id: DefinitionId) -> StoreResult<bool>;

    // advanced_task_definition_argument table

    async fn insert_argument(
        &self,
        argument: AdvancedTaskDefinitionArgument,
    ) -> StoreResult<AdvancedTaskDefinitionArgument>;
    async fn arguments_for_definition(
        &self,
        definition: DefinitionId,
    ) -> StoreResult<Vec<AdvancedTaskDefinitionArgument>>;
    async fn delete_arguments_for_definition(&self, definition: DefinitionId) -> StoreResult<u64>;

    // task_registration table

    async fn insert_registration_checked(
        &self,
        registration: TaskRegistration,
        conflict: &Filter,
    ) -> StoreResult<TaskRegistration>;
    async fn registration_by_id(
        &self,
        id: RegistrationId,
    ) -> StoreResult<Option<TaskRegistration>>;
    async fn registrations_matching(&self, filter: &Filter) -> StoreResult<Vec<TaskRegistration>>;
    async fn update_registration(
        &self,
        id: RegistrationId,
        patch: RegistrationPatch,
    ) -> StoreResult<Option<TaskRegistration>>;
}
