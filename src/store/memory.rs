//! In-memory reference implementation of the [`Store`] contract.
//!
//! All tables live behind a single `parking_lot::RwLock`, which is what
//! makes the checked inserts genuinely atomic: the conflict probe and the
//! write happen under one write guard. Ids are assigned sequentially per
//! table. Used by the test suites and by embedders without a real backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AdvancedTaskDefinition, AdvancedTaskDefinitionArgument, ArgumentId, DefinitionId,
    EnvironmentId, ProjectId, RegistrationId, RegistrationPatch, Task, TaskId, TaskPatch,
    TaskRegistration,
};
use crate::query::Filter;

#[derive(Default)]
struct Tables {
    environments: HashMap<EnvironmentId, ProjectId>,
    tasks: Vec<Task>,
    definitions: Vec<AdvancedTaskDefinition>,
    arguments: Vec<AdvancedTaskDefinitionArgument>,
    registrations: Vec<TaskRegistration>,
    next_task_id: TaskId,
    next_definition_id: DefinitionId,
    next_argument_id: ArgumentId,
    next_registration_id: RegistrationId,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an environment and the project owning it. Environments are
    /// provisioned outside the core, so this is the bootstrap/test seam.
    pub fn put_environment(&self, environment: EnvironmentId, project: ProjectId) {
        self.tables
            .write()
            .environments
            .insert(environment, project);
    }
}

fn assign_id(id: &mut i32) -> i32 {
    *id += 1;
    *id
}

#[async_trait]
impl Store for MemoryStore {
    async fn environment_project(
        &self,
        environment: EnvironmentId,
    ) -> StoreResult<Option<ProjectId>> {
        Ok(self.tables.read().environments.get(&environment).copied())
    }

    async fn insert_task(&self, mut task: Task) -> StoreResult<Task> {
        let mut tables = self.tables.write();
        if task.id <= 0 {
            task.id = assign_id(&mut tables.next_task_id);
        }
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn task_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self
            .tables
            .read()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned())
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write();
        match tables.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                patch.apply(task);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.tasks.len();
        tables.tasks.retain(|task| task.id != id);
        Ok(tables.tasks.len() < before)
    }

    async fn tasks_matching(&self, filter: &Filter) -> StoreResult<Vec<Task>> {
        Ok(self
            .tables
            .read()
            .tasks
            .iter()
            .filter(|task| filter.matches(*task))
            .cloned()
            .collect())
    }

    async fn insert_definition_checked(
        &self,
        mut definition: AdvancedTaskDefinition,
        conflict: &Filter,
    ) -> StoreResult<AdvancedTaskDefinition> {
        let mut tables = self.tables.write();
        if tables.definitions.iter().any(|row| conflict.matches(row)) {
            return Err(StoreError::Conflict("advanced_task_definition"));
        }
        if definition.id <= 0 {
            definition.id = assign_id(&mut tables.next_definition_id);
        }
        tables.definitions.push(definition.clone());
        Ok(definition)
    }

    async fn definition_by_id(
        &self,
        id: DefinitionId,
    ) -> StoreResult<Option<AdvancedTaskDefinition>> {
        Ok(self
            .tables
            .read()
            .definitions
            .iter()
            .find(|definition| definition.id == id)
            .cloned())
    }

    async fn definitions_matching(
        &self,
        filter: &Filter,
    ) -> StoreResult<Vec<AdvancedTaskDefinition>> {
        Ok(self
            .tables
            .read()
            .definitions
            .iter()
            .filter(|definition| filter.matches(*definition))
            .cloned()
            .collect())
    }

    async fn delete_definition(&self, id: DefinitionId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let before = tables.definitions.len();
        tables.definitions.retain(|definition| definition.id != id);
        Ok(tables.definitions.len() < before)
    }

    async fn insert_argument(
        &self,
        mut argument: AdvancedTaskDefinitionArgument,
    ) -> StoreResult<AdvancedTaskDefinitionArgument> {
        let mut tables = self.tables.write();
        if argument.id <= 0 {
            argument.id = assign_id(&mut tables.next_argument_id);
        }
        tables.arguments.push(argument.clone());
        Ok(argument)
    }

    async fn arguments_for_definition(
        &self,
        definition: DefinitionId,
    ) -> StoreResult<Vec<AdvancedTaskDefinitionArgument>> {
        Ok(self
            .tables
            .read()
            .arguments
            .iter()
            .filter(|argument| argument.advanced_task_definition == definition)
            .cloned()
            .collect())
    }

    async fn delete_arguments_for_definition(&self, definition: DefinitionId) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let before = tables.arguments.len();
        tables
            .arguments
            .retain(|argument| argument.advanced_task_definition != definition);
        Ok((before - tables.arguments.len()) as u64)
    }

    async fn insert_registration_checked(
        &self,
        mut registration: TaskRegistration,
        conflict: &Filter,
    ) -> StoreResult<TaskRegistration> {
        let mut tables = self.tables.write();
        if tables.registrations.iter().any(|row| conflict.matches(row)) {
            return Err(StoreError::Conflict("task_registration"));
        }
        if registration.id <= 0 {
            registration.id = assign_id(&mut tables.next_registration_id);
        }
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn registration_by_id(
        &self,
        id: RegistrationId,
    ) -> StoreResult<Option<TaskRegistration>> {
        Ok(self
            .tables
            .read()
            .registrations
            .iter()
            .find(|registration| registration.id == id)
            .cloned())
    }

    async fn registrations_matching(&self, filter: &Filter) -> StoreResult<Vec<TaskRegistration>> {
        Ok(self
            .tables
            .read()
            .registrations
            .iter()
            .filter(|registration| filter.matches(*registration))
            .cloned()
            .collect())
    }

    async fn update_registration(
        &self,
        id: RegistrationId,
        patch: RegistrationPatch,
    ) -> StoreResult<Option<TaskRegistration>> {
        let mut tables = self.tables.write();
        match tables
            .registrations
            .iter_mut()
            .find(|registration| registration.id == id)
        {
            Some(registration) => {
                if let Some(deleted) = patch.deleted {
                    registration.deleted = Some(deleted);
                }
                Ok(Some(registration.clone()))
            }
            None => Ok(None),
        }
    }
}
