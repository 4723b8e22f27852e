#![allow(dead_code)]

//! Shared helpers for the integration suites.

use std::sync::Arc;
use std::time::Duration;

use taskops_core::models::{
    DefinitionScope, DefinitionType, EnvironmentId, NewAdvancedTaskDefinition, NewTask,
    TaskPermission,
};
use taskops_core::store::MemoryStore;

/// A store with a few environments provisioned: 5 and 7 belong to
/// project 1, 9 to project 2.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_environment(5, 1);
    store.put_environment(7, 1);
    store.put_environment(9, 2);
    store
}

pub fn command_definition(name: &str, scope: DefinitionScope) -> NewAdvancedTaskDefinition {
    NewAdvancedTaskDefinition {
        name: name.to_string(),
        description: format!("{name} for tests"),
        image: None,
        command: Some("drush cache-rebuild".to_string()),
        definition_type: DefinitionType::Command,
        service: "cli".to_string(),
        scope,
        permission: TaskPermission::Developer,
    }
}

pub fn image_definition(name: &str, scope: DefinitionScope) -> NewAdvancedTaskDefinition {
    NewAdvancedTaskDefinition {
        name: name.to_string(),
        description: format!("{name} for tests"),
        image: Some("registry.example.com/tasks/runner:latest".to_string()),
        command: None,
        definition_type: DefinitionType::Image,
        service: "cli".to_string(),
        scope,
        permission: TaskPermission::Maintainer,
    }
}

pub fn new_task(name: &str, environment: EnvironmentId) -> NewTask {
    NewTask::new(name, environment, "cli", "drush cache-rebuild")
}

/// Poll until `check` passes or the deadline hits. The live view pump runs
/// on its own task, so assertions about it need a little patience.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
