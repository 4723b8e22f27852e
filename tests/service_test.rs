//! Facade tests covering the caller-facing operation surface end to end.

mod common;

use common::{command_definition, new_task, seeded_store};
use taskops_core::config::TaskopsConfig;
use taskops_core::lifecycle::{RemoteStatusUpdate, TaskStatus};
use taskops_core::models::{DefinitionScope, NewTask, TaskPatch};
use taskops_core::service::TaskOps;
use taskops_core::TaskopsError;

fn ops() -> TaskOps {
    TaskOps::new(seeded_store(), TaskopsConfig::default())
}

#[tokio::test]
async fn task_crud_round_trip() {
    let ops = ops();
    let task = ops.create_task(new_task("cache-clear", 5)).await.unwrap();

    let fetched = ops.get_task(task.id).await.unwrap();
    assert_eq!(fetched, task);

    let patched = ops
        .update_task(
            task.id,
            TaskPatch {
                name: Some("cache-clear-all".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.name, "cache-clear-all");
    assert_eq!(patched.status, TaskStatus::New);

    ops.delete_task(task.id).await.unwrap();
    let err = ops.get_task(task.id).await.unwrap_err();
    assert!(matches!(err, TaskopsError::NotFound { .. }));
}

#[tokio::test]
async fn create_task_validates_environment_and_fields() {
    let ops = ops();

    let err = ops
        .create_task(new_task("cache-clear", 404))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::NotFound { entity, .. } if entity == "environment"));

    let err = ops.create_task(new_task("  ", 5)).await.unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));

    // Raw JSON input surfaces the same taxonomy.
    let err = NewTask::from_json(serde_json::json!({"name": "x"})).unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));
}

#[tokio::test]
async fn update_task_enforces_the_state_machine() {
    let ops = ops();
    let task = ops.create_task(new_task("cache-clear", 5)).await.unwrap();
    ops.transition_task(task.id, TaskStatus::Running)
        .await
        .unwrap();

    let err = ops
        .update_task(task.id, TaskPatch::status(TaskStatus::Pending))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::InvalidTransition { .. }));
}

#[tokio::test]
async fn list_tasks_constrains_only_on_supplied_filters() {
    let ops = ops();
    let a = ops.create_task(new_task("one", 5)).await.unwrap();
    ops.create_task(new_task("two", 5)).await.unwrap();
    ops.create_task(new_task("three", 7)).await.unwrap();
    ops.transition_task(a.id, TaskStatus::Running).await.unwrap();

    let everything = ops.list_tasks(None, None, None).await.unwrap();
    assert_eq!(everything.len(), 3);

    let in_env5 = ops.list_tasks(Some(5), None, None).await.unwrap();
    assert_eq!(in_env5.len(), 2);

    let running_in_env5 = ops
        .list_tasks(Some(5), Some(TaskStatus::Running), None)
        .await
        .unwrap();
    assert_eq!(running_in_env5.len(), 1);
    assert_eq!(running_in_env5[0].id, a.id);
}

#[tokio::test]
async fn permission_scope_resolves_through_environment() {
    let ops = ops();
    let in_project_1 = ops.create_task(new_task("cache-clear", 5)).await.unwrap();
    let in_project_2 = ops.create_task(new_task("cache-clear", 9)).await.unwrap();

    assert_eq!(
        ops.permission_scope_for_task(in_project_1.id).await.unwrap(),
        1
    );
    assert_eq!(
        ops.permission_scope_for_task(in_project_2.id).await.unwrap(),
        2
    );

    let err = ops.permission_scope_for_task(9999).await.unwrap_err();
    assert!(matches!(err, TaskopsError::NotFound { .. }));
}

#[tokio::test]
async fn definition_registration_flow() {
    let ops = ops();
    let definition = ops
        .create_advanced_task_definition(command_definition(
            "cache-clear",
            DefinitionScope::Environment { environment: 5 },
        ))
        .await
        .unwrap();

    ops.register_definition_for_environment(definition.id, 5)
        .await
        .unwrap();

    let resolved = ops.resolve_definitions_for_environment(5).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, definition.id);

    let found = ops
        .find_definition_by_name("cache-clear", None, Some(5))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let registrations = ops
        .list_active_registrations_for_environment(5)
        .await
        .unwrap();
    ops.deregister_definition_for_environment(registrations[0].id)
        .await
        .unwrap();
    assert!(ops
        .resolve_definitions_for_environment(5)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn subscription_sees_creates_and_status_callbacks() {
    let ops = ops();
    let mut feed = ops.subscribe_to_task_changes(5);

    let task = ops.create_task(new_task("cache-clear", 5)).await.unwrap();
    ops.lifecycle()
        .mark_dispatched(task.id, "runner-1".to_string())
        .await
        .unwrap();
    ops.task_status_callback(RemoteStatusUpdate {
        remote_id: "runner-1".to_string(),
        status: TaskStatus::Running,
    })
    .await
    .unwrap();

    let created = feed.recv().await.unwrap();
    assert_eq!(created.task.id, task.id);
    assert_eq!(created.sequence, 1);

    let dispatched = feed.recv().await.unwrap();
    assert_eq!(dispatched.task.remote_id.as_deref(), Some("runner-1"));
    assert_eq!(dispatched.sequence, 2);

    let running = feed.recv().await.unwrap();
    assert_eq!(running.task.status, TaskStatus::Running);
    assert_eq!(running.sequence, 3);
}
