//! Task lifecycle tests: transition legality, timestamp stamping, executor
//! callbacks, and retry-as-a-new-row.

mod common;

use common::{new_task, seeded_store};
use taskops_core::channel::TaskEventHub;
use taskops_core::lifecycle::{RemoteStatusUpdate, TaskLifecycle, TaskStatus};
use taskops_core::models::Task;
use taskops_core::TaskopsError;

#[tokio::test]
async fn happy_path_stamps_timestamps_once() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::New);
    assert!(task.started.is_none() && task.completed.is_none());

    lifecycle
        .transition(task.id, TaskStatus::Pending)
        .await
        .unwrap();
    lifecycle
        .transition(task.id, TaskStatus::Queued)
        .await
        .unwrap();
    let running = lifecycle
        .transition(task.id, TaskStatus::Running)
        .await
        .unwrap();
    let started = running.started.expect("started set on entering running");
    assert!(running.completed.is_none());

    let done = lifecycle
        .transition(task.id, TaskStatus::Succeeded)
        .await
        .unwrap();
    assert_eq!(done.started, Some(started));
    let completed = done.completed.expect("completed set on terminal");
    assert!(started <= completed);
}

#[tokio::test]
async fn backward_transition_rejected_and_task_unchanged() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();

    let before = lifecycle
        .transition(task.id, TaskStatus::Running)
        .await
        .unwrap();

    let err = lifecycle
        .transition(task.id, TaskStatus::Queued)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::InvalidTransition { .. }));

    let after = Task::get(store.as_ref(), task.id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn terminal_states_absorb_everything() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();
    lifecycle.cancel(task.id).await.unwrap();

    for next in [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Succeeded,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        let err = lifecycle.transition(task.id, next).await.unwrap_err();
        assert!(matches!(err, TaskopsError::InvalidTransition { .. }));
    }

    let after = Task::get(store.as_ref(), task.id).await.unwrap();
    assert_eq!(after.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn remote_callbacks_resolve_through_the_handle() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();

    lifecycle
        .mark_dispatched(task.id, "builder-8f3a".to_string())
        .await
        .unwrap();

    // The handle is written once.
    let err = lifecycle
        .mark_dispatched(task.id, "builder-ffff".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));

    let updated = lifecycle
        .apply_remote_status(RemoteStatusUpdate {
            remote_id: "builder-8f3a".to_string(),
            status: TaskStatus::Running,
        })
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Running);
    assert!(updated.started.is_some());
}

#[tokio::test]
async fn unknown_remote_handle_fails_without_creating_a_task() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();
    let count_before = Task::list_for_environment(store.as_ref(), 5, None)
        .await
        .unwrap()
        .len();

    let err = lifecycle
        .apply_remote_status(RemoteStatusUpdate {
            remote_id: "nobody-home".to_string(),
            status: TaskStatus::Running,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::UnknownRemoteTask(id) if id == "nobody-home"));

    let count_after = Task::list_for_environment(store.as_ref(), 5, None)
        .await
        .unwrap()
        .len();
    assert_eq!(count_before, count_after);
}

#[tokio::test]
async fn raw_callback_payloads_decode_or_fail_typed() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();
    lifecycle
        .mark_dispatched(task.id, "builder-8f3a".to_string())
        .await
        .unwrap();

    let updated = lifecycle
        .apply_remote_payload(serde_json::json!({
            "remoteId": "builder-8f3a",
            "status": "queued"
        }))
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Queued);

    let err = lifecycle
        .apply_remote_payload(serde_json::json!({"status": "queued"}))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));

    let err = lifecycle
        .apply_remote_payload(serde_json::json!({
            "remoteId": "builder-8f3a",
            "status": "definitely-not-a-status"
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));
}

#[tokio::test]
async fn retry_spawns_a_new_row_and_preserves_history() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();
    lifecycle
        .mark_dispatched(task.id, "builder-8f3a".to_string())
        .await
        .unwrap();
    lifecycle
        .transition(task.id, TaskStatus::Failed)
        .await
        .unwrap();

    let retry = lifecycle.retry(task.id).await.unwrap();
    assert_ne!(retry.id, task.id);
    assert_eq!(retry.status, TaskStatus::New);
    assert_eq!(retry.environment, task.environment);
    assert_eq!(retry.service, task.service);
    assert_eq!(retry.command, task.command);
    assert!(retry.remote_id.is_none());

    // The failed row stays exactly as it was.
    let original = Task::get(store.as_ref(), task.id).await.unwrap();
    assert_eq!(original.status, TaskStatus::Failed);
    assert_eq!(original.remote_id.as_deref(), Some("builder-8f3a"));
}

#[tokio::test]
async fn only_failed_tasks_can_be_retried() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();

    let err = lifecycle.retry(task.id).await.unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));

    lifecycle
        .transition(task.id, TaskStatus::Succeeded)
        .await
        .unwrap();
    let err = lifecycle.retry(task.id).await.unwrap_err();
    assert!(matches!(err, TaskopsError::Validation(_)));
}

#[tokio::test]
async fn skipping_straight_to_terminal_leaves_started_unset() {
    let store = seeded_store();
    let lifecycle = TaskLifecycle::new(store.clone(), TaskEventHub::default());
    let task = Task::create(store.as_ref(), new_task("cache-clear", 5))
        .await
        .unwrap();

    let done = lifecycle
        .transition(task.id, TaskStatus::Failed)
        .await
        .unwrap();
    assert!(done.started.is_none());
    assert!(done.completed.is_some());
}
