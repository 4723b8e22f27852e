//! # Live Collection Reconciler
//!
//! Maintains an ordered, newest-first sequence of tasks for one
//! environment, seeded from a snapshot query and kept current by an
//! unordered stream of full-task upsert events.
//!
//! Merge rule per incoming event: an unseen task id is prepended to the
//! front; a known id is replaced in place, keeping its position. No event
//! is dropped for being "older" in wall-clock terms — freshness is decided
//! solely by the per-task sequence number stamped at publish time, and an
//! event whose sequence is not newer than the one currently held for that
//! id is rejected as stale. Snapshot entries hold sequence 0, so any live
//! event supersedes them.
//!
//! The feed carries no delete events: a task that should logically
//! disappear from view has no signal to do so, and rows only ever enter or
//! update the collection. Removal is left to a fresh snapshot.
//!
//! The merge itself performs no I/O and is safe to re-run against a stale
//! snapshot. Malformed raw events are dropped with a diagnostic — a live
//! feed must survive partial messages — and never abort the merge loop.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::{TaskChanged, TaskEventHub};
use crate::error::Result;
use crate::models::{EnvironmentId, Task, TaskId};
use crate::store::Store;

/// What a merge did with an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Unseen task id, prepended to the front.
    Inserted,
    /// Known task id, replaced in place.
    Replaced,
    /// Sequence not newer than the held one; event rejected.
    Stale,
    /// Event belongs to a different environment; event rejected.
    Ignored,
}

/// Ordered task collection for one environment.
#[derive(Debug)]
pub struct TaskCollection {
    environment: EnvironmentId,
    tasks: Vec<Task>,
    sequences: HashMap<TaskId, u64>,
}

impl TaskCollection {
    pub fn new(environment: EnvironmentId) -> Self {
        Self {
            environment,
            tasks: Vec::new(),
            sequences: HashMap::new(),
        }
    }

    /// Seed from a snapshot listing (expected newest-first). Rows from a
    /// foreign environment are discarded with a diagnostic.
    pub fn from_snapshot(environment: EnvironmentId, snapshot: Vec<Task>) -> Self {
        let mut collection = Self::new(environment);
        for task in snapshot {
            if task.environment != environment {
                warn!(
                    task_id = task.id,
                    task_environment = task.environment,
                    collection_environment = environment,
                    "snapshot row for foreign environment discarded"
                );
                continue;
            }
            collection.sequences.insert(task.id, 0);
            collection.tasks.push(task);
        }
        collection
    }

    /// Apply one upsert event.
    pub fn merge(&mut self, event: &TaskChanged) -> MergeOutcome {
        let incoming = &event.task;
        if incoming.environment != self.environment {
            debug!(
                task_id = incoming.id,
                task_environment = incoming.environment,
                collection_environment = self.environment,
                "event for foreign environment ignored"
            );
            return MergeOutcome::Ignored;
        }

        if let Some(&held) = self.sequences.get(&incoming.id) {
            if event.sequence <= held {
                debug!(
                    task_id = incoming.id,
                    held_sequence = held,
                    event_sequence = event.sequence,
                    "stale task event rejected"
                );
                return MergeOutcome::Stale;
            }
        }

        self.sequences.insert(incoming.id, event.sequence);
        match self.tasks.iter().position(|task| task.id == incoming.id) {
            Some(index) => {
                self.tasks[index] = incoming.clone();
                MergeOutcome::Replaced
            }
            None => {
                self.tasks.insert(0, incoming.clone());
                MergeOutcome::Inserted
            }
        }
    }

    /// Decode and apply a raw event payload. Malformed payloads are
    /// dropped with a diagnostic; `None` marks the drop.
    pub fn merge_raw(&mut self, payload: serde_json::Value) -> Option<MergeOutcome> {
        match serde_json::from_value::<TaskChanged>(payload) {
            Ok(event) => Some(self.merge(&event)),
            Err(error) => {
                warn!(%error, "malformed task event dropped");
                None
            }
        }
    }

    pub fn environment(&self) -> EnvironmentId {
        self.environment
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A live, self-updating task collection: snapshot plus subscription pump.
///
/// The collection is owned by this view; merges are serialized by the
/// single pump task. Dropping (or closing) the view tears down only its
/// own subscription.
pub struct LiveTaskView {
    collection: Arc<RwLock<TaskCollection>>,
    pump: JoinHandle<()>,
}

impl LiveTaskView {
    /// Subscribe, snapshot, and start pumping events. Subscription happens
    /// before the snapshot read so no event published in between is lost —
    /// at worst an event duplicates snapshot state and replaces in place.
    pub async fn open(
        store: &dyn Store,
        hub: &TaskEventHub,
        environment: EnvironmentId,
        limit: Option<usize>,
    ) -> Result<Self> {
        let mut receiver = hub.subscribe(environment);
        let snapshot = Task::list_for_environment(store, environment, limit).await?;
        let collection = Arc::new(RwLock::new(TaskCollection::from_snapshot(
            environment,
            snapshot,
        )));

        let pumped = Arc::clone(&collection);
        let pump = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        pumped.write().merge(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            environment_id = environment,
                            missed, "live task feed lagged; events were dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Self { collection, pump })
    }

    /// Current contents, newest-first.
    pub fn tasks(&self) -> Vec<Task> {
        self.collection.read().tasks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.collection.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.read().is_empty()
    }

    /// Stop consuming events. The collection keeps its last state.
    pub fn close(&self) {
        self.pump.abort();
    }
}

impl Drop for LiveTaskView {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::TaskStatus;
    use chrono::Utc;

    fn task(id: TaskId, environment: EnvironmentId, status: TaskStatus) -> Task {
        Task {
            id,
            name: format!("task-{id}"),
            status,
            created: Utc::now(),
            started: None,
            completed: None,
            environment,
            service: "cli".into(),
            command: "true".into(),
            remote_id: None,
            task_type: None,
            advanced_image: None,
            advanced_payload: None,
        }
    }

    fn event(sequence: u64, task: Task) -> TaskChanged {
        TaskChanged { sequence, task }
    }

    fn ids(collection: &TaskCollection) -> Vec<TaskId> {
        collection.tasks().iter().map(|t| t.id).collect()
    }

    #[test]
    fn unseen_task_is_prepended() {
        let snapshot = vec![task(2, 5, TaskStatus::Running), task(1, 5, TaskStatus::New)];
        let mut collection = TaskCollection::from_snapshot(5, snapshot);

        let outcome = collection.merge(&event(1, task(3, 5, TaskStatus::New)));
        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(ids(&collection), vec![3, 2, 1]);
    }

    #[test]
    fn known_task_is_replaced_in_place() {
        let snapshot = vec![
            task(3, 5, TaskStatus::New),
            task(2, 5, TaskStatus::Running),
            task(1, 5, TaskStatus::New),
        ];
        let mut collection = TaskCollection::from_snapshot(5, snapshot);

        let outcome = collection.merge(&event(1, task(2, 5, TaskStatus::Succeeded)));
        assert_eq!(outcome, MergeOutcome::Replaced);
        assert_eq!(ids(&collection), vec![3, 2, 1]);
        assert_eq!(collection.tasks()[1].status, TaskStatus::Succeeded);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut collection = TaskCollection::from_snapshot(5, vec![task(1, 5, TaskStatus::New)]);
        let update = event(4, task(1, 5, TaskStatus::Running));

        assert_eq!(collection.merge(&update), MergeOutcome::Replaced);
        let after_first = collection.tasks().to_vec();

        assert_eq!(collection.merge(&update), MergeOutcome::Stale);
        assert_eq!(collection.tasks(), &after_first[..]);
    }

    #[test]
    fn out_of_order_same_id_keeps_newest() {
        let mut collection = TaskCollection::new(5);

        assert_eq!(
            collection.merge(&event(2, task(1, 5, TaskStatus::Succeeded))),
            MergeOutcome::Inserted
        );
        // The earlier event arrives late and must not win.
        assert_eq!(
            collection.merge(&event(1, task(1, 5, TaskStatus::Running))),
            MergeOutcome::Stale
        );
        assert_eq!(collection.tasks()[0].status, TaskStatus::Succeeded);
    }

    #[test]
    fn foreign_environment_event_is_ignored() {
        let mut collection = TaskCollection::new(5);
        assert_eq!(
            collection.merge(&event(1, task(1, 6, TaskStatus::New))),
            MergeOutcome::Ignored
        );
        assert!(collection.is_empty());
    }

    #[test]
    fn malformed_raw_event_is_dropped_not_fatal() {
        let mut collection = TaskCollection::new(5);
        assert_eq!(
            collection.merge_raw(serde_json::json!({"sequence": "not-a-number"})),
            None
        );
        assert_eq!(collection.merge_raw(serde_json::json!("garbage")), None);

        let ok = collection.merge_raw(
            serde_json::to_value(event(1, task(1, 5, TaskStatus::New))).unwrap(),
        );
        assert_eq!(ok, Some(MergeOutcome::Inserted));
    }

    #[test]
    fn live_event_supersedes_snapshot_state() {
        let mut collection =
            TaskCollection::from_snapshot(5, vec![task(1, 5, TaskStatus::Running)]);
        assert_eq!(
            collection.merge(&event(1, task(1, 5, TaskStatus::Succeeded))),
            MergeOutcome::Replaced
        );
        assert_eq!(collection.tasks()[0].status, TaskStatus::Succeeded);
    }
}
