//! Per-environment broadcast of task upsert events.
//!
//! The hub is the in-process realization of the external event Channel:
//! one broadcast channel per environment, created lazily, with any number
//! of concurrent subscribers. Every published event carries the full task
//! representation plus a monotonic per-task sequence number stamped here
//! at publish time; the sequence is what lets consumers fence out-of-order
//! delivery for the same task id.
//!
//! Dropping a receiver tears down exactly that subscription; other
//! subscribers and the store are untouched.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{EnvironmentId, Task, TaskId};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Full-task upsert notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskChanged {
    /// Monotonic per-task sequence; higher means fresher state for the
    /// same task id. Snapshot-seeded collection entries hold 0, so every
    /// live event supersedes them.
    pub sequence: u64,
    pub task: Task,
}

struct HubInner {
    channels: DashMap<EnvironmentId, broadcast::Sender<TaskChanged>>,
    sequences: DashMap<TaskId, u64>,
    capacity: usize,
}

#[derive(Clone)]
pub struct TaskEventHub {
    inner: Arc<HubInner>,
}

impl TaskEventHub {
    /// Create a hub whose per-environment channels buffer `capacity`
    /// events for slow subscribers.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: DashMap::new(),
                sequences: DashMap::new(),
                capacity,
            }),
        }
    }

    fn sender(&self, environment: EnvironmentId) -> broadcast::Sender<TaskChanged> {
        self.inner
            .channels
            .entry(environment)
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone()
    }

    /// Subscribe to upsert events for one environment.
    pub fn subscribe(&self, environment: EnvironmentId) -> broadcast::Receiver<TaskChanged> {
        self.sender(environment).subscribe()
    }

    /// Broadcast the current state of a task to its environment's
    /// subscribers. Returns the stamped sequence number. Publishing with
    /// no subscribers is not an error.
    pub fn publish(&self, task: &Task) -> u64 {
        let sequence = {
            let mut entry = self.inner.sequences.entry(task.id).or_insert(0);
            *entry += 1;
            *entry
        };
        let event = TaskChanged {
            sequence,
            task: task.clone(),
        };
        let receivers = self.sender(task.environment).send(event).unwrap_or(0);
        debug!(
            task_id = task.id,
            environment_id = task.environment,
            sequence,
            receivers,
            "task change published"
        );
        sequence
    }

    /// Number of live subscriptions for an environment.
    pub fn subscriber_count(&self, environment: EnvironmentId) -> usize {
        self.inner
            .channels
            .get(&environment)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl Default for TaskEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
