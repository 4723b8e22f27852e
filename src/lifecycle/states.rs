use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status definitions for operational task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Initial status when the task row is created
    New,
    /// Task has been handed to the executor but not yet scheduled
    Pending,
    /// Task is waiting in the executor's queue
    Queued,
    /// Task is currently executing
    Running,
    /// Task completed successfully
    Succeeded,
    /// Task failed with an error
    Failed,
    /// Task was cancelled before completion
    Cancelled,
}

impl TaskStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Check if this is an active status (task is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Position along the forward execution order. Terminal states share
    /// the final rank.
    fn rank(&self) -> u8 {
        match self {
            Self::New => 0,
            Self::Pending => 1,
            Self::Queued => 2,
            Self::Running => 3,
            Self::Succeeded | Self::Failed | Self::Cancelled => 4,
        }
    }

    /// Whether a transition into `next` is legal from this status.
    ///
    /// Transitions are strictly forward along
    /// new -> pending -> queued -> running -> {succeeded, failed, cancelled};
    /// skipping intermediate statuses is legal (a callback can outrun the
    /// events between), moving backward or re-asserting the current status
    /// is not. Terminal statuses are absorbing. `cancelled` is reachable
    /// from every non-terminal status.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Pending => write!(f, "pending"),
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Default status for new tasks
impl Default for TaskStatus {
    fn default() -> Self {
        Self::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::New.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(TaskStatus::New.can_transition_to(TaskStatus::Pending));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Queued));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Succeeded));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));

        // Skips are legal
        assert!(TaskStatus::New.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_backward_and_repeat_transitions_rejected() {
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Queued));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::New));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_cancelled_reachable_from_any_non_terminal() {
        for status in [
            TaskStatus::New,
            TaskStatus::Pending,
            TaskStatus::Queued,
            TaskStatus::Running,
        ] {
            assert!(status.can_transition_to(TaskStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [
            TaskStatus::Succeeded,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            for next in [
                TaskStatus::New,
                TaskStatus::Pending,
                TaskStatus::Queued,
                TaskStatus::Running,
                TaskStatus::Succeeded,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(
            "succeeded".parse::<TaskStatus>().unwrap(),
            TaskStatus::Succeeded
        );
        assert!("resolved".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let status = TaskStatus::Queued;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"queued\"");

        let parsed: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
