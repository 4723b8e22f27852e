// Lifecycle management for operational task instances.
//
// `states` defines the status set and which transitions the state machine
// permits; `manager` applies transitions against the store, stamps the
// started/completed timestamps, handles executor callbacks keyed by the
// remote handle, and broadcasts every change.

pub mod manager;
pub mod states;

pub use manager::{RemoteStatusUpdate, TaskLifecycle};
pub use states::TaskStatus;
