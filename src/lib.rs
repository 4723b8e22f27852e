#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskops Core
//!
//! Core model layer for tracking operational tasks (cache clears, imports,
//! maintenance jobs) run against deployed environments, and for managing
//! the reusable "advanced task definitions" that can be selectively
//! enabled per environment.
//!
//! ## Overview
//!
//! Three concerns do the heavy lifting:
//!
//! - a permission-scoped, filterable query model over tasks and task
//!   definitions, built on composable conditional predicates;
//! - a template/binding model that turns a definition into something
//!   invokable in exactly one environment, with soft-deleted, audit-
//!   preserving registrations and per-scope name uniqueness;
//! - a live-collection reconciler that keeps a client-held task list
//!   consistent while a per-environment stream delivers upsert events out
//!   of order or more than once.
//!
//! Persistence and transport stay outside: the store is consumed through
//! the [`store::Store`] trait (an in-memory implementation ships for tests
//! and embedders), and the event channel is realized in-process by
//! [`channel::TaskEventHub`].
//!
//! ## Module Organization
//!
//! - [`models`] - tasks, definitions, arguments, registrations
//! - [`lifecycle`] - task status state machine and transition manager
//! - [`store`] - store collaborator contract + in-memory implementation
//! - [`query`] - composable predicate construction
//! - [`channel`] - per-environment task event broadcast
//! - [`reconciler`] - live collection merge and views
//! - [`service`] - caller-facing facade over the above
//! - [`config`] - layered configuration
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskops_core::config::TaskopsConfig;
//! use taskops_core::models::NewTask;
//! use taskops_core::service::TaskOps;
//! use taskops_core::store::MemoryStore;
//!
//! # async fn example() -> taskops_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.put_environment(5, 1); // environment 5 belongs to project 1
//!
//! let ops = TaskOps::new(store, TaskopsConfig::default());
//! let view = ops.live_task_view(5).await?;
//!
//! let task = ops
//!     .create_task(NewTask::new("cache-clear", 5, "cli", "drush cc all"))
//!     .await?;
//! println!("task {} is {} ({} in view)", task.id, task.status, view.len());
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod query;
pub mod reconciler;
pub mod service;
pub mod store;

pub use channel::{TaskChanged, TaskEventHub};
pub use config::TaskopsConfig;
pub use error::{Result, TaskopsError};
pub use lifecycle::{RemoteStatusUpdate, TaskLifecycle, TaskStatus};
pub use models::{
    AdvancedTaskDefinition, AdvancedTaskDefinitionArgument, ArgumentType, DefinitionScope,
    DefinitionType, NewAdvancedTaskDefinition, NewDefinitionArgument, NewTask, Task, TaskPatch,
    TaskPermission, TaskRegistration,
};
pub use reconciler::{LiveTaskView, MergeOutcome, TaskCollection};
pub use service::TaskOps;
pub use store::{MemoryStore, Store, StoreError};
