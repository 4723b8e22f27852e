//! Data layer for tasks, advanced task definitions, arguments, and
//! registrations.
//!
//! Each model owns its Store operations: construction, point lookups,
//! predicate-filtered listings, and the invariant checks its table
//! demands. Environments and projects are external entities and appear
//! only as ids.

pub mod advanced_task_definition;
pub mod task;
pub mod task_argument;
pub mod task_registration;

pub use advanced_task_definition::{
    AdvancedTaskDefinition, DefinitionScope, DefinitionType, NewAdvancedTaskDefinition,
    TaskPermission,
};
pub use task::{NewTask, Task, TaskPatch};
pub use task_argument::{AdvancedTaskDefinitionArgument, ArgumentType, NewDefinitionArgument};
pub use task_registration::{RegistrationPatch, TaskRegistration};

pub type TaskId = i32;
pub type EnvironmentId = i32;
pub type ProjectId = i32;
pub type DefinitionId = i32;
pub type ArgumentId = i32;
pub type RegistrationId = i32;
