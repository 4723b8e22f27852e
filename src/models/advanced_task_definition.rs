//! # Advanced Task Definition Model
//!
//! Reusable, named task templates with a declared scope, an invocation
//! permission level, and a typed argument list. A definition may apply
//! globally, to one project, to one environment, or to both at once;
//! the scope is an explicit tagged variant so the per-scope name
//! uniqueness invariant stays mechanically checkable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::task_argument::{AdvancedTaskDefinitionArgument, NewDefinitionArgument};
use super::task_registration::RegistrationPatch;
use super::{DefinitionId, EnvironmentId, ProjectId};
use crate::error::{Result, TaskopsError};
use crate::query::{FieldValue, Filter, Record};
use crate::store::{Store, StoreError};

/// Capability level required to invoke a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPermission {
    Guest,
    Developer,
    Maintainer,
}

impl fmt::Display for TaskPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Developer => write!(f, "developer"),
            Self::Maintainer => write!(f, "maintainer"),
        }
    }
}

/// Whether a definition runs a command in an existing service container or
/// launches a dedicated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionType {
    Command,
    Image,
}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Declared applicability of a definition. Project and environment narrow
/// independently; both at once is the narrowest scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionScope {
    Global,
    Project { project: ProjectId },
    Environment { environment: EnvironmentId },
    ProjectEnvironment {
        project: ProjectId,
        environment: EnvironmentId,
    },
}

impl DefinitionScope {
    pub fn new(project: Option<ProjectId>, environment: Option<EnvironmentId>) -> Self {
        match (project, environment) {
            (None, None) => Self::Global,
            (Some(project), None) => Self::Project { project },
            (None, Some(environment)) => Self::Environment { environment },
            (Some(project), Some(environment)) => Self::ProjectEnvironment {
                project,
                environment,
            },
        }
    }

    pub fn project(&self) -> Option<ProjectId> {
        match self {
            Self::Project { project } | Self::ProjectEnvironment { project, .. } => Some(*project),
            _ => None,
        }
    }

    pub fn environment(&self) -> Option<EnvironmentId> {
        match self {
            Self::Environment { environment }
            | Self::ProjectEnvironment { environment, .. } => Some(*environment),
            _ => None,
        }
    }

    /// Whether a definition with this scope is visible to a lookup
    /// constrained to the given project and/or environment. An
    /// unconstrained axis admits everything; a constrained axis admits an
    /// exact match or a definition with no constraint on that axis. A
    /// definition scoped to a *different* project or environment is never
    /// admitted.
    pub fn admits(&self, project: Option<ProjectId>, environment: Option<EnvironmentId>) -> bool {
        let project_ok = match project {
            None => true,
            Some(id) => self.project().map_or(true, |own| own == id),
        };
        let environment_ok = match environment {
            None => true,
            Some(id) => self.environment().map_or(true, |own| own == id),
        };
        project_ok && environment_ok
    }

    /// Exact-scope clauses for the per-scope uniqueness check; absent axes
    /// must be null, not unconstrained.
    fn exact_clauses(&self, filter: Filter) -> Filter {
        let filter = match self.project() {
            Some(project) => filter.eq("project", project),
            None => filter.is_null("project"),
        };
        match self.environment() {
            Some(environment) => filter.eq("environment", environment),
            None => filter.is_null("environment"),
        }
    }
}

impl fmt::Display for DefinitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Project { project } => write!(f, "project {project}"),
            Self::Environment { environment } => write!(f, "environment {environment}"),
            Self::ProjectEnvironment {
                project,
                environment,
            } => write!(f, "project {project} / environment {environment}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedTaskDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub command: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(rename = "type")]
    pub definition_type: DefinitionType,
    pub service: String,
    pub scope: DefinitionScope,
    pub permission: TaskPermission,
}

/// New definition for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdvancedTaskDefinition {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub command: Option<String>,
    #[serde(rename = "type")]
    pub definition_type: DefinitionType,
    pub service: String,
    pub scope: DefinitionScope,
    pub permission: TaskPermission,
}

impl AdvancedTaskDefinition {
    /// Create a definition, enforcing name uniqueness within its exact
    /// scope. The conflict check and insert are a single serialized
    /// operation inside the store, so concurrent creates for the same
    /// (name, scope) pair cannot both win.
    pub async fn create(
        store: &dyn Store,
        new_definition: NewAdvancedTaskDefinition,
    ) -> Result<AdvancedTaskDefinition> {
        if new_definition.name.trim().is_empty() {
            return Err(TaskopsError::Validation(
                "definition name must not be empty".into(),
            ));
        }
        match new_definition.definition_type {
            DefinitionType::Command if new_definition.command.is_none() => {
                return Err(TaskopsError::Validation(
                    "command definitions require a command".into(),
                ));
            }
            DefinitionType::Image if new_definition.image.is_none() => {
                return Err(TaskopsError::Validation(
                    "image definitions require an image".into(),
                ));
            }
            _ => {}
        }

        let definition = AdvancedTaskDefinition {
            id: 0,
            name: new_definition.name,
            description: new_definition.description,
            image: new_definition.image,
            command: new_definition.command,
            created: Utc::now(),
            definition_type: new_definition.definition_type,
            service: new_definition.service,
            scope: new_definition.scope,
            permission: new_definition.permission,
        };

        let name = definition.name.clone();
        let scope = definition.scope;
        let conflict = scope.exact_clauses(Filter::new().eq("name", name.as_str()));

        match store.insert_definition_checked(definition, &conflict).await {
            Ok(created) => {
                info!(
                    definition_id = created.id,
                    name = %created.name,
                    scope = %created.scope,
                    "advanced task definition created"
                );
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => Err(TaskopsError::DuplicateName {
                name,
                scope: scope.to_string(),
            }),
            Err(e) => Err(TaskopsError::Store(e.to_string())),
        }
    }

    /// Fetch a definition by id.
    pub async fn get(store: &dyn Store, id: DefinitionId) -> Result<AdvancedTaskDefinition> {
        store
            .definition_by_id(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("advanced task definition", id))
    }

    /// Attach an argument to an existing definition.
    pub async fn add_argument(
        store: &dyn Store,
        definition_id: DefinitionId,
        argument: NewDefinitionArgument,
    ) -> Result<AdvancedTaskDefinitionArgument> {
        Self::get(store, definition_id).await?;
        if argument.name.trim().is_empty() {
            return Err(TaskopsError::Validation(
                "argument name must not be empty".into(),
            ));
        }
        store
            .insert_argument(AdvancedTaskDefinitionArgument {
                id: 0,
                advanced_task_definition: definition_id,
                name: argument.name,
                arg_type: argument.arg_type,
            })
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// List the arguments owned by a definition.
    pub async fn arguments(
        store: &dyn Store,
        definition_id: DefinitionId,
    ) -> Result<Vec<AdvancedTaskDefinitionArgument>> {
        Self::get(store, definition_id).await?;
        store
            .arguments_for_definition(definition_id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// All definitions carrying a name, regardless of scope.
    pub async fn find_by_name(store: &dyn Store, name: &str) -> Result<Vec<AdvancedTaskDefinition>> {
        Self::find_by_name_scoped(store, name, None, None).await
    }

    /// Definitions carrying a name, narrowed by scope constraints that
    /// apply only when supplied. A supplied project or environment matches
    /// definitions declaring that exact id or no constraint on that axis;
    /// definitions scoped elsewhere are never returned.
    pub async fn find_by_name_scoped(
        store: &dyn Store,
        name: &str,
        project: Option<ProjectId>,
        environment: Option<EnvironmentId>,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        let filter = Filter::new().eq("name", name);
        let definitions = store
            .definitions_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        Ok(definitions
            .into_iter()
            .filter(|definition| definition.scope.admits(project, environment))
            .collect())
    }

    /// The definition carrying a name in exactly the given scope. Unlike
    /// [`Self::find_by_name_scoped`], an absent axis here means "must be
    /// unscoped", not "don't constrain" — this is the lookup the
    /// uniqueness invariant is defined over.
    pub async fn find_by_name_in_scope(
        store: &dyn Store,
        name: &str,
        scope: DefinitionScope,
    ) -> Result<Option<AdvancedTaskDefinition>> {
        let filter = scope.exact_clauses(Filter::new().eq("name", name));
        let mut definitions = store
            .definitions_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        Ok(if definitions.is_empty() {
            None
        } else {
            Some(definitions.remove(0))
        })
    }

    /// List every definition.
    pub async fn list_all(store: &dyn Store) -> Result<Vec<AdvancedTaskDefinition>> {
        store
            .definitions_matching(&Filter::new())
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// Definitions declaring an exact environment scope.
    pub async fn list_for_environment(
        store: &dyn Store,
        environment: EnvironmentId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        let filter = Filter::new().eq("environment", environment);
        store
            .definitions_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// Definitions declaring an exact project scope.
    pub async fn list_for_project(
        store: &dyn Store,
        project: ProjectId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        let filter = Filter::new().eq("project", project);
        store
            .definitions_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// Delete a definition. Its arguments go with it, and any active
    /// registration pointing at it is soft-deleted so it shows up in audit
    /// listings as invalidated rather than silently lingering.
    pub async fn delete(store: &dyn Store, id: DefinitionId) -> Result<()> {
        let definition = Self::get(store, id).await?;

        store
            .delete_arguments_for_definition(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;

        let active = Filter::new()
            .eq("advanced_task_definition", id)
            .is_null("deleted");
        let registrations = store
            .registrations_matching(&active)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        let now = Utc::now();
        for registration in &registrations {
            store
                .update_registration(
                    registration.id,
                    RegistrationPatch { deleted: Some(now) },
                )
                .await
                .map_err(|e| TaskopsError::Store(e.to_string()))?;
        }

        store
            .delete_definition(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;

        info!(
            definition_id = id,
            name = %definition.name,
            invalidated_registrations = registrations.len(),
            "advanced task definition deleted"
        );
        Ok(())
    }
}

impl Record for AdvancedTaskDefinition {
    fn field(&self, column: &str) -> FieldValue {
        match column {
            "id" => FieldValue::Int(self.id),
            "name" => FieldValue::Text(self.name.clone()),
            "service" => FieldValue::Text(self.service.clone()),
            "type" => FieldValue::Text(self.definition_type.to_string()),
            "project" => self.scope.project().into(),
            "environment" => self.scope.environment().into(),
            _ => FieldValue::Null,
        }
    }
}
