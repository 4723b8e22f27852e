//! # Task Registration Model
//!
//! The binding that enables an advanced task definition for one
//! environment. At most one *active* registration may exist per
//! (definition, environment) pair; deregistration is a soft delete that
//! stamps `deleted` instead of removing the row, preserving the audit
//! trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::advanced_task_definition::AdvancedTaskDefinition;
use super::{DefinitionId, EnvironmentId, RegistrationId};
use crate::error::{Result, TaskopsError};
use crate::query::{FieldValue, Filter, Record};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRegistration {
    pub id: RegistrationId,
    pub advanced_task_definition: DefinitionId,
    pub environment: EnvironmentId,
    pub created: DateTime<Utc>,
    /// Soft delete marker; `None` means the registration is active.
    pub deleted: Option<DateTime<Utc>>,
}

/// Partial update; only the soft-delete marker is mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationPatch {
    pub deleted: Option<DateTime<Utc>>,
}

impl TaskRegistration {
    pub fn is_active(&self) -> bool {
        self.deleted.is_none()
    }

    /// Clauses selecting the active registration for a pair, if any.
    fn active_pair_filter(definition: DefinitionId, environment: EnvironmentId) -> Filter {
        Filter::new()
            .eq("advanced_task_definition", definition)
            .eq("environment", environment)
            .is_null("deleted")
    }

    /// Bind a definition to an environment. Fails with `NotFound` when
    /// either end of the binding does not exist, and `AlreadyRegistered`
    /// when an active registration for the pair is present. The conflict
    /// check and insert are one serialized store operation, so concurrent
    /// registrations for the same pair cannot both win.
    pub async fn register(
        store: &dyn Store,
        definition: DefinitionId,
        environment: EnvironmentId,
    ) -> Result<TaskRegistration> {
        AdvancedTaskDefinition::get(store, definition).await?;
        if store
            .environment_project(environment)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .is_none()
        {
            return Err(TaskopsError::not_found("environment", environment));
        }

        let registration = TaskRegistration {
            id: 0,
            advanced_task_definition: definition,
            environment,
            created: Utc::now(),
            deleted: None,
        };
        let conflict = Self::active_pair_filter(definition, environment);

        match store
            .insert_registration_checked(registration, &conflict)
            .await
        {
            Ok(created) => {
                info!(
                    registration_id = created.id,
                    definition_id = definition,
                    environment_id = environment,
                    "task definition registered for environment"
                );
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => Err(TaskopsError::AlreadyRegistered {
                definition,
                environment,
            }),
            Err(e) => Err(TaskopsError::Store(e.to_string())),
        }
    }

    /// Soft-delete a registration. Idempotent: deregistering an already
    /// deregistered binding returns it unchanged.
    pub async fn deregister(store: &dyn Store, id: RegistrationId) -> Result<TaskRegistration> {
        let registration = Self::get(store, id).await?;
        if !registration.is_active() {
            debug!(registration_id = id, "registration already deregistered");
            return Ok(registration);
        }

        let patch = RegistrationPatch {
            deleted: Some(Utc::now()),
        };
        let updated = store
            .update_registration(id, patch)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("task registration", id))?;

        info!(
            registration_id = id,
            definition_id = updated.advanced_task_definition,
            environment_id = updated.environment,
            "task definition deregistered from environment"
        );
        Ok(updated)
    }

    /// Fetch a registration by id, active or not.
    pub async fn get(store: &dyn Store, id: RegistrationId) -> Result<TaskRegistration> {
        store
            .registration_by_id(id)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?
            .ok_or_else(|| TaskopsError::not_found("task registration", id))
    }

    /// Active registrations for an environment.
    pub async fn list_for_environment(
        store: &dyn Store,
        environment: EnvironmentId,
    ) -> Result<Vec<TaskRegistration>> {
        let filter = Filter::new()
            .eq("environment", environment)
            .is_null("deleted");
        store
            .registrations_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// Audit variant: every registration for an environment, soft-deleted
    /// rows included.
    pub async fn list_for_environment_with_deleted(
        store: &dyn Store,
        environment: EnvironmentId,
    ) -> Result<Vec<TaskRegistration>> {
        let filter = Filter::new().eq("environment", environment);
        store
            .registrations_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))
    }

    /// The active registration binding a definition to an environment.
    pub async fn find_by_definition_and_environment(
        store: &dyn Store,
        definition: DefinitionId,
        environment: EnvironmentId,
    ) -> Result<TaskRegistration> {
        let filter = Self::active_pair_filter(definition, environment);
        let mut registrations = store
            .registrations_matching(&filter)
            .await
            .map_err(|e| TaskopsError::Store(e.to_string()))?;
        if registrations.is_empty() {
            Err(TaskopsError::not_found(
                "task registration",
                format!("definition {definition} in environment {environment}"),
            ))
        } else {
            Ok(registrations.remove(0))
        }
    }

    /// Join active registrations back to their definitions, sorted by
    /// definition name for deterministic display order.
    pub async fn resolve_definitions_for_environment(
        store: &dyn Store,
        environment: EnvironmentId,
    ) -> Result<Vec<AdvancedTaskDefinition>> {
        let registrations = Self::list_for_environment(store, environment).await?;
        let mut definitions = Vec::with_capacity(registrations.len());
        for registration in registrations {
            match store
                .definition_by_id(registration.advanced_task_definition)
                .await
                .map_err(|e| TaskopsError::Store(e.to_string()))?
            {
                Some(definition) => definitions.push(definition),
                // Deleting a definition soft-deletes its registrations, so
                // an unresolvable binding points at a consistency problem.
                None => warn!(
                    registration_id = registration.id,
                    definition_id = registration.advanced_task_definition,
                    "active registration references a missing definition; skipping"
                ),
            }
        }
        definitions.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(definitions)
    }
}

impl Record for TaskRegistration {
    fn field(&self, column: &str) -> FieldValue {
        match column {
            "id" => FieldValue::Int(self.id),
            "advanced_task_definition" => FieldValue::Int(self.advanced_task_definition),
            "environment" => FieldValue::Int(self.environment),
            "deleted" => self
                .deleted
                .map(|at| at.to_rfc3339())
                .into(),
            _ => FieldValue::Null,
        }
    }
}
