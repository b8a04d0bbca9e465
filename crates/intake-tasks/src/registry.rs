//! Static task registry
//!
//! Every task type is described by a [`TaskRegistration`]: its type name,
//! execution phase, the fields its definition must carry, a factory and a
//! manifest seed. The table is built once at startup from an explicit list;
//! a malformed entry or a duplicate type name fails registration as a whole.

use std::collections::{BTreeMap, BTreeSet};

use intake_core::{ConfigError, TaskDefinition};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::RegistryError;
use crate::manifest::TaskManifest;
use crate::task::{Task, TaskPhase};

/// Builds a task from a definition that passed the required-field check
pub type TaskFactory = fn(&TaskDefinition) -> Result<Box<dyn Task>, RegistryError>;

/// Builds the initial `PENDING` manifest entry for a definition
pub type ManifestSeed = fn(&TaskDefinition) -> TaskManifest;

/// Keys every definition carries; a task schema may not claim them
const SHARED_FIELDS: &[&str] = &["name", "type", "enabled"];

/// One row of the registry table
#[derive(Debug, Clone, Copy)]
pub struct TaskRegistration {
    pub type_name: &'static str,
    pub phase: TaskPhase,
    pub required_fields: &'static [&'static str],
    pub build: TaskFactory,
    pub seed_manifest: ManifestSeed,
}

/// Definition schema for task types that need nothing beyond the shared fields
#[derive(Debug, Clone, Deserialize)]
pub struct BaseDefinition {
    pub name: String,
}

/// A task type that can be listed in the registry table.
///
/// `REQUIRED_FIELDS` and `seed_manifest` default to the base definition and
/// base manifest entry.
pub trait RegisteredTask: Task + Sized + 'static {
    const TYPE_NAME: &'static str;
    const PHASE: TaskPhase;
    const REQUIRED_FIELDS: &'static [&'static str] = &[];

    /// Typed definition, parsed from the full definition object
    type Definition: DeserializeOwned;

    fn from_definition(definition: Self::Definition) -> Result<Self, ConfigError>;

    fn seed_manifest(definition: &TaskDefinition) -> TaskManifest {
        TaskManifest::new(&definition.name, &definition.task_type)
    }
}

/// Registry row for `T`
pub fn registration<T: RegisteredTask>() -> TaskRegistration {
    TaskRegistration {
        type_name: T::TYPE_NAME,
        phase: T::PHASE,
        required_fields: T::REQUIRED_FIELDS,
        build: build_task::<T>,
        seed_manifest: T::seed_manifest,
    }
}

fn build_task<T: RegisteredTask>(definition: &TaskDefinition) -> Result<Box<dyn Task>, RegistryError> {
    let typed: T::Definition =
        serde_json::from_value(definition.to_value()).map_err(|e| ConfigError::InvalidValue {
            field: format!("tasks.{}", definition.name),
            message: e.to_string(),
        })?;
    Ok(Box::new(T::from_definition(typed)?))
}

/// A fresh task instance together with the manifest entry it owns
pub struct TaskBinding {
    pub task: Box<dyn Task>,
    pub manifest: TaskManifest,
    pub phase: TaskPhase,
}

/// Mapping from type name to registration
#[derive(Debug, Default)]
pub struct TaskRegistry {
    registrations: BTreeMap<&'static str, TaskRegistration>,
    pretasks: BTreeSet<&'static str>,
}

impl TaskRegistry {
    /// Registry of every built-in task type
    pub fn register_all() -> Result<Self, RegistryError> {
        Self::from_registrations(crate::builtin::registrations())
    }

    /// Build a registry from an explicit table
    pub fn from_registrations(
        registrations: impl IntoIterator<Item = TaskRegistration>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for registration in registrations {
            check_registration(&registration)?;
            if registry.registrations.contains_key(registration.type_name) {
                return Err(RegistryError::Duplicate(registration.type_name.to_string()));
            }
            if registration.phase == TaskPhase::Pretask {
                registry.pretasks.insert(registration.type_name);
            }
            registry
                .registrations
                .insert(registration.type_name, registration);
        }
        debug!(
            types = registry.registrations.len(),
            pretasks = registry.pretasks.len(),
            "task registry built"
        );
        Ok(registry)
    }

    pub fn get(&self, type_name: &str) -> Option<&TaskRegistration> {
        self.registrations.get(type_name)
    }

    /// Registrations ordered by type name
    pub fn registrations(&self) -> impl Iterator<Item = &TaskRegistration> {
        self.registrations.values()
    }

    /// Whether the definition's type runs in the pretask phase
    pub fn is_pretask(&self, definition: &TaskDefinition) -> bool {
        self.pretasks.contains(definition.task_type.as_str())
    }

    /// Validate `definition` against its concrete schema and bind a new task
    /// to a fresh `PENDING` manifest entry
    pub fn instantiate(&self, definition: &TaskDefinition) -> Result<TaskBinding, RegistryError> {
        let Some(registration) = self.get(&definition.task_type) else {
            error!(task = %definition.name, task_type = %definition.task_type, "unknown task type");
            return Err(RegistryError::UnknownTaskType(definition.task_type.clone()));
        };

        let missing: Vec<String> = registration
            .required_fields
            .iter()
            .filter(|field| !definition.has_param(field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            error!(task = %definition.name, missing = ?missing, "invalid task definition");
            return Err(ConfigError::MissingFields {
                task: definition.name.clone(),
                fields: missing,
            }
            .into());
        }

        let task = (registration.build)(definition).map_err(|e| {
            error!(task = %definition.name, error = %e, "invalid task definition");
            e
        })?;

        Ok(TaskBinding {
            task,
            manifest: (registration.seed_manifest)(definition),
            phase: registration.phase,
        })
    }
}

fn check_registration(registration: &TaskRegistration) -> Result<(), RegistryError> {
    let malformed = |reason: &str| RegistryError::Malformed {
        type_name: registration.type_name.to_string(),
        reason: reason.to_string(),
    };

    let name = registration.type_name;
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(malformed("type name must be non-empty snake_case"));
    }

    let mut seen = BTreeSet::new();
    for field in registration.required_fields {
        if SHARED_FIELDS.contains(field) {
            return Err(malformed(&format!("required field '{field}' is a shared field")));
        }
        if !seen.insert(*field) {
            return Err(malformed(&format!("required field '{field}' listed twice")));
        }
    }
    Ok(())
}
