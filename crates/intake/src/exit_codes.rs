//! Exit codes for the CLI

use intake_core::{ConfigError, IntakeError};
use intake_tasks::{EngineError, PersistError, RegistryError};

/// Success
pub const SUCCESS: i32 = 0;

/// The run finished but some task failed or was aborted, or a general error
pub const ERROR: i32 = 1;

/// Configuration or registry error; no manifest was produced
pub const CONFIG_ERROR: i32 = 2;

/// The remote manifest moved under us and the conflict was not resolved
pub const MANIFEST_CONFLICT: i32 = 6;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for an error that escaped a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<RegistryError>().is_some()
        || err.downcast_ref::<EngineError>().is_some()
        || matches!(err.downcast_ref::<IntakeError>(), Some(IntakeError::Config(_)))
    {
        return CONFIG_ERROR;
    }
    if err
        .downcast_ref::<PersistError>()
        .is_some_and(PersistError::is_generation_mismatch)
    {
        return MANIFEST_CONFLICT;
    }
    ERROR
}
