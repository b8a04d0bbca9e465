//! Run-scoped key/value store bridging pretasks and tasks

use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ScratchpadError;

/// Values published by pretasks for later tasks.
///
/// Later writes to a key overwrite earlier ones. Reading a key nobody wrote
/// is an error for the reader.
#[derive(Debug, Default)]
pub struct Scratchpad {
    values: RwLock<HashMap<String, Value>>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`
    pub fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ScratchpadError> {
        let value = serde_json::to_value(value).map_err(|e| ScratchpadError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Read the value under `key` as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ScratchpadError> {
        let value = self
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| ScratchpadError::MissingKey(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| ScratchpadError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key)
    }
}
