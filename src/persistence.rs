// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Saved Configuration
//
// A single record `{ parameters, timestamp }` under one fixed key. In the
// browser it lives in `window.localStorage`; natively it lives in memory.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SimulationParameters;

/// Storage key for the saved configuration.
pub const STORAGE_KEY: &str = "ponSimulatorConfig";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("settings storage unavailable: {0}")]
    Unavailable(String),

    #[error("settings storage failed: {0}")]
    Storage(String),

    #[error("settings serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub parameters: SimulationParameters,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
}

impl SavedConfiguration {
    pub fn new(parameters: SimulationParameters, now: DateTime<Utc>) -> Self {
        Self {
            parameters,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Key-value backend for the saved configuration.
pub trait SettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn store(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one raw entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self { entries }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `window.localStorage`, looked up on each access.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStore;

#[cfg(target_arch = "wasm32")]
impl BrowserStore {
    fn storage() -> Result<web_sys::Storage, PersistenceError> {
        let window = web_sys::window()
            .ok_or_else(|| PersistenceError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| PersistenceError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| PersistenceError::Unavailable("localStorage disabled".into()))
    }
}

#[cfg(target_arch = "wasm32")]
impl SettingsStore for BrowserStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| PersistenceError::Storage(format!("{:?}", e)))
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| PersistenceError::Storage(format!("{:?}", e)))
    }
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Serialize `parameters` with a timestamp and write it under [`STORAGE_KEY`].
pub fn save_configuration(
    store: &mut dyn SettingsStore,
    parameters: &SimulationParameters,
    now: DateTime<Utc>,
) -> Result<SavedConfiguration, PersistenceError> {
    let config = SavedConfiguration::new(parameters.clone(), now);
    let json = serde_json::to_string(&config)?;
    store.store(STORAGE_KEY, &json)?;
    tracing::info!(timestamp = %config.timestamp, "saved configuration");
    Ok(config)
}

/// Read the saved record, if any, without falling back.
pub fn load_configuration(
    store: &dyn SettingsStore,
) -> Result<Option<SavedConfiguration>, PersistenceError> {
    match store.load(STORAGE_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Startup parameters: the saved ones when present and usable, defaults
/// otherwise. Never fails.
pub fn load_parameters(store: &dyn SettingsStore) -> SimulationParameters {
    match load_configuration(store) {
        Ok(Some(config)) if config.parameters.is_finite() => config.parameters,
        Ok(Some(config)) => {
            tracing::warn!(timestamp = %config.timestamp, "saved parameters not finite, using defaults");
            SimulationParameters::default()
        }
        Ok(None) => SimulationParameters::default(),
        Err(e) => {
            tracing::warn!(error = %e, "could not load saved configuration, using defaults");
            SimulationParameters::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
