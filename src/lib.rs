// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine

pub mod types;
pub mod power;
pub mod topology;
pub mod simulation;
pub mod scheduler;
pub mod persistence;

pub use types::*;
pub use power::{LinkHealth, LossBreakdown, MetricsReport, SignalTier};
pub use scheduler::{CancellationToken, FramePump, FrameScheduler};
pub use simulation::PonSimulation;
pub use topology::Topology;

use std::sync::Once;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wasm_bindgen::prelude::*;

use persistence::SettingsStore;

static LOGGING: Once = Once::new();

/// Route `tracing` output and panics to the browser console. Safe to call
/// more than once. Native hosts install their own subscriber instead.
pub fn init_logging() {
    LOGGING.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            tracing_wasm::set_as_global_default();
        }
    });
}

#[cfg(target_arch = "wasm32")]
fn default_store() -> Box<dyn SettingsStore + Send> {
    Box::new(persistence::BrowserStore)
}

#[cfg(not(target_arch = "wasm32"))]
fn default_store() -> Box<dyn SettingsStore + Send> {
    Box::new(persistence::MemoryStore::new())
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl PonSimulation {
    /// Restores the saved configuration if there is one.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        init_logging();
        PonSimulation::with_store(default_store(), ChaCha8Rng::from_entropy())
    }

    /// Like `new`, but with reproducible drop lengths and traffic.
    pub fn seeded(seed: u64) -> Self {
        init_logging();
        PonSimulation::with_store(default_store(), ChaCha8Rng::seed_from_u64(seed))
    }

    /// Unconditional tick, ignores the running flag.
    pub fn tick(&mut self, timestamp: f64) -> JsValue {
        let snapshot = self.tick_core(timestamp);
        serde_wasm_bindgen::to_value(&snapshot).unwrap_or(JsValue::NULL)
    }

    /// Per-animation-frame entry point. Returns `null` while paused.
    pub fn frame(&mut self, timestamp: f64) -> JsValue {
        match self.frame_core(timestamp) {
            Some(snapshot) => serde_wasm_bindgen::to_value(&snapshot).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    pub fn set_parameter(&mut self, key: &str, value: f64) -> Result<(), JsValue> {
        self.set_parameter_by_name(key, value)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Flip between running and paused; returns the new state.
    pub fn toggle_running(&mut self) -> bool {
        if self.is_running() {
            self.pause();
        } else {
            self.resume();
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Default parameters, no packets, fresh topology.
    pub fn reset(&mut self) {
        self.reset_core();
    }

    /// Persist the current parameters; resolves to the saved record.
    pub fn save(&mut self) -> Result<JsValue, JsValue> {
        let saved = self
            .save_configuration()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        serde_wasm_bindgen::to_value(&saved).map_err(JsValue::from)
    }

    pub fn get_snapshot(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.snapshot()).unwrap_or(JsValue::NULL)
    }

    pub fn get_nodes(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.topology.nodes()).unwrap_or(JsValue::NULL)
    }

    pub fn get_connections(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.topology.connections()).unwrap_or(JsValue::NULL)
    }

    pub fn get_packets(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.packets).unwrap_or(JsValue::NULL)
    }

    pub fn get_metrics(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.metrics).unwrap_or(JsValue::NULL)
    }

    pub fn get_metrics_report(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.metrics_report()).unwrap_or(JsValue::NULL)
    }

    pub fn get_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.stats).unwrap_or(JsValue::NULL)
    }

    pub fn get_connection_budget(&self, connection_id: u32) -> Option<f64> {
        self.connection_budget(connection_id)
    }

    /// Slider bounds for every parameter, in display order.
    pub fn get_parameter_ranges() -> JsValue {
        let ranges: Vec<ParameterRange> =
            ParameterKey::ALL.iter().map(|k| k.recommended_range()).collect();
        serde_wasm_bindgen::to_value(&ranges).unwrap_or(JsValue::NULL)
    }
}

impl Default for PonSimulation {
    fn default() -> Self {
        Self::new()
    }
}
