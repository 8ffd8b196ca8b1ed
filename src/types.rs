// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Type Definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─── Node Role ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// OLT at the central office.
    HeadEnd = 0,
    Splitter = 1,
    /// ONU at the customer premises.
    Leaf = 2,
}

// ─── Node Status ─────────────────────────────────────────────────────────────

/// Operational status of a node. The engine always generates `Active` nodes;
/// the other states are reserved for fault injection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Active,
    Inactive,
    Warning,
    Error,
}

// ─── NetworkNode ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: u32,
    pub role: NodeRole,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub status: NodeStatus,
}

// ─── FiberConnection ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiberConnection {
    pub id: u32,
    pub source_id: u32,
    pub target_id: u32,
    /// Kilometers.
    pub length: f64,
    /// dB per kilometer.
    pub attenuation: f64,
}

// ─── Packet Direction ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Leaf toward head-end.
    Upstream,
    /// Head-end toward leaves.
    Downstream,
}

// ─── DataPacket ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPacket {
    pub id: u64,
    pub direction: Direction,
    pub source_id: u32,
    pub target_id: u32,
    /// Fraction of the link covered; `>= 1.0` means arrived.
    pub progress: f64,
    /// Bytes. Only weights the animation, never the throughput math.
    pub size: f64,
}

impl DataPacket {
    pub fn has_arrived(&self) -> bool {
        self.progress >= 1.0
    }

    /// Dot radius in canvas pixels, grown slightly by payload size.
    pub fn display_radius(&self) -> f64 {
        6.0 + self.size / 1000.0
    }
}

// ─── Parameter Errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("unknown simulation parameter: {0:?}")]
    UnknownKey(String),

    #[error("parameter {key} must be finite, got {value}")]
    NonFinite { key: ParameterKey, value: f64 },
}

// ─── Parameter Key ───────────────────────────────────────────────────────────

/// Names one field of [`SimulationParameters`]. The string form matches the
/// camelCase key used by the controls layer and the persisted settings blob.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKey {
    FiberDistance,
    SplitterRatio,
    TransmissionPower,
    ReceiverSensitivity,
    WavelengthDownstream,
    WavelengthUpstream,
    DataRateDownstream,
    DataRateUpstream,
    PacketGenerationRate,
}

/// Slider bounds the controls layer offers for a parameter.
/// Informational only: the engine never clamps to these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRange {
    pub key: ParameterKey,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: &'static str,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 9] = [
        Self::FiberDistance,
        Self::SplitterRatio,
        Self::TransmissionPower,
        Self::ReceiverSensitivity,
        Self::WavelengthDownstream,
        Self::WavelengthUpstream,
        Self::DataRateDownstream,
        Self::DataRateUpstream,
        Self::PacketGenerationRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiberDistance => "fiberDistance",
            Self::SplitterRatio => "splitterRatio",
            Self::TransmissionPower => "transmissionPower",
            Self::ReceiverSensitivity => "receiverSensitivity",
            Self::WavelengthDownstream => "wavelengthDownstream",
            Self::WavelengthUpstream => "wavelengthUpstream",
            Self::DataRateDownstream => "dataRateDownstream",
            Self::DataRateUpstream => "dataRateUpstream",
            Self::PacketGenerationRate => "packetGenerationRate",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::FiberDistance => "km",
            Self::SplitterRatio => "",
            Self::TransmissionPower | Self::ReceiverSensitivity => "dBm",
            Self::WavelengthDownstream | Self::WavelengthUpstream => "nm",
            Self::DataRateDownstream | Self::DataRateUpstream => "Gbps",
            Self::PacketGenerationRate => "pkt/s",
        }
    }

    pub fn recommended_range(&self) -> ParameterRange {
        let (min, max, step) = match self {
            Self::FiberDistance => (1.0, 20.0, 0.5),
            Self::SplitterRatio => (2.0, 16.0, 1.0),
            Self::TransmissionPower => (0.0, 10.0, 0.5),
            Self::ReceiverSensitivity => (-35.0, -20.0, 0.5),
            Self::WavelengthDownstream => (1480.0, 1500.0, 1.0),
            Self::WavelengthUpstream => (1290.0, 1330.0, 1.0),
            Self::DataRateDownstream => (1.25, 10.0, 1.25),
            Self::DataRateUpstream => (0.5, 5.0, 0.5),
            Self::PacketGenerationRate => (1.0, 20.0, 1.0),
        };
        ParameterRange { key: *self, min, max, step, unit: self.unit() }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKey {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParameterError::UnknownKey(s.to_string()))
    }
}

// ─── SimulationParameters ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    /// km
    pub fiber_distance: f64,
    /// 1:n fan-out
    pub splitter_ratio: f64,
    /// dBm
    pub transmission_power: f64,
    /// dBm
    pub receiver_sensitivity: f64,
    /// nm
    pub wavelength_downstream: f64,
    /// nm
    pub wavelength_upstream: f64,
    /// Gbps
    pub data_rate_downstream: f64,
    /// Gbps
    pub data_rate_upstream: f64,
    /// packets per second
    pub packet_generation_rate: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            fiber_distance: 10.0,
            splitter_ratio: 8.0,
            transmission_power: 3.0,
            receiver_sensitivity: -28.0,
            wavelength_downstream: 1490.0,
            wavelength_upstream: 1310.0,
            data_rate_downstream: 2.5,
            data_rate_upstream: 1.25,
            packet_generation_rate: 5.0,
        }
    }
}

impl SimulationParameters {
    pub fn get(&self, key: ParameterKey) -> f64 {
        match key {
            ParameterKey::FiberDistance => self.fiber_distance,
            ParameterKey::SplitterRatio => self.splitter_ratio,
            ParameterKey::TransmissionPower => self.transmission_power,
            ParameterKey::ReceiverSensitivity => self.receiver_sensitivity,
            ParameterKey::WavelengthDownstream => self.wavelength_downstream,
            ParameterKey::WavelengthUpstream => self.wavelength_upstream,
            ParameterKey::DataRateDownstream => self.data_rate_downstream,
            ParameterKey::DataRateUpstream => self.data_rate_upstream,
            ParameterKey::PacketGenerationRate => self.packet_generation_rate,
        }
    }

    /// Set one field. Non-finite values are rejected and leave the record
    /// untouched; no range or cross-field checks are applied.
    pub fn set(&mut self, key: ParameterKey, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFinite { key, value });
        }
        let slot = match key {
            ParameterKey::FiberDistance => &mut self.fiber_distance,
            ParameterKey::SplitterRatio => &mut self.splitter_ratio,
            ParameterKey::TransmissionPower => &mut self.transmission_power,
            ParameterKey::ReceiverSensitivity => &mut self.receiver_sensitivity,
            ParameterKey::WavelengthDownstream => &mut self.wavelength_downstream,
            ParameterKey::WavelengthUpstream => &mut self.wavelength_upstream,
            ParameterKey::DataRateDownstream => &mut self.data_rate_downstream,
            ParameterKey::DataRateUpstream => &mut self.data_rate_upstream,
            ParameterKey::PacketGenerationRate => &mut self.packet_generation_rate,
        };
        *slot = value;
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        ParameterKey::ALL.iter().all(|&k| self.get(k).is_finite())
    }

    /// Minimum milliseconds between spawn attempts. Infinite for a zero rate.
    pub fn spawn_interval_ms(&self) -> f64 {
        1000.0 / self.packet_generation_rate
    }
}

// ─── PowerMetrics ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerMetrics {
    /// dBm
    pub input_power: f64,
    /// dBm
    pub output_power: f64,
    /// dB, total of the loss breakdown
    pub loss: f64,
    /// dB
    pub margin: f64,
}

// ─── TrafficStats ────────────────────────────────────────────────────────────

/// Cumulative packet counters since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStats {
    pub spawned_downstream: u64,
    pub spawned_upstream: u64,
    pub fanned_out: u64,
    pub forwarded: u64,
    pub delivered_to_leaves: u64,
    pub delivered_to_head_end: u64,
    /// Arrivals whose target node no longer exists.
    pub dropped: u64,
}

// ─── SimSnapshot ─────────────────────────────────────────────────────────────

/// Everything the renderer reads for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSnapshot {
    pub tick: u64,
    pub nodes: Vec<NetworkNode>,
    pub connections: Vec<FiberConnection>,
    pub packets: Vec<DataPacket>,
    pub parameters: SimulationParameters,
    pub metrics: PowerMetrics,
    pub report: crate::power::MetricsReport,
    pub running: bool,
    pub stats: TrafficStats,
}
