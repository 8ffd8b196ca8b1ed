// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Optical Power Budget
//
// Illustrative loss model for teaching: fiber, splitter and connector terms
// summed into a single budget. Not calibrated against any fiber standard.

use serde::{Deserialize, Serialize};

use crate::types::{FiberConnection, PowerMetrics, SimulationParameters};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Typical single-mode attenuation, dB/km.
pub const FIBER_ATTENUATION_DB_PER_KM: f64 = 0.35;

/// Splitter insertion loss on top of the ideal power division, dB.
pub const SPLITTER_INSERTION_LOSS_DB: f64 = 0.5;

/// Loss per mated connector, dB.
pub const CONNECTOR_LOSS_DB: f64 = 0.3;

/// Connectors counted on every link (one per end).
pub const CONNECTORS_PER_LINK: f64 = 2.0;

/// Margin at which signal quality saturates at 100%.
const FULL_QUALITY_MARGIN_DB: f64 = 10.0;

/// Link budget below which a fiber is drawn as weak.
const WEAK_LINK_BUDGET_DBM: f64 = -20.0;

/// Floor and span used to normalize a link budget into a 0..1 color weight.
const LINK_LEVEL_FLOOR_DBM: f64 = -28.0;
const LINK_LEVEL_SPAN_DB: f64 = 30.0;

// ---------------------------------------------------------------------------
// Aggregate budget
// ---------------------------------------------------------------------------

/// The three loss terms that make up the aggregate budget, in dB.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossBreakdown {
    pub fiber: f64,
    pub splitter: f64,
    pub connector: f64,
}

impl LossBreakdown {
    pub fn total(&self) -> f64 {
        self.fiber + self.splitter + self.connector
    }
}

/// Split the aggregate loss into its terms.
///
/// The fiber term multiplies the summed link lengths by `fiber_distance`
/// as well, so distance is counted twice. This is a known quirk of the
/// model and is kept as-is so results stay comparable across versions.
pub fn loss_breakdown(
    parameters: &SimulationParameters,
    connections: &[FiberConnection],
) -> LossBreakdown {
    let total_length: f64 = connections.iter().map(|c| c.length).sum();
    LossBreakdown {
        fiber: total_length * parameters.fiber_distance * FIBER_ATTENUATION_DB_PER_KM,
        splitter: 10.0 * parameters.splitter_ratio.log10() + SPLITTER_INSERTION_LOSS_DB,
        connector: connections.len() as f64 * CONNECTORS_PER_LINK * CONNECTOR_LOSS_DB,
    }
}

/// Compute aggregate power metrics for the whole network.
pub fn calculate_power_metrics(
    parameters: &SimulationParameters,
    connections: &[FiberConnection],
) -> PowerMetrics {
    let loss = loss_breakdown(parameters, connections).total();
    let output_power = parameters.transmission_power - loss;
    PowerMetrics {
        input_power: parameters.transmission_power,
        output_power,
        loss,
        margin: output_power - parameters.receiver_sensitivity,
    }
}

// ---------------------------------------------------------------------------
// Per-link budget
// ---------------------------------------------------------------------------

/// Power left at the far end of a single link, dBm.
///
/// Uses the link's own attenuation and ignores the splitter, so the sum of
/// link budgets has no relation to the aggregate margin.
pub fn connection_budget(connection: &FiberConnection, transmission_power: f64) -> f64 {
    let fiber_loss = connection.length * connection.attenuation;
    let connector_loss = CONNECTORS_PER_LINK * CONNECTOR_LOSS_DB;
    transmission_power - fiber_loss - connector_loss
}

/// Normalize a link budget into a 0..1 weight for the fiber color gradient.
pub fn link_signal_level(budget: f64) -> f64 {
    ((budget - LINK_LEVEL_FLOOR_DBM) / LINK_LEVEL_SPAN_DB).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkHealth {
    Healthy,
    Weak,
}

impl LinkHealth {
    pub fn from_budget(budget: f64) -> Self {
        if budget < WEAK_LINK_BUDGET_DBM {
            Self::Weak
        } else {
            Self::Healthy
        }
    }
}

// ---------------------------------------------------------------------------
// Signal quality and throughput
// ---------------------------------------------------------------------------

/// Map power margin to a 0..=100 quality percentage, linear up to 10 dB.
pub fn signal_quality(margin: f64) -> f64 {
    if margin < 0.0 {
        return 0.0;
    }
    (margin / FULL_QUALITY_MARGIN_DB * 100.0).min(100.0).max(0.0)
}

/// Linear derating of a nominal rate by signal quality. No BER/FEC model.
pub fn effective_throughput(nominal_rate: f64, signal_quality: f64) -> f64 {
    nominal_rate * (signal_quality / 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalTier {
    /// 70-100%
    Excellent,
    /// 40-69%
    Acceptable,
    /// below 40%
    Critical,
}

impl SignalTier {
    pub fn from_quality(quality: f64) -> Self {
        if quality >= 70.0 {
            Self::Excellent
        } else if quality >= 40.0 {
            Self::Acceptable
        } else {
            Self::Critical
        }
    }
}

/// Derived figures shown next to the raw power metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub signal_quality: f64,
    pub tier: SignalTier,
    pub downstream_throughput: f64,
    pub upstream_throughput: f64,
    pub wavelength_downstream: f64,
    pub wavelength_upstream: f64,
}

impl MetricsReport {
    pub fn from_metrics(metrics: &PowerMetrics, parameters: &SimulationParameters) -> Self {
        let quality = signal_quality(metrics.margin);
        Self {
            signal_quality: quality,
            tier: SignalTier::from_quality(quality),
            downstream_throughput: effective_throughput(parameters.data_rate_downstream, quality),
            upstream_throughput: effective_throughput(parameters.data_rate_upstream, quality),
            wavelength_downstream: parameters.wavelength_downstream,
            wavelength_upstream: parameters.wavelength_upstream,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
