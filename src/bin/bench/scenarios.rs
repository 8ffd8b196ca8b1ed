// Scenario Definitions: parameter presets for the PON engine
// Each preset is a starting parameter set, a frame count, optional mid-run
// events, and pass criteria checked on the final state.

use pon_engine::{ParameterKey, PonSimulation, SignalTier, SimulationParameters};

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub frames: u32,
    pub parameters: fn() -> SimulationParameters,
    pub criteria: PassCriteria,
    /// Mid-run events (e.g. re-split the network at a given frame)
    pub mid_event: Option<Box<dyn Fn(&mut PonSimulation, u32) + Send + Sync>>,
}

pub struct PassCriteria {
    pub min_margin_db: Option<f64>,
    pub max_margin_db: Option<f64>,
    pub tier: Option<SignalTier>,
    pub min_spawned: Option<u64>,
    pub max_spawned: Option<u64>,
    pub max_dropped: Option<u64>,
    pub max_live_packets: Option<usize>,
    /// Frames offered while running must all tick, and paused ones none.
    pub require_frame_accounting: bool,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            min_margin_db: None,
            max_margin_db: None,
            tier: None,
            min_spawned: None,
            max_spawned: None,
            max_dropped: Some(0),
            max_live_packets: None,
            require_frame_accounting: true,
        }
    }
}

// ─── Parameter Presets ──────────────────────────────────────────────────────

fn lab_defaults() -> SimulationParameters {
    SimulationParameters::default()
}

fn short_feeder() -> SimulationParameters {
    SimulationParameters {
        fiber_distance: 1.0,
        splitter_ratio: 2.0,
        transmission_power: 7.0,
        ..SimulationParameters::default()
    }
}

fn dense_split() -> SimulationParameters {
    SimulationParameters {
        fiber_distance: 1.0,
        splitter_ratio: 32.0,
        transmission_power: 5.0,
        ..SimulationParameters::default()
    }
}

fn long_haul() -> SimulationParameters {
    SimulationParameters {
        fiber_distance: 20.0,
        splitter_ratio: 16.0,
        ..SimulationParameters::default()
    }
}

fn busy_hour() -> SimulationParameters {
    SimulationParameters {
        packet_generation_rate: 20.0,
        ..SimulationParameters::default()
    }
}

fn idle_line() -> SimulationParameters {
    SimulationParameters {
        packet_generation_rate: 0.0,
        ..SimulationParameters::default()
    }
}

// ─── Mid-Run Events ─────────────────────────────────────────────────────────

fn resplit_at(frame: u32, ratio: f64) -> Box<dyn Fn(&mut PonSimulation, u32) + Send + Sync> {
    Box::new(move |sim, f| {
        if f == frame {
            if let Err(e) = sim.update_parameter(ParameterKey::SplitterRatio, ratio) {
                tracing::warn!(error = %e, "resplit event rejected");
            }
        }
    })
}

fn pause_between(from: u32, to: u32) -> Box<dyn Fn(&mut PonSimulation, u32) + Send + Sync> {
    Box::new(move |sim, f| {
        if f == from {
            sim.pause();
        } else if f == to {
            sim.resume();
        }
    })
}

// ─── Catalogue ──────────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        // ─── Power Budget (3) ───────────────────────────────────────────
        Scenario { name: "LAB_DEFAULTS", label: "Lab Defaults (1:8, 10 km)", category: "budget",
            frames: 1800, parameters: lab_defaults,
            criteria: PassCriteria { max_margin_db: Some(0.0), tier: Some(SignalTier::Critical),
                min_spawned: Some(1), ..Default::default() },
            mid_event: None },
        Scenario { name: "SHORT_FEEDER", label: "Short Feeder (1:2, 1 km, 7 dBm)", category: "budget",
            frames: 1800, parameters: short_feeder,
            criteria: PassCriteria { min_margin_db: Some(10.0), tier: Some(SignalTier::Excellent),
                min_spawned: Some(1), ..Default::default() },
            mid_event: None },
        Scenario { name: "LONG_HAUL", label: "Long Haul (1:16, 20 km)", category: "budget",
            frames: 1800, parameters: long_haul,
            criteria: PassCriteria { max_margin_db: Some(0.0), tier: Some(SignalTier::Critical),
                ..Default::default() },
            mid_event: None },

        // ─── Traffic (3) ────────────────────────────────────────────────
        Scenario { name: "DENSE_SPLIT", label: "Dense Split (1:32)", category: "traffic",
            frames: 3600, parameters: dense_split,
            criteria: PassCriteria { min_spawned: Some(1), ..Default::default() },
            mid_event: None },
        Scenario { name: "BUSY_HOUR", label: "Busy Hour (20 pkt/s)", category: "traffic",
            frames: 3600, parameters: busy_hour,
            // one spawn attempt every ~3 frames, 8-way fan-out, 50-frame transit
            criteria: PassCriteria { min_spawned: Some(100), max_live_packets: Some(600),
                ..Default::default() },
            mid_event: None },
        Scenario { name: "IDLE_LINE", label: "Idle Line (0 pkt/s)", category: "traffic",
            frames: 1800, parameters: idle_line,
            criteria: PassCriteria { max_spawned: Some(0), max_live_packets: Some(0),
                ..Default::default() },
            mid_event: None },

        // ─── Controls (2) ───────────────────────────────────────────────
        Scenario { name: "RESPLIT_MIDRUN", label: "Re-split 1:8 -> 1:16 at frame 900", category: "controls",
            frames: 1800, parameters: lab_defaults,
            criteria: PassCriteria { min_spawned: Some(1), ..Default::default() },
            mid_event: Some(resplit_at(900, 16.0)) },
        Scenario { name: "PAUSE_RESUME", label: "Pause frames 600..1200", category: "controls",
            frames: 1800, parameters: lab_defaults,
            criteria: PassCriteria { min_spawned: Some(1), ..Default::default() },
            mid_event: Some(pause_between(600, 1200)) },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names_unique() {
        let all = scenarios();
        let mut names: Vec<_> = all.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_presets_are_finite() {
        for s in scenarios() {
            assert!((s.parameters)().is_finite(), "{} has non-finite parameters", s.name);
        }
    }
}
