// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Simulation Core

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wasm_bindgen::prelude::*;

use crate::persistence::{self, MemoryStore, PersistenceError, SavedConfiguration, SettingsStore};
use crate::power::{self, MetricsReport};
use crate::scheduler::FrameScheduler;
use crate::topology::{leaf_count_for_ratio, Topology};
use crate::types::*;

/// Progress added to every live packet per tick: a fixed 50-tick transit,
/// independent of link length and frame rate.
pub const PROGRESS_STEP: f64 = 0.02;

pub const DOWNSTREAM_SPAWN_PROBABILITY: f64 = 0.7;
pub const UPSTREAM_SPAWN_PROBABILITY: f64 = 0.3;

/// Spawned packet sizes in bytes, `[min, max)`.
pub const DOWNSTREAM_SIZE_BYTES: (u32, u32) = (500, 1500);
pub const UPSTREAM_SIZE_BYTES: (u32, u32) = (100, 600);

// ─── PonSimulation struct ────────────────────────────────────────────────────

#[wasm_bindgen]
pub struct PonSimulation {
    pub(crate) topology: Topology,
    pub(crate) parameters: SimulationParameters,
    pub(crate) metrics: PowerMetrics,
    pub(crate) packets: Vec<DataPacket>,
    pub(crate) stats: TrafficStats,

    pub(crate) current_tick: u64,
    pub(crate) last_spawn_ms: f64,
    pub(crate) packet_id_counter: u64,

    pub(crate) scheduler: FrameScheduler,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) store: Box<dyn SettingsStore + Send>,
}

// ─── Construction ────────────────────────────────────────────────────────────

impl PonSimulation {
    /// Start from whatever `store` has saved, falling back to defaults.
    pub fn with_store(store: Box<dyn SettingsStore + Send>, rng: ChaCha8Rng) -> Self {
        let parameters = persistence::load_parameters(store.as_ref());
        Self::from_parts(parameters, store, rng)
    }

    /// Start from explicit parameters with an empty in-memory store.
    pub fn with_parameters(parameters: SimulationParameters, rng: ChaCha8Rng) -> Self {
        Self::from_parts(parameters, Box::new(MemoryStore::new()), rng)
    }

    /// Default parameters, reproducible randomness.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_parameters(SimulationParameters::default(), ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_parts(
        parameters: SimulationParameters,
        store: Box<dyn SettingsStore + Send>,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let topology = Topology::generate(leaf_count_for_ratio(parameters.splitter_ratio), &mut rng);
        let metrics = power::calculate_power_metrics(&parameters, topology.connections());
        Self {
            topology,
            parameters,
            metrics,
            packets: Vec::new(),
            stats: TrafficStats::default(),
            current_tick: 0,
            last_spawn_ms: 0.0,
            packet_id_counter: 0,
            scheduler: FrameScheduler::running(),
            rng,
            store,
        }
    }
}

// ─── Tick Logic (Testable, pure Rust) ────────────────────────────────────────

impl PonSimulation {
    /// One unconditional transition: spawn step, then advance step.
    /// Hosts normally go through [`frame_core`](Self::frame_core), which honours pause.
    pub fn tick_core(&mut self, timestamp_ms: f64) -> SimSnapshot {
        self.current_tick += 1;
        self.spawn_traffic(timestamp_ms);
        self.advance_packets();
        self.snapshot()
    }

    /// Scheduled tick. Returns `None` without touching state while paused.
    pub fn frame_core(&mut self, timestamp_ms: f64) -> Option<SimSnapshot> {
        if self.scheduler.should_dispatch() {
            Some(self.tick_core(timestamp_ms))
        } else {
            None
        }
    }

    /// Gated by the generation interval. `last_spawn_ms` only moves when the
    /// interval has elapsed.
    fn spawn_traffic(&mut self, timestamp_ms: f64) {
        let elapsed = timestamp_ms - self.last_spawn_ms;
        if elapsed >= self.parameters.spawn_interval_ms() {
            self.last_spawn_ms = timestamp_ms;
        } else {
            return;
        }

        let head_end = self.topology.head_end().map(|n| n.id);
        let splitter = self.topology.splitter().map(|n| n.id);

        // Downstream broadcast from the head-end
        if self.rng.gen::<f64>() < DOWNSTREAM_SPAWN_PROBABILITY {
            if let (Some(src), Some(dst)) = (head_end, splitter) {
                let size = self.rng.gen_range(DOWNSTREAM_SIZE_BYTES.0..DOWNSTREAM_SIZE_BYTES.1);
                self.spawn_packet(Direction::Downstream, src, dst, size as f64);
            }
        }

        // Upstream burst from a random leaf
        if self.rng.gen::<f64>() < UPSTREAM_SPAWN_PROBABILITY {
            let leaves: Vec<u32> = self.topology.leaves().map(|n| n.id).collect();
            if let Some(dst) = splitter.filter(|_| !leaves.is_empty()) {
                let src = leaves[self.rng.gen_range(0..leaves.len())];
                let size = self.rng.gen_range(UPSTREAM_SIZE_BYTES.0..UPSTREAM_SIZE_BYTES.1);
                self.spawn_packet(Direction::Upstream, src, dst, size as f64);
            }
        }
    }

    /// Move every live packet forward and resolve arrivals. Replacements
    /// start at progress 0 and are not advanced again this tick.
    fn advance_packets(&mut self) {
        // One view of the topology for the whole tick
        let leaves: Vec<u32> = self.topology.leaves().map(|n| n.id).collect();
        let head_end = self.topology.head_end().map(|n| n.id);

        let live = std::mem::take(&mut self.packets);
        let mut next = Vec::with_capacity(live.len());

        for mut p in live {
            p.progress += PROGRESS_STEP;
            if !p.has_arrived() {
                next.push(p);
                continue;
            }

            let target_role = self.topology.node(p.target_id).map(|n| n.role);
            match (p.direction, target_role) {
                (Direction::Downstream, Some(NodeRole::Splitter)) => {
                    let share = p.size / leaves.len() as f64;
                    for &leaf in &leaves {
                        next.push(self.new_packet(Direction::Downstream, p.target_id, leaf, share));
                    }
                    self.stats.fanned_out += leaves.len() as u64;
                    tracing::trace!(packet = p.id, leaves = leaves.len(), "split downstream packet");
                }
                (Direction::Upstream, Some(NodeRole::Splitter)) => {
                    if let Some(dst) = head_end {
                        next.push(self.new_packet(Direction::Upstream, p.target_id, dst, p.size));
                        self.stats.forwarded += 1;
                    }
                }
                (_, Some(NodeRole::Leaf)) => self.stats.delivered_to_leaves += 1,
                (_, Some(NodeRole::HeadEnd)) => self.stats.delivered_to_head_end += 1,
                (_, None) => self.stats.dropped += 1,
            }
        }

        self.packets = next;
    }

    fn new_packet(&mut self, direction: Direction, source_id: u32, target_id: u32, size: f64) -> DataPacket {
        self.packet_id_counter += 1;
        DataPacket {
            id: self.packet_id_counter,
            direction,
            source_id,
            target_id,
            progress: 0.0,
            size,
        }
    }

    /// Put a fresh packet on the wire. Used by the spawn step and available
    /// to hosts for injecting traffic by hand.
    pub fn spawn_packet(&mut self, direction: Direction, source_id: u32, target_id: u32, size: f64) -> u64 {
        let packet = self.new_packet(direction, source_id, target_id, size);
        let id = packet.id;
        match direction {
            Direction::Downstream => self.stats.spawned_downstream += 1,
            Direction::Upstream => self.stats.spawned_upstream += 1,
        }
        self.packets.push(packet);
        id
    }
}

// ─── Controls ────────────────────────────────────────────────────────────────

impl PonSimulation {
    /// Set one parameter and recompute metrics. A changed splitter ratio
    /// regenerates the topology and clears live packets.
    pub fn update_parameter(&mut self, key: ParameterKey, value: f64) -> Result<(), ParameterError> {
        let previous = self.parameters.get(key);
        if let Err(e) = self.parameters.set(key, value) {
            tracing::warn!(error = %e, "rejected parameter update");
            return Err(e);
        }
        if key == ParameterKey::SplitterRatio && previous != value {
            self.regenerate_topology();
        }
        self.recompute_metrics();
        Ok(())
    }

    /// Same as [`update_parameter`](Self::update_parameter) with a string key.
    pub fn set_parameter_by_name(&mut self, key: &str, value: f64) -> Result<(), ParameterError> {
        let key: ParameterKey = key.parse()?;
        self.update_parameter(key, value)
    }

    pub fn pause(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.stop();
            tracing::info!(tick = self.current_tick, "simulation paused");
        }
    }

    pub fn resume(&mut self) {
        if !self.scheduler.is_running() {
            self.scheduler.start();
            tracing::info!(tick = self.current_tick, "simulation resumed");
        }
    }

    /// Defaults, empty wire, fresh topology. The running flag is left alone.
    pub fn reset_core(&mut self) {
        self.parameters = SimulationParameters::default();
        self.regenerate_topology();
        self.recompute_metrics();
        tracing::info!("simulation reset to default parameters");
    }

    pub fn save_configuration(&mut self) -> Result<SavedConfiguration, PersistenceError> {
        self.save_configuration_at(Utc::now())
    }

    pub fn save_configuration_at(&mut self, now: DateTime<Utc>) -> Result<SavedConfiguration, PersistenceError> {
        persistence::save_configuration(self.store.as_mut(), &self.parameters, now)
    }

    fn regenerate_topology(&mut self) {
        let leaf_count = leaf_count_for_ratio(self.parameters.splitter_ratio);
        self.topology = Topology::generate(leaf_count, &mut self.rng);
        self.packets.clear();
    }

    fn recompute_metrics(&mut self) {
        self.metrics = power::calculate_power_metrics(&self.parameters, self.topology.connections());
    }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

impl PonSimulation {
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            tick: self.current_tick,
            nodes: self.topology.nodes().to_vec(),
            connections: self.topology.connections().to_vec(),
            packets: self.packets.clone(),
            parameters: self.parameters.clone(),
            metrics: self.metrics,
            report: self.metrics_report(),
            running: self.scheduler.is_running(),
            stats: self.stats,
        }
    }

    pub fn topology(&self) -> &Topology { &self.topology }
    pub fn parameters(&self) -> &SimulationParameters { &self.parameters }
    pub fn metrics(&self) -> PowerMetrics { self.metrics }
    pub fn packets(&self) -> &[DataPacket] { &self.packets }
    pub fn stats(&self) -> TrafficStats { self.stats }
    pub fn current_tick(&self) -> u64 { self.current_tick }
    pub fn store(&self) -> &dyn SettingsStore { self.store.as_ref() }

    pub fn metrics_report(&self) -> MetricsReport {
        MetricsReport::from_metrics(&self.metrics, &self.parameters)
    }

    /// Far-end power of one link at the current transmission power.
    pub fn connection_budget(&self, connection_id: u32) -> Option<f64> {
        self.topology
            .connection(connection_id)
            .map(|c| power::connection_budget(c, self.parameters.transmission_power))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{HEAD_END_ID, SPLITTER_ID};

    fn sim() -> PonSimulation {
        PonSimulation::with_seed(42)
    }

    fn place(sim: &mut PonSimulation, direction: Direction, src: u32, dst: u32, size: f64, progress: f64) {
        let id = sim.spawn_packet(direction, src, dst, size);
        let p = sim.packets.iter_mut().find(|p| p.id == id).unwrap();
        p.progress = progress;
    }

    fn leaf_ids(sim: &PonSimulation) -> Vec<u32> {
        sim.topology.leaves().map(|n| n.id).collect()
    }

    #[test]
    fn test_initial_state() {
        let s = sim();
        assert_eq!(s.topology.nodes().len(), 10);
        assert_eq!(s.topology.connections().len(), 9);
        assert!(s.packets.is_empty());
        assert!(s.scheduler.is_running());
        assert!(s.metrics.margin < 0.0, "default network is deeply degraded");
    }

    #[test]
    fn test_no_spawn_before_interval() {
        let mut s = sim();
        for ts in [0.0, 50.0, 150.0, 199.9] {
            s.tick_core(ts);
        }
        assert!(s.packets.is_empty());
        assert_eq!(s.last_spawn_ms, 0.0);
    }

    #[test]
    fn test_last_spawn_moves_only_on_gated_ticks() {
        let mut s = sim();
        s.tick_core(200.0);
        assert_eq!(s.last_spawn_ms, 200.0);
        s.tick_core(350.0);
        assert_eq!(s.last_spawn_ms, 200.0);
        s.tick_core(399.0);
        assert_eq!(s.last_spawn_ms, 200.0);
        s.tick_core(400.0);
        assert_eq!(s.last_spawn_ms, 400.0);
    }

    #[test]
    fn test_spawned_packets_shape() {
        let mut s = sim();
        for i in 1..=200 {
            s.tick_core(i as f64 * 200.0);
        }
        assert!(s.stats.spawned_downstream > 0);
        assert!(s.stats.spawned_upstream > 0);
        for p in &s.packets {
            assert!(p.progress >= 0.0 && p.progress < 1.0);
            match (p.direction, p.source_id) {
                (Direction::Downstream, HEAD_END_ID) => {
                    assert_eq!(p.target_id, SPLITTER_ID);
                    assert!(p.size >= 500.0 && p.size < 1500.0 && p.size.fract() == 0.0);
                }
                (Direction::Upstream, SPLITTER_ID) => assert_eq!(p.target_id, HEAD_END_ID),
                (Direction::Upstream, leaf) => {
                    assert_eq!(s.topology.node(leaf).unwrap().role, NodeRole::Leaf);
                    assert_eq!(p.target_id, SPLITTER_ID);
                    assert!(p.size >= 100.0 && p.size < 600.0 && p.size.fract() == 0.0);
                }
                (Direction::Downstream, src) => assert_eq!(src, SPLITTER_ID),
            }
        }
    }

    #[test]
    fn test_zero_rate_never_spawns() {
        let mut s = sim();
        s.update_parameter(ParameterKey::PacketGenerationRate, 0.0).unwrap();
        for i in 1..=100 {
            s.tick_core(i as f64 * 1000.0);
        }
        assert!(s.packets.is_empty());
    }

    #[test]
    fn test_in_transit_advances_by_step() {
        let mut s = sim();
        place(&mut s, Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 1000.0, 0.5);
        s.tick_core(0.0);
        assert_eq!(s.packets.len(), 1);
        assert!((s.packets[0].progress - 0.52).abs() < 1e-12);
    }

    #[test]
    fn test_downstream_fans_out_at_splitter() {
        let mut s = sim();
        place(&mut s, Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 1000.0, 0.99);
        s.tick_core(0.0);

        let leaves = leaf_ids(&s);
        assert_eq!(s.packets.len(), leaves.len());
        for (p, leaf) in s.packets.iter().zip(&leaves) {
            assert_eq!(p.direction, Direction::Downstream);
            assert_eq!(p.source_id, SPLITTER_ID);
            assert_eq!(p.target_id, *leaf);
            assert_eq!(p.progress, 0.0);
            assert_eq!(p.size, 125.0);
        }
        assert_eq!(s.stats.fanned_out, 8);
    }

    #[test]
    fn test_upstream_forwards_to_head_end() {
        let mut s = sim();
        let leaf = leaf_ids(&s)[3];
        place(&mut s, Direction::Upstream, leaf, SPLITTER_ID, 420.0, 0.99);
        s.tick_core(0.0);

        assert_eq!(s.packets.len(), 1);
        let p = &s.packets[0];
        assert_eq!((p.source_id, p.target_id), (SPLITTER_ID, HEAD_END_ID));
        assert_eq!(p.direction, Direction::Upstream);
        assert_eq!(p.size, 420.0);
        assert_eq!(p.progress, 0.0);
        assert_eq!(s.stats.forwarded, 1);
    }

    #[test]
    fn test_terminal_arrivals_are_delivered() {
        let mut s = sim();
        let leaf = leaf_ids(&s)[0];
        place(&mut s, Direction::Downstream, SPLITTER_ID, leaf, 125.0, 0.99);
        place(&mut s, Direction::Upstream, SPLITTER_ID, HEAD_END_ID, 300.0, 0.99);
        s.tick_core(0.0);

        assert!(s.packets.is_empty());
        assert_eq!(s.stats.delivered_to_leaves, 1);
        assert_eq!(s.stats.delivered_to_head_end, 1);
    }

    #[test]
    fn test_missing_target_dropped_silently() {
        let mut s = sim();
        place(&mut s, Direction::Downstream, SPLITTER_ID, 999, 100.0, 0.99);
        s.tick_core(0.0);
        assert!(s.packets.is_empty());
        assert_eq!(s.stats.dropped, 1);
    }

    #[test]
    fn test_fan_out_without_leaves_produces_nothing() {
        let mut s = sim();
        s.topology = Topology::generate(0, &mut s.rng);
        place(&mut s, Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 1000.0, 0.99);
        s.tick_core(0.0);
        assert!(s.packets.is_empty());
        assert_eq!(s.stats.fanned_out, 0);
    }

    #[test]
    fn test_transit_takes_fifty_ticks() {
        let mut s = sim();
        let leaf = leaf_ids(&s)[0];
        s.spawn_packet(Direction::Downstream, SPLITTER_ID, leaf, 100.0);
        let mut ticks = 0;
        while !s.packets.is_empty() {
            s.tick_core(0.0);
            ticks += 1;
            assert!(ticks <= 51);
        }
        assert_eq!(ticks, 50, "transit took {} ticks", ticks);
    }

    #[test]
    fn test_spawn_draws_independent_with_fixed_odds() {
        let mut s = PonSimulation::with_seed(123);
        let ticks = 20_000u32;
        let (mut down, mut up, mut both) = (0u32, 0u32, 0u32);

        // Default interval is 200 ms, so every tick here passes the gate
        for i in 1..=ticks {
            let before = s.stats;
            s.tick_core(i as f64 * 200.0);
            let d = s.stats.spawned_downstream - before.spawned_downstream;
            let u = s.stats.spawned_upstream - before.spawned_upstream;
            assert!(d <= 1 && u <= 1);
            down += d as u32;
            up += u as u32;
            if d == 1 && u == 1 {
                both += 1;
            }
        }

        let down_rate = down as f64 / ticks as f64;
        let up_rate = up as f64 / ticks as f64;
        assert!((down_rate - DOWNSTREAM_SPAWN_PROBABILITY).abs() < 0.02, "downstream rate {}", down_rate);
        assert!((up_rate - UPSTREAM_SPAWN_PROBABILITY).abs() < 0.02, "upstream rate {}", up_rate);
        assert!((down_rate - 0.70).abs() < 0.02 && (up_rate - 0.30).abs() < 0.02);
        // Independent draws: roughly 0.7 * 0.3 of ticks spawn both ways
        let both_rate = both as f64 / ticks as f64;
        assert!(both > 0);
        assert!((both_rate - 0.21).abs() < 0.02, "both-direction rate {}", both_rate);
    }

    #[test]
    fn test_pause_freezes_state() {
        let mut s = sim();
        s.spawn_packet(Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 800.0);
        s.pause();
        let before = s.snapshot();
        assert!(s.frame_core(1000.0).is_none());
        assert!(s.frame_core(2000.0).is_none());
        assert_eq!(s.snapshot(), before);

        s.resume();
        let after = s.frame_core(2000.0).unwrap();
        assert!(after.packets.iter().any(|p| p.progress > 0.0));
    }

    #[test]
    fn test_splitter_change_regenerates_and_clears() {
        let mut s = sim();
        s.spawn_packet(Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 800.0);
        s.update_parameter(ParameterKey::SplitterRatio, 16.0).unwrap();
        assert_eq!(s.topology.leaf_count(), 16);
        assert_eq!(s.topology.connections().len(), 17);
        assert!(s.packets.is_empty());
        let expected = power::calculate_power_metrics(&s.parameters, s.topology.connections());
        assert_eq!(s.metrics, expected);
    }

    #[test]
    fn test_oversized_ratio_caps_leaves_not_loss() {
        let mut s = sim();
        s.update_parameter(ParameterKey::SplitterRatio, 2048.0).unwrap();
        assert_eq!(s.topology.leaf_count(), crate::topology::MAX_LEAVES as usize);

        let breakdown = power::loss_breakdown(&s.parameters, s.topology.connections());
        let expected_splitter = 10.0 * 2048f64.log10() + power::SPLITTER_INSERTION_LOSS_DB;
        assert!((breakdown.splitter - expected_splitter).abs() < 1e-9);
        assert!((s.metrics.loss - breakdown.total()).abs() < 1e-9);
    }

    #[test]
    fn test_other_parameter_keeps_packets() {
        let mut s = sim();
        let topo = s.topology.clone();
        s.spawn_packet(Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 800.0);
        s.update_parameter(ParameterKey::TransmissionPower, 7.0).unwrap();
        assert_eq!(s.packets.len(), 1);
        assert_eq!(s.topology, topo);
        assert_eq!(s.metrics.input_power, 7.0);
    }

    #[test]
    fn test_rejected_update_changes_nothing() {
        let mut s = sim();
        let before = s.snapshot();
        assert!(s.update_parameter(ParameterKey::SplitterRatio, f64::NAN).is_err());
        assert!(matches!(
            s.set_parameter_by_name("bogus", 1.0),
            Err(ParameterError::UnknownKey(_))
        ));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut s = sim();
        s.update_parameter(ParameterKey::SplitterRatio, 4.0).unwrap();
        s.update_parameter(ParameterKey::FiberDistance, 2.0).unwrap();
        s.spawn_packet(Direction::Downstream, HEAD_END_ID, SPLITTER_ID, 800.0);
        s.pause();
        s.reset_core();
        assert_eq!(s.parameters, SimulationParameters::default());
        assert_eq!(s.topology.leaf_count(), 8);
        assert!(s.packets.is_empty());
        assert!(!s.scheduler.is_running());
    }

    #[test]
    fn test_connection_budget_lookup() {
        let s = sim();
        assert!((s.connection_budget(0).unwrap() - 0.65).abs() < 1e-9);
        assert!(s.connection_budget(500).is_none());
    }

    #[test]
    fn test_packet_ids_unique_across_fan_out() {
        let mut s = sim();
        for i in 1..=300 {
            s.tick_core(i as f64 * 200.0);
        }
        let mut ids: Vec<u64> = s.packets.iter().map(|p| p.id).collect();
        let n = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n);
    }
}
