// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Topology Generator

use std::f64::consts::PI;

use rand::Rng;
use serde::Serialize;

use crate::power::FIBER_ATTENUATION_DB_PER_KM;
use crate::types::{DataPacket, FiberConnection, NetworkNode, NodeRole, NodeStatus};

pub const HEAD_END_ID: u32 = 0;
pub const SPLITTER_ID: u32 = 1;
const FIRST_LEAF_ID: u32 = 2;

const HEAD_END_POS: (f64, f64) = (100.0, 250.0);
const SPLITTER_POS: (f64, f64) = (400.0, 250.0);
const LEAF_RADIUS: f64 = 200.0;

/// Fixed trunk length between head-end and splitter, km.
pub const TRUNK_LENGTH_KM: f64 = 5.0;

/// Upper bound on generated leaves for a splitter-ratio parameter.
pub const MAX_LEAVES: u32 = 1024;

/// Drop lengths are drawn from `[min, max)` km on every generation.
pub const DROP_LENGTH_RANGE_KM: (f64, f64) = (1.0, 3.0);

/// One generated network: a head-end, a splitter and its leaves, with one
/// trunk link and one drop link per leaf. Replaced wholesale on regeneration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topology {
    nodes: Vec<NetworkNode>,
    connections: Vec<FiberConnection>,
}

impl Topology {
    /// Build a topology with `leaf_count` leaves on a semicircle around the
    /// splitter. Drop lengths come from `rng`, so a seeded generator gives a
    /// reproducible layout.
    pub fn generate<R: Rng>(leaf_count: u32, rng: &mut R) -> Self {
        let mut nodes = Vec::with_capacity(leaf_count as usize + 2);
        let mut connections = Vec::with_capacity(leaf_count as usize + 1);

        nodes.push(NetworkNode {
            id: HEAD_END_ID,
            role: NodeRole::HeadEnd,
            name: "Central Office OLT".to_string(),
            x: HEAD_END_POS.0,
            y: HEAD_END_POS.1,
            status: NodeStatus::Active,
        });
        nodes.push(NetworkNode {
            id: SPLITTER_ID,
            role: NodeRole::Splitter,
            name: format!("1:{} Splitter", leaf_count),
            x: SPLITTER_POS.0,
            y: SPLITTER_POS.1,
            status: NodeStatus::Active,
        });
        connections.push(FiberConnection {
            id: 0,
            source_id: HEAD_END_ID,
            target_id: SPLITTER_ID,
            length: TRUNK_LENGTH_KM,
            attenuation: FIBER_ATTENUATION_DB_PER_KM,
        });

        // A single leaf has no angular spacing; it sits at angle 0.
        let angle_step = if leaf_count > 1 { PI / (leaf_count - 1) as f64 } else { 0.0 };

        for i in 0..leaf_count {
            let angle = i as f64 * angle_step;
            let id = FIRST_LEAF_ID + i;
            nodes.push(NetworkNode {
                id,
                role: NodeRole::Leaf,
                name: format!("Customer ONU {}", i + 1),
                x: SPLITTER_POS.0 + LEAF_RADIUS * angle.cos(),
                y: SPLITTER_POS.1 + LEAF_RADIUS * angle.sin(),
                status: NodeStatus::Active,
            });
            connections.push(FiberConnection {
                id: 1 + i,
                source_id: SPLITTER_ID,
                target_id: id,
                length: rng.gen_range(DROP_LENGTH_RANGE_KM.0..DROP_LENGTH_RANGE_KM.1),
                attenuation: FIBER_ATTENUATION_DB_PER_KM,
            });
        }

        tracing::debug!(leaf_count, "generated PON topology");
        Self { nodes, connections }
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[FiberConnection] {
        &self.connections
    }

    pub fn node(&self, id: u32) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn connection(&self, id: u32) -> Option<&FiberConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Link joining two nodes, in either direction.
    pub fn connection_between(&self, a: u32, b: u32) -> Option<&FiberConnection> {
        self.connections.iter().find(|c| {
            (c.source_id == a && c.target_id == b) || (c.source_id == b && c.target_id == a)
        })
    }

    pub fn head_end(&self) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.role == NodeRole::HeadEnd)
    }

    pub fn splitter(&self) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.role == NodeRole::Splitter)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &NetworkNode> + '_ {
        self.nodes.iter().filter(|n| n.role == NodeRole::Leaf)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Where `packet` sits on the canvas: linear interpolation from its
    /// source to its target by progress. `None` if either end is gone.
    pub fn packet_position(&self, packet: &DataPacket) -> Option<(f64, f64)> {
        let src = self.node(packet.source_id)?;
        let dst = self.node(packet.target_id)?;
        Some((
            src.x + (dst.x - src.x) * packet.progress,
            src.y + (dst.y - src.y) * packet.progress,
        ))
    }
}

/// Number of leaves to generate for a splitter-ratio parameter value.
///
/// Rounds to the nearest integer and keeps the result within
/// `1..=MAX_LEAVES`, so any parameter value yields a drawable network.
pub fn leaf_count_for_ratio(ratio: f64) -> u32 {
    if !ratio.is_finite() {
        return 1;
    }
    ratio.round().clamp(1.0, MAX_LEAVES as f64) as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_node_and_link_counts() {
        for n in 2..=32u32 {
            let topo = Topology::generate(n, &mut rng());
            assert_eq!(topo.nodes().len(), n as usize + 2);
            assert_eq!(topo.connections().len(), n as usize + 1);
            assert_eq!(topo.leaf_count(), n as usize);
            assert!(topo.head_end().is_some());
            assert!(topo.splitter().is_some());
        }
    }

    #[test]
    fn test_trunk_link_fixed() {
        let topo = Topology::generate(8, &mut rng());
        let trunk = topo.connection_between(HEAD_END_ID, SPLITTER_ID).unwrap();
        assert_eq!(trunk.length, 5.0);
        assert_eq!(trunk.attenuation, 0.35);
        assert_eq!(topo.splitter().unwrap().name, "1:8 Splitter");
    }

    #[test]
    fn test_drop_lengths_in_range() {
        let topo = Topology::generate(16, &mut rng());
        for c in topo.connections().iter().filter(|c| c.source_id == SPLITTER_ID) {
            assert!(c.length >= 1.0 && c.length < 3.0, "drop length {}", c.length);
            assert_eq!(c.attenuation, 0.35);
            assert_eq!(topo.node(c.target_id).unwrap().role, NodeRole::Leaf);
        }
    }

    #[test]
    fn test_two_leaves_on_semicircle_endpoints() {
        let topo = Topology::generate(2, &mut rng());
        let leaves: Vec<_> = topo.leaves().collect();
        assert!((leaves[0].x - 600.0).abs() < 1e-9);
        assert!((leaves[0].y - 250.0).abs() < 1e-9);
        assert!((leaves[1].x - 200.0).abs() < 1e-9);
        assert!((leaves[1].y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_leaf_at_angle_zero() {
        let topo = Topology::generate(1, &mut rng());
        let leaf = topo.leaves().next().unwrap();
        assert_eq!((leaf.x, leaf.y), (600.0, 250.0));
        assert_eq!(topo.connections().len(), 2);
    }

    #[test]
    fn test_zero_leaves_keeps_trunk() {
        let topo = Topology::generate(0, &mut rng());
        assert_eq!(topo.nodes().len(), 2);
        assert_eq!(topo.connections().len(), 1);
    }

    #[test]
    fn test_same_seed_same_topology() {
        let a = Topology::generate(8, &mut ChaCha8Rng::seed_from_u64(99));
        let b = Topology::generate(8, &mut ChaCha8Rng::seed_from_u64(99));
        let c = Topology::generate(8, &mut ChaCha8Rng::seed_from_u64(100));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_packet_position_interpolates() {
        use crate::types::Direction;
        let topo = Topology::generate(2, &mut rng());
        let mut packet = DataPacket {
            id: 1,
            direction: Direction::Downstream,
            source_id: HEAD_END_ID,
            target_id: SPLITTER_ID,
            progress: 0.5,
            size: 1000.0,
        };
        assert_eq!(topo.packet_position(&packet), Some((250.0, 250.0)));
        packet.target_id = 77;
        assert_eq!(topo.packet_position(&packet), None);
    }

    #[test]
    fn test_leaf_count_for_ratio() {
        assert_eq!(leaf_count_for_ratio(8.0), 8);
        assert_eq!(leaf_count_for_ratio(7.6), 8);
        assert_eq!(leaf_count_for_ratio(1.0), 1);
        assert_eq!(leaf_count_for_ratio(0.0), 1);
        assert_eq!(leaf_count_for_ratio(-3.0), 1);
        assert_eq!(leaf_count_for_ratio(f64::NAN), 1);
        assert_eq!(leaf_count_for_ratio(1e12), MAX_LEAVES);
    }
}
