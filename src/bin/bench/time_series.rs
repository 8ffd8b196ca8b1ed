// Per-Frame JSONL Time Series Recorder
// One JSON line per ticked frame, for plotting packet load over a run

use pon_engine::SimSnapshot;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct FrameSample {
    pub frame: u32,
    pub timestamp_ms: f64,
    pub tick: u64,
    pub leaf_count: usize,
    pub live_packets: usize,
    pub live_downstream: usize,
    pub live_upstream: usize,
    pub spawned_downstream: u64,
    pub spawned_upstream: u64,
    pub delivered_to_leaves: u64,
    pub delivered_to_head_end: u64,
    pub margin_db: f64,
    pub signal_quality: f64,
}

impl FrameSample {
    pub fn from_snapshot(frame: u32, timestamp_ms: f64, snap: &SimSnapshot) -> Self {
        let live_downstream = snap
            .packets
            .iter()
            .filter(|p| p.direction == pon_engine::Direction::Downstream)
            .count();
        Self {
            frame,
            timestamp_ms,
            tick: snap.tick,
            leaf_count: snap.nodes.len().saturating_sub(2),
            live_packets: snap.packets.len(),
            live_downstream,
            live_upstream: snap.packets.len() - live_downstream,
            spawned_downstream: snap.stats.spawned_downstream,
            spawned_upstream: snap.stats.spawned_upstream,
            delivered_to_leaves: snap.stats.delivered_to_leaves,
            delivered_to_head_end: snap.stats.delivered_to_head_end,
            margin_db: snap.metrics.margin,
            signal_quality: snap.report.signal_quality,
        }
    }
}

/// Accumulates samples in memory and writes them out as JSONL
pub struct TimeSeriesRecorder {
    samples: Vec<FrameSample>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn record(&mut self, frame: u32, timestamp_ms: f64, snap: &SimSnapshot) {
        self.samples.push(FrameSample::from_snapshot(frame, timestamp_ms, snap));
    }

    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        for sample in &self.samples {
            let line = serde_json::to_string(sample)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        file.flush()
    }
}
