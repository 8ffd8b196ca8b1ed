// Monte Carlo Infrastructure: N seeded runs per preset with statistical aggregation
// Run i uses seed base + i, so drop lengths and traffic are reproducible

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use pon_engine::*;

use crate::report::*;
use crate::scenarios::Scenario;
use crate::time_series::TimeSeriesRecorder;

use std::time::Instant;

/// Run a single scenario iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    frames: u32,
    seed: u64,
    time_series_dir: Option<&std::path::Path>,
) -> BenchResult {
    let start = Instant::now();
    let mut sim = PonSimulation::with_parameters(
        (scenario.parameters)(),
        ChaCha8Rng::seed_from_u64(seed),
    );
    let mut pump = FramePump::default();
    let mut time_series = time_series_dir.map(|_| TimeSeriesRecorder::new());

    let mut frames_ticked: u32 = 0;
    let mut accounting_violations: u32 = 0;
    let mut peak_live: usize = 0;
    let mut live_sum: f64 = 0.0;

    for frame in 0..frames {
        if let Some(event) = &scenario.mid_event {
            event(&mut sim, frame);
        }

        let was_running = sim.is_running();
        let ts = pump.next_timestamp();
        match sim.frame_core(ts) {
            Some(snap) => {
                frames_ticked += 1;
                if !was_running {
                    accounting_violations += 1;
                }
                peak_live = peak_live.max(snap.packets.len());
                live_sum += snap.packets.len() as f64;
                if let Some(ref mut recorder) = time_series {
                    recorder.record(frame, ts, &snap);
                }
            }
            None => {
                if was_running {
                    accounting_violations += 1;
                }
            }
        }
    }

    if let (Some(recorder), Some(dir)) = (&time_series, time_series_dir) {
        let path = dir.join(format!("seed-{}.jsonl", seed));
        if let Err(e) = recorder.write_jsonl(&path) {
            tracing::warn!(error = %e, path = %path.display(), "failed to write time series");
        }
    }

    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);

    let stats = sim.stats();
    let metrics = sim.metrics();
    let report = sim.metrics_report();
    let spawned = stats.spawned_downstream + stats.spawned_upstream;
    let final_live = sim.packets().len();

    // ─── Pass/Fail ──────────────────────────────────────────────────────

    let c = &scenario.criteria;
    let mut failures = Vec::new();
    if let Some(min) = c.min_margin_db {
        if metrics.margin < min {
            failures.push(format!("margin {:.2} dB below {:.2}", metrics.margin, min));
        }
    }
    if let Some(max) = c.max_margin_db {
        if metrics.margin > max {
            failures.push(format!("margin {:.2} dB above {:.2}", metrics.margin, max));
        }
    }
    if let Some(tier) = c.tier {
        if report.tier != tier {
            failures.push(format!("tier {:?}, expected {:?}", report.tier, tier));
        }
    }
    if let Some(min) = c.min_spawned {
        if spawned < min {
            failures.push(format!("spawned {} < {}", spawned, min));
        }
    }
    if let Some(max) = c.max_spawned {
        if spawned > max {
            failures.push(format!("spawned {} > {}", spawned, max));
        }
    }
    if let Some(max) = c.max_dropped {
        if stats.dropped > max {
            failures.push(format!("dropped {} > {}", stats.dropped, max));
        }
    }
    if let Some(max) = c.max_live_packets {
        if peak_live > max {
            failures.push(format!("peak live packets {} > {}", peak_live, max));
        }
    }
    if c.require_frame_accounting && accounting_violations > 0 {
        failures.push(format!("{} frames ticked against the running flag", accounting_violations));
    }

    BenchResult {
        scenario: scenario.label.to_string(),
        name: scenario.name.to_string(),
        category: scenario.category.to_string(),
        seed,
        pass: failures.is_empty(),
        failures,
        frames_offered: frames,
        frames_ticked,
        frame_accounting: accounting_violations == 0,
        leaf_count: sim.topology().leaf_count(),
        margin_db: metrics.margin,
        loss_db: metrics.loss,
        signal_quality: report.signal_quality,
        tier: report.tier,
        downstream_throughput: report.downstream_throughput,
        upstream_throughput: report.upstream_throughput,
        spawned,
        fanned_out: stats.fanned_out,
        forwarded: stats.forwarded,
        delivered: stats.delivered_to_leaves + stats.delivered_to_head_end,
        dropped: stats.dropped,
        final_live_packets: final_live,
        peak_live_packets: peak_live,
        mean_live_packets: if frames_ticked > 0 { live_sum / frames_ticked as f64 } else { 0.0 },
        elapsed_ms: elapsed.as_millis(),
        frames_per_sec: frames_ticked as f64 / elapsed_secs,
    }
}

/// Run Monte Carlo: N runs of a scenario, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    n_runs: usize,
    frames: Option<u32>,
    base_seed: u64,
    time_series_base: Option<&std::path::Path>,
) -> MonteCarloReport {
    let frames = frames.unwrap_or(scenario.frames);
    let ts_dir = time_series_base.map(|base| base.join(scenario.name.to_lowercase()));

    let results: Vec<BenchResult> = (0..n_runs)
        .map(|i| run_single(scenario, frames, base_seed + i as u64, ts_dir.as_deref()))
        .collect();

    aggregate(scenario, results)
}

fn sample(results: &[BenchResult], f: impl Fn(&BenchResult) -> f64) -> Stats {
    Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(scenario: &Scenario, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();

    MonteCarloReport {
        scenario_name: scenario.name.to_string(),
        label: scenario.label.to_string(),
        category: scenario.category.to_string(),
        n_runs: n,
        pass_rate: if n > 0 { passed as f64 / n as f64 } else { 0.0 },
        margin_db: sample(&results, |r| r.margin_db),
        signal_quality: sample(&results, |r| r.signal_quality),
        spawned: sample(&results, |r| r.spawned as f64),
        delivered: sample(&results, |r| r.delivered as f64),
        peak_live_packets: sample(&results, |r| r.peak_live_packets as f64),
        mean_live_packets: sample(&results, |r| r.mean_live_packets),
        elapsed_ms: sample(&results, |r| r.elapsed_ms as f64),
        frames_per_sec: sample(&results, |r| r.frames_per_sec),
        individual_runs: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::scenarios;

    fn find(name: &str) -> Scenario {
        scenarios().into_iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_same_seed_same_result() {
        let s = find("LAB_DEFAULTS");
        let a = run_single(&s, 300, 7, None);
        let b = run_single(&s, 300, 7, None);
        assert_eq!(a.spawned, b.spawned);
        assert_eq!(a.delivered, b.delivered);
        assert_eq!(a.margin_db, b.margin_db);
    }

    #[test]
    fn test_pause_window_skips_frames() {
        let s = find("PAUSE_RESUME");
        let r = run_single(&s, 1800, 0, None);
        assert_eq!(r.frames_ticked, 1200);
        assert!(r.frame_accounting);
    }

    #[test]
    fn test_idle_line_spawns_nothing() {
        let r = run_single(&find("IDLE_LINE"), 600, 3, None);
        assert_eq!(r.spawned, 0);
        assert!(r.pass, "{:?}", r.failures);
    }
}
