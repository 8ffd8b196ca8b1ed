// Copyright 2026 Hypermesh Foundation. All rights reserved.
// PON Simulator Engine - Frame Scheduling
//
// The running flag is modelled as a cancellation token. A host frame callback
// (requestAnimationFrame in the browser, `FramePump` natively) asks the
// scheduler before every tick; once the token is cancelled, callbacks that
// were already queued become no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::simulation::PonSimulation;

/// Nominal 60 Hz animation frame.
pub const DEFAULT_FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

// ---------------------------------------------------------------------------
// CancellationToken
// ---------------------------------------------------------------------------

/// Shared cancel flag. Clones observe the same state and may be cancelled
/// from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// FrameScheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FrameScheduler {
    token: Option<CancellationToken>,
    dispatched: u64,
}

impl FrameScheduler {
    /// A scheduler that is already running.
    pub fn running() -> Self {
        let mut scheduler = Self::default();
        scheduler.start();
        scheduler
    }

    /// Issue a live token, or return the current one if already running.
    pub fn start(&mut self) -> CancellationToken {
        match &self.token {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                self.token = Some(token.clone());
                token
            }
        }
    }

    /// Withdraw the live token. The cancel lands before the token is
    /// dropped, so a holder of a clone sees the pause immediately.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().map_or(false, |t| !t.is_cancelled())
    }

    /// Token for the current run, if any. Hosts hand this to their frame
    /// callback to check before re-arming.
    pub fn token(&self) -> Option<CancellationToken> {
        self.token.clone().filter(|t| !t.is_cancelled())
    }

    /// Checked before every tick. Returns `false` once the token has been
    /// cancelled, including by a clone held elsewhere.
    pub fn should_dispatch(&mut self) -> bool {
        if self.is_running() {
            self.dispatched += 1;
            true
        } else {
            false
        }
    }

    pub fn dispatched_frames(&self) -> u64 {
        self.dispatched
    }
}

// ---------------------------------------------------------------------------
// FramePump
// ---------------------------------------------------------------------------

/// Native stand-in for the browser's animation-frame loop: produces
/// monotonic timestamps at a fixed interval and feeds them to a simulation.
#[derive(Debug, Clone)]
pub struct FramePump {
    interval_ms: f64,
    now_ms: f64,
}

impl Default for FramePump {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL_MS)
    }
}

impl FramePump {
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, now_ms: 0.0 }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Advance the clock by one frame and return the new timestamp.
    pub fn next_timestamp(&mut self) -> f64 {
        self.now_ms += self.interval_ms;
        self.now_ms
    }

    /// Offer `frames` frames to `sim`. The clock always advances; the return
    /// value counts only frames the simulation actually ticked.
    pub fn pump(&mut self, sim: &mut PonSimulation, frames: u32) -> u32 {
        let mut ticked = 0;
        for _ in 0..frames {
            let ts = self.next_timestamp();
            if sim.frame_core(ts).is_some() {
                ticked += 1;
            }
        }
        ticked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
