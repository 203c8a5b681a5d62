//! Link-health metrics derived from frame arrivals.
//!
//! A fixed 1-second window counter: every accepted frame increments
//! the window, and each stats tick snapshots the count as the
//! instantaneous FPS and resets it. Latency is read from the most
//! recent frame's metadata, not recomputed.

use serde::Serialize;

// ── StreamStats ──────────────────────────────────────────────────

/// Periodic link-health snapshot published as a `stats` event.
///
/// `dropped_frames` and `total_frames` are monotonically
/// non-decreasing; `fps` is a windowed instantaneous rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub fps: u32,
    /// Receive latency of the most recent frame, milliseconds.
    pub latency: i64,
    pub dropped_frames: u64,
    pub total_frames: u64,
}

// ── MetricsTracker ───────────────────────────────────────────────

/// Rolling FPS counter and latency sampler.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    window_count: u32,
    last_fps: u32,
    last_latency: i64,
    dropped_frames: u64,
    total_frames: u64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted frame and its client-derived latency.
    pub fn record_frame(&mut self, latency_ms: i64) {
        self.window_count += 1;
        self.total_frames += 1;
        self.last_latency = latency_ms;
    }

    /// Record a frame dropped before insertion (decompression failure
    /// or payload size mismatch).
    pub fn record_dropped(&mut self) {
        self.dropped_frames += 1;
    }

    /// Snapshot the current window as FPS, reset the counter, and
    /// return the stats to publish. Called once per stats tick.
    pub fn on_tick(&mut self) -> StreamStats {
        self.last_fps = self.window_count;
        self.window_count = 0;
        self.snapshot()
    }

    /// Current stats without closing the window.
    pub fn snapshot(&self) -> StreamStats {
        StreamStats {
            fps: self.last_fps,
            latency: self.last_latency,
            dropped_frames: self.dropped_frames,
            total_frames: self.total_frames,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
