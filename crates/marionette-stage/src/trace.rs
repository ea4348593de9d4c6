//! Per-tick diagnostics and the substep schedule trace.
//!
//! [`TickDiagnostics`] describes the last tick. [`ScheduleTrace`] keeps one
//! [`FrameSchedule`] per simulated frame and can be reduced to a BLAKE3
//! fingerprint, so two runs can be compared for an identical substep history
//! without diffing every entry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Diagnostics from the last tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickDiagnostics {
    /// Substeps run in the simulation phase.
    pub substeps: u32,
    /// Size of each substep in seconds.
    pub substep_dt: f64,
    /// Measured duration of the simulation phase.
    pub step_time: Duration,
    pub divisor_before: f64,
    pub divisor_after: f64,
    /// Collisions that started during the tick.
    pub collisions: usize,
    /// Scripts that failed and were cancelled during the tick.
    pub script_failures: usize,
    pub render_failed: bool,
    /// Whether a pending reload was carried out at the start of the tick.
    pub reloaded: bool,
}

/// Schedule of one simulated frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSchedule {
    pub divisor_before: f64,
    pub substeps: u32,
    pub substep_dt: f64,
    pub divisor_after: f64,
}

/// Ordered record of every simulated frame's schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTrace {
    frames: Vec<FrameSchedule>,
}

impl ScheduleTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame: FrameSchedule) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[FrameSchedule] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Total substeps over all recorded frames.
    pub fn total_substeps(&self) -> u64 {
        self.frames.iter().map(|f| f.substeps as u64).sum()
    }

    /// BLAKE3 hex digest (64 lowercase hex chars) of the serialized trace.
    pub fn fingerprint(&self) -> String {
        let json_bytes = serde_json::to_vec(&self.frames)
            .expect("schedule trace should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}
