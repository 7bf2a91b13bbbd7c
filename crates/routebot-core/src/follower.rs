//! Constant-speed marker animation along a planned path.
//!
//! The follower is passive: the host calls [`PathFollower::tick`] from its
//! own timer or frame loop and renders the returned position.

use crate::geometry::{segment_lengths, Cartesian3};
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_FOLLOWER_SPEED_MPS: f64 = 12.0;

/// Shortest animation, regardless of path length.
const MIN_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowerStatus {
    Idle,
    Running,
    Completed,
}

/// Animation state of one run.
#[derive(Debug, Clone)]
pub struct FollowerState {
    positions: Vec<Cartesian3>,
    segment_lengths: Vec<f64>,
    total_length: f64,
    duration: Duration,
    started_at: Instant,
}

impl FollowerState {
    /// `None` for fewer than two positions, a zero-length path, a
    /// non-positive speed or a duration too long to represent.
    pub fn new(positions: Vec<Cartesian3>, speed_mps: f64, started_at: Instant) -> Option<Self> {
        if positions.len() < 2 || !(speed_mps.is_finite() && speed_mps > 0.0) {
            return None;
        }
        let segment_lengths = segment_lengths(&positions);
        let total_length: f64 = segment_lengths.iter().sum();
        if !(total_length.is_finite() && total_length > 0.0) {
            return None;
        }
        let duration = Duration::try_from_secs_f64(total_length / speed_mps)
            .ok()?
            .max(MIN_DURATION);

        Some(Self {
            positions,
            segment_lengths,
            total_length,
            duration,
            started_at,
        })
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn positions(&self) -> &[Cartesian3] {
        &self.positions
    }

    /// Fraction of the run completed at `now`, clamped to `[0, 1]`.
    pub fn fraction_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Position after travelling `fraction` of the total arc length.
    pub fn position_at(&self, fraction: f64) -> Cartesian3 {
        let last = self.positions[self.positions.len() - 1];
        if fraction >= 1.0 {
            return last;
        }
        let target = self.total_length * fraction;
        if target <= 0.0 {
            return self.positions[0];
        }

        let mut accumulated = 0.0;
        for (idx, length) in self.segment_lengths.iter().enumerate() {
            if accumulated + length >= target {
                if *length <= 0.0 {
                    return self.positions[idx + 1];
                }
                let local = (target - accumulated) / length;
                return Cartesian3::lerp(&self.positions[idx], &self.positions[idx + 1], local);
            }
            accumulated += length;
        }
        // accumulated rounding left the target past the last segment
        last
    }
}

/// One animation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FollowerTick {
    pub run_id: u64,
    pub position: Cartesian3,
    pub fraction: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FollowerSnapshot {
    pub status: FollowerStatus,
    pub run_id: u64,
    pub total_length_m: Option<f64>,
    pub duration_s: Option<f64>,
}

/// Drives at most one animation run. Starting a new run replaces the
/// current one.
#[derive(Debug)]
pub struct PathFollower {
    state: Option<FollowerState>,
    status: FollowerStatus,
    run_id: u64,
}

impl Default for PathFollower {
    fn default() -> Self {
        Self::new()
    }
}

impl PathFollower {
    pub fn new() -> Self {
        Self {
            state: None,
            status: FollowerStatus::Idle,
            run_id: 0,
        }
    }

    /// Cancel any current run and start following `positions` at
    /// `speed_mps`. Returns `false` (and stays idle) when there is nothing
    /// to animate.
    pub fn start(&mut self, positions: Vec<Cartesian3>, speed_mps: f64, now: Instant) -> bool {
        self.stop();
        let Some(state) = FollowerState::new(positions, speed_mps, now) else {
            return false;
        };
        self.run_id += 1;
        tracing::debug!(
            run_id = self.run_id,
            length_m = state.total_length,
            duration_s = state.duration.as_secs_f64(),
            "Follower started"
        );
        self.state = Some(state);
        self.status = FollowerStatus::Running;
        true
    }

    /// Advance to `now`. Returns `None` when no run is live. The tick that
    /// reaches the end reports `completed` and releases the run.
    pub fn tick(&mut self, now: Instant) -> Option<FollowerTick> {
        let state = self.state.as_ref()?;
        let fraction = state.fraction_at(now);
        let position = state.position_at(fraction);
        let completed = fraction >= 1.0;
        let tick = FollowerTick {
            run_id: self.run_id,
            position,
            fraction,
            completed,
        };
        if completed {
            self.state = None;
            self.status = FollowerStatus::Completed;
            tracing::debug!(run_id = self.run_id, "Follower completed");
        }
        Some(tick)
    }

    /// Discard the current run, if any. Returns whether a run was cancelled.
    pub fn stop(&mut self) -> bool {
        let cancelled = self.state.take().is_some();
        if cancelled {
            tracing::debug!(run_id = self.run_id, "Follower cancelled");
        }
        self.status = FollowerStatus::Idle;
        cancelled
    }

    pub fn status(&self) -> FollowerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Identifier of the latest started run (0 before the first run).
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> Option<&FollowerState> {
        self.state.as_ref()
    }

    pub fn snapshot(&self) -> FollowerSnapshot {
        FollowerSnapshot {
            status: self.status,
            run_id: self.run_id,
            total_length_m: self.state.as_ref().map(|s| s.total_length),
            duration_s: self.state.as_ref().map(|s| s.duration.as_secs_f64()),
        }
    }
}
