//! Per-snake motion prediction.

use coil_shared::{normalize_angle, SyncConfig, Vec2};
use serde::{Deserialize, Serialize};

use super::blend::{PredictedAngle, PredictedVec2};

/// Smoothed 0..1 boost glow.
///
/// Approaches its target exponentially, driven by wall-clock time so the
/// visual does not depend on how often ticks arrive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FastIntensity {
    value: f64,
    target: f64,
    last_time: f64,
}

impl FastIntensity {
    /// Starts settled at the given state.
    #[must_use]
    pub fn new(fast: bool, time: f64) -> Self {
        let v = if fast { 1.0 } else { 0.0 };
        Self {
            value: v,
            target: v,
            last_time: time,
        }
    }

    /// Changes the target without moving the value.
    pub fn set_target(&mut self, fast: bool) {
        self.target = if fast { 1.0 } else { 0.0 };
    }

    /// Moves toward the target by the time elapsed since the last call.
    pub fn advance(&mut self, time: f64, time_constant: f64) -> f64 {
        let dt = (time - self.last_time).max(0.0);
        if dt > 0.0 {
            let k = 1.0 - (-dt / time_constant).exp();
            self.value += (self.target - self.value) * k;
            self.last_time = time;
        }
        self.value
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

/// Rendered pose of a snake at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    /// Head position.
    pub position: Vec2,
    /// Head heading.
    pub heading: f64,
    /// Boost glow, 0..1.
    pub fast_intensity: f64,
    /// No sample for longer than the pause threshold.
    pub paused: bool,
}

/// Position, heading and boost prediction for one snake.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnakeMotion {
    position: PredictedVec2,
    heading: PredictedAngle,
    /// Rate-limited copy of the authoritative target heading.
    target_heading: f64,
    authoritative_target: f64,
    speed: f64,
    fast: FastIntensity,
    last_sample_time: f64,
    last_advance_time: f64,
    paused: bool,
}

impl SnakeMotion {
    /// Starts at an authoritative pose.
    #[must_use]
    pub fn new(
        head: Vec2,
        direction: f64,
        target: f64,
        fast: bool,
        now: f64,
        config: &SyncConfig,
    ) -> Self {
        Self {
            position: PredictedVec2::new(head, now),
            heading: PredictedAngle::new(direction, now),
            target_heading: normalize_angle(target),
            authoritative_target: normalize_angle(target),
            speed: config.step_distance(fast) / config.tick_duration_secs,
            fast: FastIntensity::new(fast, now),
            last_sample_time: now,
            last_advance_time: now,
            paused: false,
        }
    }

    /// Head speed in units per second.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Latest authoritative head position.
    #[must_use]
    pub const fn last_known_position(&self) -> Vec2 {
        self.position.last_known()
    }

    /// True if no sample arrived for longer than the pause threshold.
    #[must_use]
    pub fn is_paused_at(&self, now: f64, config: &SyncConfig) -> bool {
        now - self.last_sample_time > config.pause_threshold_secs
    }

    /// Reconciles with an authoritative sample.
    ///
    /// A paused snake snaps straight to the sample.
    pub fn sample(
        &mut self,
        head: Vec2,
        direction: f64,
        target: f64,
        fast: bool,
        now: f64,
        config: &SyncConfig,
    ) {
        if self.paused || self.is_paused_at(now, config) {
            self.position.snap(head, now);
            self.heading.snap(direction, now);
            self.target_heading = normalize_angle(target);
        } else {
            let heading = self.heading_at(now, config);
            self.position
                .observe(head, now, self.velocity(heading), config.position_blend);
            self.heading.observe(
                direction,
                now,
                self.target_heading,
                config.max_turn_rate,
                config.heading_blend,
            );
        }

        self.authoritative_target = normalize_angle(target);
        self.speed = config.step_distance(fast) / config.tick_duration_secs;
        self.fast.set_target(fast);
        self.last_sample_time = now;
        self.paused = false;
    }

    /// Steps wall-clock smoothing to `now` and returns the pose.
    pub fn advance(&mut self, now: f64, config: &SyncConfig) -> MotionState {
        let dt = (now - self.last_advance_time).max(0.0);
        self.target_heading = PredictedAngle::extrapolate(
            self.target_heading,
            self.authoritative_target,
            config.max_turn_rate,
            dt,
        );
        self.last_advance_time = self.last_advance_time.max(now);
        self.paused = self.is_paused_at(now, config);

        let fast_intensity = self.fast.advance(now, config.fast_smoothing_secs);
        self.state_at(now, fast_intensity, config)
    }

    /// Pose at `now` without touching any smoothing state.
    #[must_use]
    pub fn peek(&self, now: f64, config: &SyncConfig) -> MotionState {
        self.state_at(now, self.fast.value(), config)
    }

    fn state_at(&self, now: f64, fast_intensity: f64, config: &SyncConfig) -> MotionState {
        let paused = self.is_paused_at(now, config);
        // A silent snake is held where the pause began
        let t = if paused {
            self.last_sample_time + config.pause_threshold_secs
        } else {
            now
        };
        let heading = self.heading_at(t, config);
        MotionState {
            position: self
                .position
                .value_at(t, self.velocity(heading), config.position_blend),
            heading,
            fast_intensity,
            paused,
        }
    }

    fn heading_at(&self, t: f64, config: &SyncConfig) -> f64 {
        self.heading.value_at(
            t,
            self.target_heading,
            config.max_turn_rate,
            config.heading_blend,
        )
    }

    fn velocity(&self, heading: f64) -> Vec2 {
        Vec2::from_angle(heading) * self.speed
    }
}
