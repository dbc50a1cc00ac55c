//! # Dual-Prediction Blending
//!
//! Every predicted quantity keeps two anchors:
//!
//! ```text
//!   previous_prediction ─── extrapolate ──► A ─┐
//!                                              ├─► w·A + (1 - w)·B
//!   last_known          ─── extrapolate ──► B ─┘
//! ```
//!
//! `A` keeps the picture smooth across corrections, `B` pulls it toward the
//! authoritative line. On every authoritative sample the current blend becomes
//! the new `previous_prediction`.

use coil_shared::{normalize_angle, shortest_angle, Vec2};
use serde::{Deserialize, Serialize};

/// A scalar extrapolated at a known rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictedScalar {
    /// Latest authoritative value.
    pub last_known: f64,
    /// When `last_known` was observed.
    pub last_known_time: f64,
    /// Blend value at the moment of the last observation.
    pub previous_prediction: f64,
    /// When `previous_prediction` was taken.
    pub previous_prediction_time: f64,
}

impl PredictedScalar {
    /// Starts with both anchors on `value`.
    #[must_use]
    pub const fn new(value: f64, time: f64) -> Self {
        Self {
            last_known: value,
            last_known_time: time,
            previous_prediction: value,
            previous_prediction_time: time,
        }
    }

    /// Blended value at `time`.
    #[must_use]
    pub fn value_at(&self, time: f64, rate: f64, weight: f64) -> f64 {
        let a = self.previous_prediction + rate * (time - self.previous_prediction_time);
        let b = self.last_known + rate * (time - self.last_known_time);
        weight * a + (1.0 - weight) * b
    }

    /// Records an authoritative sample.
    pub fn observe(&mut self, value: f64, time: f64, rate: f64, weight: f64) {
        self.previous_prediction = self.value_at(time, rate, weight);
        self.previous_prediction_time = time;
        self.last_known = value;
        self.last_known_time = time;
    }

    /// Drops the running prediction and jumps to `value`.
    pub fn snap(&mut self, value: f64, time: f64) {
        *self = Self::new(value, time);
    }
}

/// A heading that rotates toward a target at a bounded rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictedAngle {
    /// Latest authoritative heading.
    pub last_known: f64,
    /// When `last_known` was observed.
    pub last_known_time: f64,
    /// Blend value at the moment of the last observation.
    pub previous_prediction: f64,
    /// When `previous_prediction` was taken.
    pub previous_prediction_time: f64,
}

impl PredictedAngle {
    /// Starts with both anchors on `heading`.
    #[must_use]
    pub fn new(heading: f64, time: f64) -> Self {
        let heading = normalize_angle(heading);
        Self {
            last_known: heading,
            last_known_time: time,
            previous_prediction: heading,
            previous_prediction_time: time,
        }
    }

    /// Turns `from` toward `target` by at most `max_rate · dt`.
    #[must_use]
    pub fn extrapolate(from: f64, target: f64, max_rate: f64, dt: f64) -> f64 {
        let limit = max_rate * dt.max(0.0);
        let turn = shortest_angle(from, target).clamp(-limit, limit);
        normalize_angle(from + turn)
    }

    /// Blended heading at `time`.
    #[must_use]
    pub fn value_at(&self, time: f64, target: f64, max_rate: f64, weight: f64) -> f64 {
        let a = Self::extrapolate(
            self.previous_prediction,
            target,
            max_rate,
            time - self.previous_prediction_time,
        );
        let b = Self::extrapolate(self.last_known, target, max_rate, time - self.last_known_time);
        normalize_angle(a + (1.0 - weight) * shortest_angle(a, b))
    }

    /// Records an authoritative heading.
    pub fn observe(&mut self, heading: f64, time: f64, target: f64, max_rate: f64, weight: f64) {
        self.previous_prediction = self.value_at(time, target, max_rate, weight);
        self.previous_prediction_time = time;
        self.last_known = normalize_angle(heading);
        self.last_known_time = time;
    }

    /// Drops the running prediction and jumps to `heading`.
    pub fn snap(&mut self, heading: f64, time: f64) {
        *self = Self::new(heading, time);
    }
}

/// A position extrapolated at a shared velocity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictedVec2 {
    /// X component.
    pub x: PredictedScalar,
    /// Y component.
    pub y: PredictedScalar,
}

impl PredictedVec2 {
    /// Starts with both anchors on `value`.
    #[must_use]
    pub const fn new(value: Vec2, time: f64) -> Self {
        Self {
            x: PredictedScalar::new(value.x, time),
            y: PredictedScalar::new(value.y, time),
        }
    }

    /// Blended position at `time`.
    #[must_use]
    pub fn value_at(&self, time: f64, velocity: Vec2, weight: f64) -> Vec2 {
        Vec2::new(
            self.x.value_at(time, velocity.x, weight),
            self.y.value_at(time, velocity.y, weight),
        )
    }

    /// Records an authoritative position.
    pub fn observe(&mut self, value: Vec2, time: f64, velocity: Vec2, weight: f64) {
        self.x.observe(value.x, time, velocity.x, weight);
        self.y.observe(value.y, time, velocity.y, weight);
    }

    /// Jumps to `value`.
    pub fn snap(&mut self, value: Vec2, time: f64) {
        *self = Self::new(value, time);
    }

    /// Latest authoritative position.
    #[must_use]
    pub const fn last_known(&self) -> Vec2 {
        Vec2::new(self.x.last_known, self.y.last_known)
    }
}
