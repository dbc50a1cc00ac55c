//! # Prediction Engine
//!
//! Continuous values between discrete authoritative samples.
//!
//! ## Clocks
//!
//! ```text
//! network clock:  ──●────────●──●─────────────●──   (samples, irregular)
//! render clock:   ─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─┼─   (value_at every frame)
//! ```
//!
//! Everything here is a plain value type driven by explicit timestamps in
//! seconds; nothing reads a clock on its own.

pub mod blend;
pub mod motion;
pub mod offset;

pub use blend::{PredictedAngle, PredictedScalar, PredictedVec2};
pub use motion::{FastIntensity, MotionState, SnakeMotion};
pub use offset::OffsetWalker;
