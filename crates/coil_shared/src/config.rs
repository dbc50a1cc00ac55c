//! # Sync Configuration
//!
//! Every tunable of the sync core lives in [`SyncConfig`]. Values are loaded
//! once at startup from a TOML file; any key that is missing falls back to the
//! default shown here.
//!
//! ```toml
//! tick_duration_secs = 0.125
//! slow_speed = 0.24
//! fast_speed = 0.6
//! max_chunk_bytes = 149
//! integrity_policy = "skip"
//! ```

use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CHUNK_HEADER_SIZE, DEFAULT_MAX_CHUNK_BYTES};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse or had wrong types.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// What to do when a chunk names a snake the registry has never seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityPolicy {
    /// Fail the update cycle with an error.
    Strict,
    /// Drop the offending record and keep going.
    Skip,
}

impl IntegrityPolicy {
    /// `Strict` in debug builds, `Skip` in release builds.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Skip
        }
    }
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self::for_build()
    }
}

/// Tunables for decoding, buffering, eviction and prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds of server time represented by one tick.
    pub tick_duration_secs: f64,
    /// Distance travelled per step at normal speed.
    pub slow_speed: f64,
    /// Distance travelled per step while boosting.
    pub fast_speed: f64,
    /// Largest turn one chain code can encode (radians).
    pub max_turn_delta: f64,
    /// Byte budget (header + codes) of a full body chunk.
    pub max_chunk_bytes: usize,
    /// Width of a snake of length zero.
    pub min_width: f64,
    /// Asymptotic width of a very long snake.
    pub max_width: f64,
    /// Length at which ~95% of the width range is reached.
    pub width_reference_length: f64,
    /// Edge length of one food grid cell.
    pub food_cell_size: f64,
    /// Radius per food size class.
    pub food_radii: [f64; 4],
    /// Buffered backlog (seconds) above which congestion is reported.
    pub congestion_threshold_secs: f64,
    /// Weight of the running prediction when blending positions.
    pub position_blend: f64,
    /// Weight of the running prediction when blending headings.
    pub heading_blend: f64,
    /// Weight of the running prediction when blending chunk offsets.
    pub offset_blend: f64,
    /// Fastest the displayed heading may rotate (radians per second).
    pub max_turn_rate: f64,
    /// Silence after which a snake counts as paused.
    pub pause_threshold_secs: f64,
    /// Time constant of the fast-mode glow smoothing.
    pub fast_smoothing_secs: f64,
    /// Extra margin around the camera viewport before things are evicted.
    pub viewport_margin: f64,
    /// Chunks this many ids behind the head are never culled by visibility alone.
    pub gc_age_margin: u16,
    /// Minimum spacing between outbound input messages.
    pub input_interval_ms: u64,
    /// How long `init` waits for the join message.
    pub join_timeout_secs: f64,
    /// Handling of chunks that reference unknown snakes.
    pub integrity_policy: IntegrityPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_duration_secs: 0.125,
            slow_speed: 0.24,
            fast_speed: 0.6,
            max_turn_delta: PI / 8.0,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            min_width: 0.5,
            max_width: 3.0,
            width_reference_length: 400.0,
            food_cell_size: 64.0,
            food_radii: [0.2, 0.35, 0.5, 0.75],
            congestion_threshold_secs: 1.0,
            position_blend: 0.9,
            heading_blend: 0.9,
            offset_blend: 0.85,
            max_turn_rate: 4.0,
            pause_threshold_secs: 1.0,
            fast_smoothing_secs: 0.15,
            viewport_margin: 10.0,
            gc_age_margin: 2,
            input_interval_ms: 100,
            join_timeout_secs: 5.0,
            integrity_policy: IntegrityPolicy::for_build(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }
        fn weight(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be within [0, 1], got {value}"),
                })
            }
        }

        positive("tick_duration_secs", self.tick_duration_secs)?;
        positive("slow_speed", self.slow_speed)?;
        positive("fast_speed", self.fast_speed)?;
        positive("max_turn_delta", self.max_turn_delta)?;
        positive("width_reference_length", self.width_reference_length)?;
        positive("food_cell_size", self.food_cell_size)?;
        positive("max_turn_rate", self.max_turn_rate)?;
        positive("pause_threshold_secs", self.pause_threshold_secs)?;
        positive("fast_smoothing_secs", self.fast_smoothing_secs)?;
        positive("join_timeout_secs", self.join_timeout_secs)?;
        weight("position_blend", self.position_blend)?;
        weight("heading_blend", self.heading_blend)?;
        weight("offset_blend", self.offset_blend)?;

        if self.max_chunk_bytes <= CHUNK_HEADER_SIZE
            || self.max_chunk_bytes > CHUNK_HEADER_SIZE + usize::from(u8::MAX)
        {
            return Err(ConfigError::Invalid {
                field: "max_chunk_bytes",
                reason: format!(
                    "must be within ({CHUNK_HEADER_SIZE}, {}], got {}",
                    CHUNK_HEADER_SIZE + usize::from(u8::MAX),
                    self.max_chunk_bytes
                ),
            });
        }
        if self.min_width > self.max_width {
            return Err(ConfigError::Invalid {
                field: "min_width",
                reason: format!("{} exceeds max_width {}", self.min_width, self.max_width),
            });
        }
        Ok(())
    }

    /// Per-step distance for a segment with the given fast flag.
    #[inline]
    #[must_use]
    pub fn step_distance(&self, fast: bool) -> f64 {
        if fast {
            self.fast_speed
        } else {
            self.slow_speed
        }
    }

    /// Server tick rate in Hz.
    #[must_use]
    pub fn tick_rate(&self) -> f64 {
        1.0 / self.tick_duration_secs
    }

    /// Outbound input spacing as a `Duration`.
    #[must_use]
    pub const fn input_interval(&self) -> Duration {
        Duration::from_millis(self.input_interval_ms)
    }

    /// Join wait as a `Duration`.
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.join_timeout_secs)
    }
}
