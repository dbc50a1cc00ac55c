//! # COIL Shared
//!
//! Common types used by the sync core and by whoever consumes it.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - an async runtime
//! - any GPU or window-related crate
//!
//! Geometry leaves this crate as plain `Pod` data; uploading it is someone
//! else's job.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod math;

pub use config::{ConfigError, IntegrityPolicy, SyncConfig};
pub use constants::{
    CHUNK_HEADER_SIZE, DEFAULT_MAX_CHUNK_BYTES, FOOD_HEADER_SIZE, FOOD_ITEM_SIZE,
    FRAME_HEADER_SIZE, SNAKE_RECORD_SIZE,
};
pub use math::{normalize_angle, shortest_angle, Aabb, Vec2};
