//! # Chain-Code Geometry
//!
//! Rebuilds a body chunk's path from one-byte segment deltas.
//!
//! ## Code Layout
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───┬───────────┬───┬───────────┐
//! │ F │ steps - 1 │ S │ magnitude │
//! └───┴───────────┴───┴───────────┘
//! F = fast segment, S = turn sign (1 = negative)
//! turn = ±(magnitude / 7) · max_turn_delta
//! ```
//!
//! Each segment turns by half its delta to get the vertex normal, applies the
//! full delta to the running heading, then advances `steps · speed` along it.

use bytemuck::{Pod, Zeroable};
use coil_shared::constants::TURN_LEVELS;
use coil_shared::{normalize_angle, SyncConfig, Vec2};

/// One decoded chain code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainCode {
    /// Segment was travelled at boost speed.
    pub fast: bool,
    /// Steps in the segment, 1..=8.
    pub steps: u8,
    /// Signed quantized turn, -7..=7.
    pub turn_level: i8,
}

impl ChainCode {
    /// Unpacks a wire byte.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        let magnitude = (byte & 0x07) as i8;
        Self {
            fast: byte & 0x80 != 0,
            steps: ((byte >> 4) & 0x07) + 1,
            turn_level: if byte & 0x08 != 0 { -magnitude } else { magnitude },
        }
    }

    /// Packs into a wire byte. Out-of-range fields are clamped.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let steps = self.steps.clamp(1, 8) - 1;
        let magnitude = self.turn_level.unsigned_abs().min(TURN_LEVELS);
        let sign = if self.turn_level < 0 { 0x08 } else { 0 };
        (u8::from(self.fast) << 7) | (steps << 4) | sign | magnitude
    }

    /// Turn in radians.
    #[inline]
    #[must_use]
    pub fn turn(self, max_turn_delta: f64) -> f64 {
        f64::from(self.turn_level) / f64::from(TURN_LEVELS) * max_turn_delta
    }

    /// Distance covered by this segment.
    #[inline]
    #[must_use]
    pub fn distance(self, config: &SyncConfig) -> f64 {
        f64::from(self.steps) * config.step_distance(self.fast)
    }
}

/// A path vertex in world precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    /// Position.
    pub position: Vec2,
    /// Unit normal (left of travel).
    pub normal: Vec2,
    /// Path distance from the chunk's first vertex.
    pub distance: f64,
}

/// GPU-ready vertex.
///
/// Size: 24 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PathVertex {
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Normal X.
    pub nx: f32,
    /// Normal Y.
    pub ny: f32,
    /// Distance from the chunk start.
    pub distance: f32,
    /// Distance to the chunk end.
    pub distance_to_end: f32,
}

/// Decoded geometry of one body chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkGeometry {
    /// Vertices, oldest first. Always one more than the code count.
    pub points: Vec<PathPoint>,
    /// Total path length.
    pub path_length: f64,
    /// Heading after the last segment.
    pub end_heading: f64,
}

impl ChunkGeometry {
    /// Rebuilds a path from its start pose and chain codes.
    #[must_use]
    pub fn build(start: Vec2, start_heading: f64, codes: &[u8], config: &SyncConfig) -> Self {
        let mut points = Vec::with_capacity(codes.len() + 1);
        let mut heading = normalize_angle(start_heading);
        let mut position = start;
        let mut length = 0.0;

        points.push(PathPoint {
            position,
            normal: Vec2::from_angle(heading).perp(),
            distance: 0.0,
        });

        for &byte in codes {
            let code = ChainCode::from_byte(byte);
            let delta = code.turn(config.max_turn_delta);
            let mid = heading + delta * 0.5;
            heading = normalize_angle(heading + delta);

            let step = code.distance(config);
            position += Vec2::from_angle(heading) * step;
            length += step;

            points.push(PathPoint {
                position,
                normal: Vec2::from_angle(mid).perp(),
                distance: length,
            });
        }

        Self {
            points,
            path_length: length,
            end_heading: heading,
        }
    }

    /// Distance from a vertex to the chunk end.
    #[inline]
    #[must_use]
    pub fn distance_to_end(&self, point: &PathPoint) -> f64 {
        self.path_length - point.distance
    }

    /// Last vertex position.
    #[must_use]
    pub fn end(&self) -> Option<Vec2> {
        self.points.last().map(|p| p.position)
    }

    /// Packs the path into a vertex buffer for upload.
    #[must_use]
    pub fn vertex_buffer(&self) -> Vec<PathVertex> {
        self.points
            .iter()
            .map(|p| PathVertex {
                x: p.position.x as f32,
                y: p.position.y as f32,
                nx: p.normal.x as f32,
                ny: p.normal.y as f32,
                distance: p.distance as f32,
                distance_to_end: self.distance_to_end(p) as f32,
            })
            .collect()
    }

    /// Raw bytes of [`Self::vertex_buffer`].
    #[must_use]
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertex_buffer()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(fast: bool, steps: u8, turn_level: i8) -> u8 {
        ChainCode {
            fast,
            steps,
            turn_level,
        }
        .to_byte()
    }

    #[test]
    fn test_code_bit_layout() {
        let c = ChainCode::from_byte(0b1011_1101);
        assert!(c.fast);
        assert_eq!(c.steps, 4);
        assert_eq!(c.turn_level, -5);
        assert_eq!(c.to_byte(), 0b1011_1101);

        let c = ChainCode::from_byte(0x00);
        assert_eq!((c.fast, c.steps, c.turn_level), (false, 1, 0));
    }

    #[test]
    fn test_full_turn_maps_to_max_delta() {
        let max = 0.4;
        assert!((ChainCode::from_byte(code(false, 1, 7)).turn(max) - max).abs() < 1e-12);
        assert!((ChainCode::from_byte(code(false, 1, -7)).turn(max) + max).abs() < 1e-12);
    }

    #[test]
    fn test_straight_chain_stays_on_axis() {
        let config = SyncConfig::default();
        let codes = vec![code(false, 1, 0); 30];
        let geometry = ChunkGeometry::build(Vec2::ZERO, 0.0, &codes, &config);

        assert_eq!(geometry.points.len(), 31);
        for pair in geometry.points.windows(2) {
            assert!(pair[1].position.x > pair[0].position.x);
        }
        for p in &geometry.points {
            assert!(p.position.y.abs() < 1e-8);
        }
    }

    #[test]
    fn test_length_lower_bound_and_scaling() {
        let mut config = SyncConfig::default();
        let codes: Vec<u8> = (0..42u8)
            .map(|i| code(i % 5 == 0, 1 + i % 3, (i % 15) as i8 - 7))
            .collect();
        let base = ChunkGeometry::build(Vec2::new(3.0, -2.0), 1.0, &codes, &config);
        assert!(base.path_length >= 42.0 * config.slow_speed);

        config.slow_speed *= 2.5;
        config.fast_speed *= 2.5;
        let scaled = ChunkGeometry::build(Vec2::new(3.0, -2.0), 1.0, &codes, &config);
        assert!((scaled.path_length - 2.5 * base.path_length).abs() < 1e-4);
    }

    #[test]
    fn test_distance_to_end_strictly_decreases() {
        let config = SyncConfig::default();
        let codes: Vec<u8> = (0..20u8).map(|i| code(i % 2 == 0, 1 + i % 8, 3)).collect();
        let geometry = ChunkGeometry::build(Vec2::ZERO, 2.5, &codes, &config);

        let remaining: Vec<f64> = geometry
            .points
            .iter()
            .map(|p| geometry.distance_to_end(p))
            .collect();
        for pair in remaining.windows(2) {
            assert!(pair[1] < pair[0]);
        }
        for p in &geometry.points {
            assert!(p.distance >= 0.0 && p.distance <= geometry.path_length);
        }
        assert!(geometry.end_heading > -std::f64::consts::PI);
        assert!(geometry.end_heading <= std::f64::consts::PI);
    }

    #[test]
    fn test_vertex_buffer_is_tightly_packed() {
        let config = SyncConfig::default();
        let geometry = ChunkGeometry::build(Vec2::ZERO, 0.0, &[0x00, 0x10], &config);
        let bytes = geometry.vertex_bytes();
        assert_eq!(bytes.len(), 3 * std::mem::size_of::<PathVertex>());
        assert_eq!(std::mem::size_of::<PathVertex>(), 24);
    }
}
