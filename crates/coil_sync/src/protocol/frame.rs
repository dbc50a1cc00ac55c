//! # World-Update Frames
//!
//! ```text
//! ┌────────┬────────┬────────┬────────┬─────────┐
//! │ ticks  │ snakes │ chunks │ foods  │ heatmap │   5-byte header
//! └────────┴────────┴────────┴────────┴─────────┘
//!   snake records   × snakes   (26 bytes each)
//!   chunk records   × chunks   (21 + n bytes each)
//!   food records    × foods    (4 + 3·m bytes each)
//!   heat-map                   (only if heatmap != 0)
//! ```

use coil_shared::constants::FRAME_HEADER_SIZE;
use coil_shared::SyncConfig;

use super::reader::ByteReader;
use super::records::{ChunkDelta, FoodChunk, HeatMap, SnakeDelta};
use crate::error::{SyncError, SyncResult};

/// Everything one binary frame carries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameUpdate {
    /// Server ticks covered by the frame. Zero means no server time passed.
    pub ticks: u8,
    /// Snake-info records.
    pub snakes: Vec<SnakeDelta>,
    /// Body-chunk records.
    pub chunks: Vec<ChunkDelta>,
    /// Food-chunk records.
    pub foods: Vec<FoodChunk>,
    /// Optional density map.
    pub heatmap: Option<HeatMap>,
}

impl FrameUpdate {
    /// True if the frame carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snakes.is_empty()
            && self.chunks.is_empty()
            && self.foods.is_empty()
            && self.heatmap.is_none()
    }
}

/// Decodes a frame starting at `offset` and returns the offset after it.
pub fn decode_frame_at(
    buffer: &[u8],
    offset: usize,
    config: &SyncConfig,
) -> SyncResult<(FrameUpdate, usize)> {
    let mut reader = ByteReader::at(buffer, offset)?;
    reader.require(FRAME_HEADER_SIZE)?;

    let ticks = reader.read_u8()?;
    let snake_count = usize::from(reader.read_u8()?);
    let chunk_count = usize::from(reader.read_u8()?);
    let food_count = usize::from(reader.read_u8()?);
    let has_heatmap = reader.read_u8()? != 0;

    let mut snakes = Vec::with_capacity(snake_count);
    for _ in 0..snake_count {
        snakes.push(SnakeDelta::read(&mut reader, config)?);
    }

    let mut chunks = Vec::with_capacity(chunk_count);
    for _ in 0..chunk_count {
        chunks.push(ChunkDelta::read(&mut reader, config)?);
    }

    let mut foods = Vec::with_capacity(food_count);
    for _ in 0..food_count {
        foods.push(FoodChunk::read(&mut reader, config)?);
    }

    let heatmap = if has_heatmap {
        Some(HeatMap::read(&mut reader)?)
    } else {
        None
    };

    Ok((
        FrameUpdate {
            ticks,
            snakes,
            chunks,
            foods,
            heatmap,
        },
        reader.position(),
    ))
}

/// Decodes a whole frame. Leftover bytes are an error.
pub fn decode_frame(buffer: &[u8], config: &SyncConfig) -> SyncResult<FrameUpdate> {
    let (frame, consumed) = decode_frame_at(buffer, 0, config)?;
    if consumed != buffer.len() {
        return Err(SyncError::TrailingBytes {
            consumed,
            extra: buffer.len() - consumed,
        });
    }
    Ok(frame)
}
