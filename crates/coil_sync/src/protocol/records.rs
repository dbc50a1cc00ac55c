//! # Wire Records
//!
//! Decoders for the three record kinds carried by a world-update frame plus
//! the optional heat-map.
//!
//! Every `decode_*` function takes `(buffer, offset, config)` and returns the
//! record together with the offset of the next byte. None of them keep state,
//! so a bad record can never poison one that was decoded earlier.

use coil_shared::constants::{
    CHUNK_HEADER_SIZE, FOOD_HEADER_SIZE, FOOD_ITEM_SIZE, HEATMAP_HEADER_SIZE, SNAKE_RECORD_SIZE,
};
use coil_shared::{Aabb, SyncConfig, Vec2};

use super::chain::ChunkGeometry;
use super::reader::ByteReader;
use crate::error::{SyncError, SyncResult};

/// Snake id as sent on the wire.
pub type SnakeId = u16;

/// `(snake, local chunk id)` packed into one integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(u32);

impl ChunkKey {
    /// Packs a snake id and a local chunk id.
    #[inline]
    #[must_use]
    pub const fn new(snake: SnakeId, local: u16) -> Self {
        Self(((snake as u32) << 16) | local as u32)
    }

    /// Wraps an already packed value.
    #[inline]
    #[must_use]
    pub const fn from_packed(packed: u32) -> Self {
        Self(packed)
    }

    /// Owning snake.
    #[inline]
    #[must_use]
    pub const fn snake(self) -> SnakeId {
        (self.0 >> 16) as SnakeId
    }

    /// Chunk id local to the snake.
    #[inline]
    #[must_use]
    pub const fn local(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Packed representation.
    #[inline]
    #[must_use]
    pub const fn packed(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.snake(), self.local())
    }
}

/// Width of a snake of the given length.
///
/// Sigmoid growth rescaled to start exactly at `min_width`, centred at half the
/// reference length and steep enough to reach ~95% of the range at the
/// reference length.
#[must_use]
pub fn snake_width(length: f64, config: &SyncConfig) -> f64 {
    let reference = config.width_reference_length;
    let center = reference * 0.5;
    let steepness = 2.0 * 19f64.ln() / reference;
    let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());

    let floor = sigmoid(-steepness * center);
    let t = (sigmoid(steepness * (length.max(0.0) - center)) - floor) / (1.0 - floor);
    config.min_width + (config.max_width - config.min_width) * t
}

/// Snake-info record.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeDelta {
    /// Snake id.
    pub id: SnakeId,
    /// Local id of the newest body chunk.
    pub head_chunk: u16,
    /// Skin index.
    pub skin: u8,
    /// Boosting during the latest tick.
    pub fast: bool,
    /// Boost flags of the seven ticks before it; bit 0 is the most recent.
    pub speed_history: u8,
    /// Accumulated length.
    pub length: f64,
    /// Width derived from `length`.
    pub width: f64,
    /// Current head direction (radians).
    pub direction: f64,
    /// Direction the server is steering towards.
    pub target_direction: f64,
    /// Head position.
    pub head: Vec2,
    /// Display name, filled in by the update buffer.
    pub name: Option<String>,
}

impl SnakeDelta {
    /// Fast flag mask in the flags byte.
    pub const FLAG_FAST: u8 = 1 << 0;

    /// Key of the head chunk.
    #[inline]
    #[must_use]
    pub const fn head_key(&self) -> ChunkKey {
        ChunkKey::new(self.id, self.head_chunk)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, config: &SyncConfig) -> SyncResult<Self> {
        reader.require(SNAKE_RECORD_SIZE)?;
        let key = ChunkKey::from_packed(reader.read_u32()?);
        let skin = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let length = f64::from(reader.read_f32()?);
        let direction = f64::from(reader.read_f32()?);
        let target_direction = f64::from(reader.read_f32()?);
        let head = Vec2::new(f64::from(reader.read_f32()?), f64::from(reader.read_f32()?));

        Ok(Self {
            id: key.snake(),
            head_chunk: key.local(),
            skin,
            fast: flags & Self::FLAG_FAST != 0,
            speed_history: flags >> 1,
            length,
            width: snake_width(length, config),
            direction,
            target_direction,
            head,
            name: None,
        })
    }
}

/// Decodes one snake-info record.
pub fn decode_snake(
    buffer: &[u8],
    offset: usize,
    config: &SyncConfig,
) -> SyncResult<(SnakeDelta, usize)> {
    let mut reader = ByteReader::at(buffer, offset)?;
    let record = SnakeDelta::read(&mut reader, config)?;
    Ok((record, reader.position()))
}

/// Body-chunk record with its rebuilt geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkDelta {
    /// Chunk identity.
    pub key: ChunkKey,
    /// Heading at the first vertex.
    pub start_direction: f64,
    /// First vertex.
    pub start: Vec2,
    /// Path offset; always zero unless `full`.
    pub offset: f64,
    /// Chunk hit the byte budget.
    pub full: bool,
    /// Rebuilt path.
    pub geometry: ChunkGeometry,
}

impl ChunkDelta {
    pub(crate) fn read(reader: &mut ByteReader<'_>, config: &SyncConfig) -> SyncResult<Self> {
        reader.require(CHUNK_HEADER_SIZE)?;
        let snake = reader.read_u16()?;
        let chunk = reader.read_u16()?;
        let count = usize::from(reader.read_u8()?);
        let start_direction = f64::from(reader.read_f32()?);
        let start = Vec2::new(f64::from(reader.read_f32()?), f64::from(reader.read_f32()?));
        let offset = reader.read_f32()?;

        let size = CHUNK_HEADER_SIZE + count;
        if size > config.max_chunk_bytes {
            return Err(SyncError::ChunkOverBudget {
                snake,
                chunk,
                size,
                max: config.max_chunk_bytes,
            });
        }
        let full = size == config.max_chunk_bytes;
        if !full && offset != 0.0 {
            return Err(SyncError::NonZeroOffset {
                snake,
                chunk,
                offset,
            });
        }

        let codes = reader.read_bytes(count)?;
        let geometry = ChunkGeometry::build(start, start_direction, codes, config);

        Ok(Self {
            key: ChunkKey::new(snake, chunk),
            start_direction,
            start,
            offset: f64::from(offset),
            full,
            geometry,
        })
    }
}

/// Decodes one body-chunk record.
pub fn decode_chunk(
    buffer: &[u8],
    offset: usize,
    config: &SyncConfig,
) -> SyncResult<(ChunkDelta, usize)> {
    let mut reader = ByteReader::at(buffer, offset)?;
    let record = ChunkDelta::read(&mut reader, config)?;
    Ok((record, reader.position()))
}

/// One collectible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodItem {
    /// World position.
    pub position: Vec2,
    /// Discretized size, 0..=3.
    pub size_class: u8,
    /// Color/skin index, 0..=63.
    pub color: u8,
    /// Radius for the size class.
    pub radius: f64,
}

/// All collectibles of one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct FoodChunk {
    /// Grid column.
    pub column: u8,
    /// Grid row.
    pub row: u8,
    /// Items in the cell.
    pub items: Vec<FoodItem>,
    /// Box around every item disc.
    pub bounds: Aabb,
}

impl FoodChunk {
    /// Grid cell identity.
    #[inline]
    #[must_use]
    pub const fn cell(&self) -> (u8, u8) {
        (self.column, self.row)
    }

    /// World-space centre of a grid cell.
    #[must_use]
    pub fn cell_center(column: u8, row: u8, config: &SyncConfig) -> Vec2 {
        Vec2::new(
            (f64::from(column) + 0.5) * config.food_cell_size,
            (f64::from(row) + 0.5) * config.food_cell_size,
        )
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, config: &SyncConfig) -> SyncResult<Self> {
        reader.require(FOOD_HEADER_SIZE)?;
        let column = reader.read_u8()?;
        let row = reader.read_u8()?;
        let count = usize::from(reader.read_u16()?);
        reader.require(count * FOOD_ITEM_SIZE)?;

        let center = Self::cell_center(column, row, config);
        let half_cell = config.food_cell_size * 0.5;
        let mut bounds = Aabb::point(center);
        let mut items = Vec::with_capacity(count);

        for _ in 0..count {
            let local_x = f64::from(reader.read_i8()?);
            let local_y = f64::from(reader.read_i8()?);
            let packed = reader.read_u8()?;
            let size_class = packed >> 6;
            let radius = config.food_radii[usize::from(size_class)];
            let position = center + Vec2::new(local_x, local_y) * (half_cell / 128.0);

            if items.is_empty() {
                bounds = Aabb::point(position);
            }
            bounds.include_disc(position, radius);
            items.push(FoodItem {
                position,
                size_class,
                color: packed & 0x3F,
                radius,
            });
        }

        Ok(Self {
            column,
            row,
            items,
            bounds,
        })
    }
}

/// Decodes one food-chunk record.
pub fn decode_food(
    buffer: &[u8],
    offset: usize,
    config: &SyncConfig,
) -> SyncResult<(FoodChunk, usize)> {
    let mut reader = ByteReader::at(buffer, offset)?;
    let record = FoodChunk::read(&mut reader, config)?;
    Ok((record, reader.position()))
}

/// Coarse density map of the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeatMap {
    /// Cells per row.
    pub width: u8,
    /// Rows.
    pub height: u8,
    /// Row-major intensities.
    pub cells: Vec<u8>,
}

impl HeatMap {
    /// Intensity at a cell, if in range.
    #[must_use]
    pub fn get(&self, x: u8, y: u8) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> SyncResult<Self> {
        reader.require(HEATMAP_HEADER_SIZE)?;
        let width = reader.read_u8()?;
        let height = reader.read_u8()?;
        let cells = reader
            .read_bytes(usize::from(width) * usize::from(height))?
            .to_vec();
        Ok(Self {
            width,
            height,
            cells,
        })
    }
}
