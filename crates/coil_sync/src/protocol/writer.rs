//! # Message Writer
//!
//! Big-endian encoding for outbound messages, plus a [`FrameBuilder`] that
//! produces world-update frames in the exact layout the decoder expects.
//! The builder exists for diagnostics, benchmarks and tests; the live client
//! only ever sends user input.

use coil_shared::constants::{OUTBOUND_INPUT_SIZE, OUTBOUND_INPUT_TAG};
use coil_shared::{Aabb, Vec2};

use super::chain::ChainCode;

/// Growable big-endian writer.
#[derive(Debug, Default)]
pub struct MessageWriter {
    buffer: Vec<u8>,
}

impl MessageWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Hands over the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a u16 in big-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a u32 in big-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an f32 in big-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

/// Camera rectangle in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Centre of the view.
    pub center: Vec2,
    /// Half width and half height.
    pub half_extent: Vec2,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    /// Visible area.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, self.half_extent)
    }

    /// Visible area grown by `margin` on every side.
    #[must_use]
    pub fn extended(&self, margin: f64) -> Aabb {
        self.bounds().expanded(margin)
    }
}

/// Steering sample sent to the server.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserInput {
    /// Desired heading (radians).
    pub direction: f64,
    /// Whether the player holds boost.
    pub wants_fast: bool,
    /// Current camera rectangle.
    pub viewport: Viewport,
}

/// Encodes a user input message.
///
/// `[tag][f32 dir][u8 fast][f32 x][f32 y][f32 half w][f32 half h]`
#[must_use]
pub fn encode_user_input(input: &UserInput) -> Vec<u8> {
    let mut writer = MessageWriter::with_capacity(OUTBOUND_INPUT_SIZE);
    writer.write_u8(OUTBOUND_INPUT_TAG);
    writer.write_f32(input.direction as f32);
    writer.write_u8(u8::from(input.wants_fast));
    writer.write_f32(input.viewport.center.x as f32);
    writer.write_f32(input.viewport.center.y as f32);
    writer.write_f32(input.viewport.half_extent.x as f32);
    writer.write_f32(input.viewport.half_extent.y as f32);
    writer.into_bytes()
}

/// Snake-info record as written on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeRecord {
    /// Snake id.
    pub id: u16,
    /// Head chunk id.
    pub head_chunk: u16,
    /// Skin index.
    pub skin: u8,
    /// Boosting now.
    pub fast: bool,
    /// Previous seven boost flags, bit 0 most recent.
    pub speed_history: u8,
    /// Length.
    pub length: f32,
    /// Current direction.
    pub direction: f32,
    /// Target direction.
    pub target_direction: f32,
    /// Head position.
    pub head: (f32, f32),
}

impl SnakeRecord {
    /// Appends the record.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_u32((u32::from(self.id) << 16) | u32::from(self.head_chunk));
        writer.write_u8(self.skin);
        writer.write_u8((self.speed_history << 1) | u8::from(self.fast));
        writer.write_f32(self.length);
        writer.write_f32(self.direction);
        writer.write_f32(self.target_direction);
        writer.write_f32(self.head.0);
        writer.write_f32(self.head.1);
    }
}

/// Body-chunk record as written on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    /// Owning snake.
    pub snake: u16,
    /// Local chunk id.
    pub chunk: u16,
    /// Heading at the first vertex.
    pub start_direction: f32,
    /// First vertex.
    pub start: (f32, f32),
    /// Path offset.
    pub offset: f32,
    /// Raw chain codes.
    pub codes: Vec<u8>,
}

impl ChunkRecord {
    /// Chunk at the origin heading along +x.
    #[must_use]
    pub fn new(snake: u16, chunk: u16, codes: Vec<u8>) -> Self {
        Self {
            snake,
            chunk,
            start_direction: 0.0,
            start: (0.0, 0.0),
            offset: 0.0,
            codes,
        }
    }

    /// Builds the codes from decoded values.
    #[must_use]
    pub fn from_codes(snake: u16, chunk: u16, codes: &[ChainCode]) -> Self {
        Self::new(snake, chunk, codes.iter().map(|c| c.to_byte()).collect())
    }

    /// Sets the start pose.
    #[must_use]
    pub fn with_start(mut self, x: f32, y: f32, direction: f32) -> Self {
        self.start = (x, y);
        self.start_direction = direction;
        self
    }

    /// Sets the path offset.
    #[must_use]
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Appends the record. Code count is truncated to 255.
    pub fn write(&self, writer: &mut MessageWriter) {
        let count = self.codes.len().min(usize::from(u8::MAX));
        writer.write_u16(self.snake);
        writer.write_u16(self.chunk);
        writer.write_u8(count as u8);
        writer.write_f32(self.start_direction);
        writer.write_f32(self.start.0);
        writer.write_f32(self.start.1);
        writer.write_f32(self.offset);
        writer.write_bytes(&self.codes[..count]);
    }
}

/// Food-chunk record as written on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct FoodRecord {
    /// Grid column.
    pub column: u8,
    /// Grid row.
    pub row: u8,
    /// `(local x, local y, size/color byte)` per item.
    pub items: Vec<(i8, i8, u8)>,
}

impl FoodRecord {
    /// Appends the record.
    pub fn write(&self, writer: &mut MessageWriter) {
        let count = self.items.len().min(usize::from(u16::MAX));
        writer.write_u8(self.column);
        writer.write_u8(self.row);
        writer.write_u16(count as u16);
        for &(x, y, packed) in &self.items[..count] {
            writer.write_i8(x);
            writer.write_i8(y);
            writer.write_u8(packed);
        }
    }
}

/// Assembles a world-update frame.
#[derive(Clone, Debug, Default)]
pub struct FrameBuilder {
    ticks: u8,
    snakes: Vec<SnakeRecord>,
    chunks: Vec<ChunkRecord>,
    foods: Vec<FoodRecord>,
    heatmap: Option<(u8, u8, Vec<u8>)>,
}

impl FrameBuilder {
    /// Starts a frame covering `ticks` server ticks.
    #[must_use]
    pub fn new(ticks: u8) -> Self {
        Self {
            ticks,
            ..Self::default()
        }
    }

    /// Adds a snake record.
    #[must_use]
    pub fn snake(mut self, record: SnakeRecord) -> Self {
        self.snakes.push(record);
        self
    }

    /// Adds a chunk record.
    #[must_use]
    pub fn chunk(mut self, record: ChunkRecord) -> Self {
        self.chunks.push(record);
        self
    }

    /// Adds a food record.
    #[must_use]
    pub fn food(mut self, record: FoodRecord) -> Self {
        self.foods.push(record);
        self
    }

    /// Attaches a heat-map.
    #[must_use]
    pub fn heatmap(mut self, width: u8, height: u8, cells: Vec<u8>) -> Self {
        self.heatmap = Some((width, height, cells));
        self
    }

    /// Encodes the frame. Record counts are truncated to 255 per kind.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let limit = usize::from(u8::MAX);
        let snakes = &self.snakes[..self.snakes.len().min(limit)];
        let chunks = &self.chunks[..self.chunks.len().min(limit)];
        let foods = &self.foods[..self.foods.len().min(limit)];

        let mut writer = MessageWriter::new();
        writer.write_u8(self.ticks);
        writer.write_u8(snakes.len() as u8);
        writer.write_u8(chunks.len() as u8);
        writer.write_u8(foods.len() as u8);
        writer.write_u8(u8::from(self.heatmap.is_some()));

        for record in snakes {
            record.write(&mut writer);
        }
        for record in chunks {
            record.write(&mut writer);
        }
        for record in foods {
            record.write(&mut writer);
        }
        if let Some((width, height, cells)) = &self.heatmap {
            writer.write_u8(*width);
            writer.write_u8(*height);
            writer.write_bytes(cells);
        }
        writer.into_bytes()
    }
}
