//! # Wire Constants
//!
//! Fixed record sizes of the binary world-update stream.
//!
//! **CRITICAL:** these mirror what the server writes. A mismatch here means
//! every frame after the first bad record decodes as garbage.

// =============================================================================
// FRAME
// =============================================================================

/// Frame header: tick count, snake count, chunk count, food count, heat-map flag.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Snake-info record: packed id (4) + skin (1) + flags (1) + five `f32` fields.
pub const SNAKE_RECORD_SIZE: usize = 26;

/// Body-chunk header: snake id (2) + chunk id (2) + code count (1) + four `f32` fields.
pub const CHUNK_HEADER_SIZE: usize = 21;

/// Food-chunk header: column (1) + row (1) + item count (2).
pub const FOOD_HEADER_SIZE: usize = 4;

/// Bytes per food item: local x, local y, packed size class / color.
pub const FOOD_ITEM_SIZE: usize = 3;

/// Heat-map prefix: width (1) + height (1).
pub const HEATMAP_HEADER_SIZE: usize = 2;

// =============================================================================
// PROTOCOL BUDGETS
// =============================================================================

/// Default byte budget of one body chunk (header + chain codes).
///
/// A chunk whose encoded size hits this value exactly is "full".
pub const DEFAULT_MAX_CHUNK_BYTES: usize = CHUNK_HEADER_SIZE + 128;

/// Number of history bits carried by the snake flags byte (bits 1-7).
pub const SPEED_HISTORY_BITS: u32 = 7;

/// Largest magnitude of a quantized chain-code turn.
pub const TURN_LEVELS: u8 = 7;

/// Outbound message tag: user input.
pub const OUTBOUND_INPUT_TAG: u8 = 1;

/// Outbound user-input message size.
pub const OUTBOUND_INPUT_SIZE: usize = 22;
