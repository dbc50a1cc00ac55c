//! # Wire Protocol
//!
//! Binary world updates (decode only), side-channel JSON messages and
//! outbound user input.
//!
//! All multi-byte values are big-endian. Decoding is pure: every function
//! takes a buffer and an offset and hands back the record plus the next
//! offset, so a malformed record fails alone.

pub mod chain;
pub mod frame;
pub mod reader;
pub mod records;
pub mod side_channel;
pub mod writer;

pub use chain::{ChainCode, ChunkGeometry, PathPoint, PathVertex};
pub use frame::{decode_frame, decode_frame_at, FrameUpdate};
pub use reader::ByteReader;
pub use records::{
    decode_chunk, decode_food, decode_snake, snake_width, ChunkDelta, ChunkKey, FoodChunk,
    FoodItem, HeatMap, SnakeDelta, SnakeId,
};
pub use side_channel::{
    parse_side_channel, DeathEvent, JoinInfo, NameAssignment, ScoreEntry, Scoreboard,
    SideChannelEvent,
};
pub use writer::{
    encode_user_input, ChunkRecord, FoodRecord, FrameBuilder, MessageWriter, SnakeRecord,
    UserInput, Viewport,
};
