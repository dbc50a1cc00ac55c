//! # Sync Error Types
//!
//! All errors that can occur between the wire and the render loop.

use std::time::Duration;

use coil_shared::ConfigError;
use thiserror::Error;

/// Errors that can occur in the sync core.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The buffer ended before a record did, or decoding started past its end.
    #[error("buffer too short: need {needed} bytes at offset {offset}, {available} available")]
    Length {
        /// Where the read was attempted.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// Bytes actually left from `offset`.
        available: usize,
    },

    /// Bytes were left over after the declared records.
    #[error("frame has {extra} trailing bytes after {consumed} decoded bytes")]
    TrailingBytes {
        /// Bytes consumed by the declared records.
        consumed: usize,
        /// Bytes left unread.
        extra: usize,
    },

    /// A chunk that is not full reported a path offset.
    #[error("chunk {snake}:{chunk} is not full but carries path offset {offset}")]
    NonZeroOffset {
        /// Owning snake.
        snake: u16,
        /// Local chunk id.
        chunk: u16,
        /// The offending offset.
        offset: f32,
    },

    /// A chunk declared more chain codes than the byte budget allows.
    #[error("chunk {snake}:{chunk} is {size} bytes, budget is {max}")]
    ChunkOverBudget {
        /// Owning snake.
        snake: u16,
        /// Local chunk id.
        chunk: u16,
        /// Encoded size (header + codes).
        size: usize,
        /// Configured budget.
        max: usize,
    },

    /// A chunk update named a snake the registry does not know.
    #[error("chunk {snake}:{chunk} references unknown snake {snake}")]
    UnknownSnake {
        /// Missing snake id.
        snake: u16,
        /// Local chunk id.
        chunk: u16,
    },

    /// A text frame was not a valid side-channel message.
    #[error("malformed side-channel message: {0}")]
    SideChannel(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport refused to connect.
    #[error("failed to connect to {address}: {reason}")]
    ConnectFailed {
        /// Address that was dialled.
        address: String,
        /// Transport-supplied reason.
        reason: String,
    },

    /// The server never sent its join message.
    #[error("no join message within {0:?}")]
    JoinTimeout(Duration),

    /// The session is gone; no further updates will arrive.
    #[error("session disconnected")]
    Disconnected,
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
