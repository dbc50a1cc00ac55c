//! # COIL Sync - Client State Synchronization
//!
//! Turns the server's binary world stream into smooth, render-ready state.
//!
//! ## Architecture
//!
//! - **Protocol**: Pure big-endian decoders for frames, snake records,
//!   chain-coded body chunks, food cells and the heat-map
//! - **Buffer**: Tick queue absorbing the mismatch between network and render cadence
//! - **Registry**: Snakes and chunks in wraparound-safe render order, two-pass eviction
//! - **Prediction**: Dual-prediction blending between authoritative samples
//! - **Session**: Async boundary with move-only handoff and a trailing-edge input throttle
//!
//! ## Data Flow
//!
//! ```text
//!   NETWORK CONTEXT                               CONSUMER CONTEXT
//!
//!   bytes ──► decode ──► UpdateBuffer             ClientWorld
//!                           │                        ▲   │
//!                           └──── Tick (move) ───────┘   └──► advance(now) ──► SnakeView
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use coil_sync::{ClientWorld, Session, SyncConfig};
//!
//! let config = SyncConfig::load("coil.toml")?;
//! let (handle, info) = Session::init("wss://arena:443", &connector, config.clone()).await?;
//!
//! let mut world = ClientWorld::new(config);
//! world.set_local_snake(info.snake_id);
//!
//! loop {
//!     let tick = handle.get_data_changes().await?;
//!     world.integrate(tick, now)?;
//!     let views = world.advance(now);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod error;
pub mod events;
pub mod prediction;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod world;

// Re-exports for convenience
pub use buffer::{BufferStats, Tick, TickPhase, UpdateBuffer};
pub use coil_shared::{IntegrityPolicy, SyncConfig, Vec2};
pub use error::{SyncError, SyncResult};
pub use events::{EventKind, Notification};
pub use prediction::{
    FastIntensity, OffsetWalker, PredictedAngle, PredictedScalar, PredictedVec2, SnakeMotion,
};
pub use protocol::{
    decode_frame, encode_user_input, parse_side_channel, ChunkKey, FrameBuilder, FrameUpdate,
    SideChannelEvent, UserInput, Viewport,
};
pub use registry::{ChunkOutcome, GcReport, NoopRelease, Registry, ReleaseHook, Snake, SnakeChunk};
pub use session::{
    Connector, InputThrottle, Session, SessionHandle, SessionInfo, TransportFrame, TransportLink,
    TransportPeer,
};
pub use world::{ChunkView, ClientWorld, IntegrateReport, SnakeView};
