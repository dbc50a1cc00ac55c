//! # Update Buffer
//!
//! Sits between the network cadence and the render cadence.
//!
//! ```text
//! frames ──► decode ──► [Accumulating] ──► [Queued] [Queued] ... ──► next_update()
//!                            ▲
//!   side-channel events ─────┘ (attach to the tail tick)
//! ```
//!
//! A tick with `ticks == 0` stays Accumulating so that follow-up frames and
//! side events merge into it instead of queueing zero-time slots. Once its
//! tick count becomes non-zero it is Queued and never modified by frames again.

use std::collections::{HashMap, VecDeque};

use coil_shared::SyncConfig;

use crate::error::SyncResult;
use crate::events::Notification;
use crate::protocol::{
    decode_frame, ChunkDelta, DeathEvent, FoodChunk, FrameUpdate, HeatMap, JoinInfo, Scoreboard,
    SideChannelEvent, SnakeDelta, SnakeId,
};

/// Lifecycle of a buffered tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPhase {
    /// Zero ticks so far; still absorbing frames and side events.
    Accumulating,
    /// Closed; waiting for the consumer.
    Queued,
}

/// One unit of work for the consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Server ticks represented. Zero means no server time passed.
    pub ticks: u32,
    /// Snake deltas in arrival order.
    pub snakes: Vec<SnakeDelta>,
    /// Chunk deltas in arrival order.
    pub chunks: Vec<ChunkDelta>,
    /// Food chunks in arrival order.
    pub foods: Vec<FoodChunk>,
    /// Latest heat-map, if any arrived.
    pub heatmap: Option<HeatMap>,
    /// Latest scoreboard, if any arrived.
    pub scoreboard: Option<Scoreboard>,
    /// Deaths in arrival order.
    pub deaths: Vec<DeathEvent>,
    /// Where the tick is in its lifecycle.
    pub phase: TickPhase,
}

impl Tick {
    /// A tick that represents nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ticks: 0,
            snakes: Vec::new(),
            chunks: Vec::new(),
            foods: Vec::new(),
            heatmap: None,
            scoreboard: None,
            deaths: Vec::new(),
            phase: TickPhase::Accumulating,
        }
    }

    fn from_frame(frame: FrameUpdate) -> Self {
        let mut tick = Self::empty();
        tick.merge(frame);
        tick
    }

    /// Folds a decoded frame into this tick.
    fn merge(&mut self, frame: FrameUpdate) {
        self.ticks += u32::from(frame.ticks);
        self.snakes.extend(frame.snakes);
        self.chunks.extend(frame.chunks);
        self.foods.extend(frame.foods);
        if frame.heatmap.is_some() {
            self.heatmap = frame.heatmap;
        }
        if self.ticks > 0 {
            self.phase = TickPhase::Queued;
        }
    }

    /// True if there is nothing for the consumer to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks == 0
            && self.snakes.is_empty()
            && self.chunks.is_empty()
            && self.foods.is_empty()
            && self.heatmap.is_none()
            && self.scoreboard.is_none()
            && self.deaths.is_empty()
    }
}

impl Default for Tick {
    fn default() -> Self {
        Self::empty()
    }
}

/// Buffer counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Frames decoded successfully.
    pub frames_received: u64,
    /// Frames folded into an Accumulating tail.
    pub frames_merged: u64,
    /// Frames dropped because they failed to decode.
    pub decode_failures: u64,
    /// Side-channel events accepted.
    pub side_events: u64,
    /// Times the backlog crossed the congestion threshold.
    pub congestion_warnings: u64,
    /// Server ticks handed to the consumer.
    pub ticks_delivered: u64,
    /// Ticks thrown away by `clear`.
    pub ticks_discarded: u64,
}

/// Tick queue plus the auxiliary state side events write to.
pub struct UpdateBuffer {
    config: SyncConfig,
    queue: VecDeque<Tick>,
    names: HashMap<SnakeId, String>,
    join: Option<JoinInfo>,
    spectating: bool,
    stats: BufferStats,
}

impl UpdateBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            names: HashMap::new(),
            join: None,
            spectating: false,
            stats: BufferStats::default(),
        }
    }

    /// Decodes and enqueues a binary frame.
    ///
    /// A frame that fails to decode is dropped and its error returned. On
    /// success, returns a congestion notification if the backlog is now above
    /// the configured threshold.
    pub fn add_binary_update(&mut self, frame: &[u8]) -> SyncResult<Option<Notification>> {
        let update = match decode_frame(frame, &self.config) {
            Ok(update) => update,
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!("Dropping {} byte frame: {}", frame.len(), e);
                return Err(e);
            }
        };
        self.stats.frames_received += 1;

        match self.queue.back_mut() {
            Some(tail) if tail.phase == TickPhase::Accumulating && tail.ticks == 0 => {
                tail.merge(update);
                self.stats.frames_merged += 1;
            }
            _ => self.queue.push_back(Tick::from_frame(update)),
        }

        let buffered = self.duration();
        if buffered > self.config.congestion_threshold_secs {
            self.stats.congestion_warnings += 1;
            tracing::warn!(
                "Update backlog at {:.3}s ({} ticks queued)",
                buffered,
                self.queue.len()
            );
            return Ok(Some(Notification::Congestion {
                buffered_secs: buffered,
            }));
        }
        Ok(None)
    }

    /// Applies a side-channel event and returns the notification to publish.
    pub fn add_side_channel_update(&mut self, event: SideChannelEvent) -> Notification {
        self.stats.side_events += 1;
        tracing::debug!("Side-channel event: {}", event.kind());

        match event {
            SideChannelEvent::Join(info) => {
                self.join = Some(info.clone());
                Notification::Joined(info)
            }
            SideChannelEvent::Death(death) => {
                self.tail_mut().deaths.push(death.clone());
                Notification::Death(death)
            }
            SideChannelEvent::Scoreboard(board) => {
                self.tail_mut().scoreboard = Some(board.clone());
                Notification::Scoreboard(board)
            }
            SideChannelEvent::Names { names } => {
                for assignment in &names {
                    self.names
                        .insert(assignment.snake_id, assignment.name.clone());
                }
                Notification::Names(names)
            }
            SideChannelEvent::Spectate { enabled } => {
                self.spectating = enabled;
                Notification::Spectate { enabled }
            }
        }
    }

    /// Tail tick, or a fresh zero-tick placeholder if the queue is empty.
    fn tail_mut(&mut self) -> &mut Tick {
        if self.queue.is_empty() {
            self.queue.push_back(Tick::empty());
        }
        let last = self.queue.len() - 1;
        &mut self.queue[last]
    }

    /// Pops the oldest tick, or a zero tick if nothing is buffered.
    ///
    /// Names of snakes whose death rides in the tick are forgotten once the
    /// tick is handed out, so a reused id starts unnamed.
    pub fn next_update(&mut self) -> Tick {
        let mut tick = self.queue.pop_front().unwrap_or_default();
        for snake in &mut tick.snakes {
            if let Some(name) = self.names.get(&snake.id) {
                snake.name = Some(name.clone());
            }
        }
        for death in &tick.deaths {
            self.names.remove(&death.snake_id);
        }
        self.stats.ticks_delivered += u64::from(tick.ticks);
        tick
    }

    /// Seconds of server time waiting to be consumed.
    #[must_use]
    pub fn duration(&self) -> f64 {
        let ticks: u64 = self.queue.iter().map(|t| u64::from(t.ticks)).sum();
        self.config.tick_duration_secs * ticks as f64
    }

    /// Number of buffered ticks (including an Accumulating tail).
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discards every buffered tick.
    pub fn clear(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!("Discarding {} buffered ticks", self.queue.len());
        }
        self.stats.ticks_discarded += self.queue.len() as u64;
        self.queue.clear();
    }

    /// Display name of a snake.
    #[must_use]
    pub fn name(&self, snake: SnakeId) -> Option<&str> {
        self.names.get(&snake).map(String::as_str)
    }

    /// Join info, once received.
    #[must_use]
    pub const fn join_info(&self) -> Option<&JoinInfo> {
        self.join.as_ref()
    }

    /// Whether the server put us in spectator mode.
    #[must_use]
    pub const fn is_spectating(&self) -> bool {
        self.spectating
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> BufferStats {
        self.stats
    }
}
