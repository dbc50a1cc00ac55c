//! # Client World
//!
//! Consumer-side state: the registry plus everything needed to turn buffered
//! ticks into per-frame visuals.
//!
//! ```text
//! SessionHandle::get_data_changes() ──► integrate(tick, now)
//! render loop ────────────────────────► advance(now)          (every frame)
//! render loop ────────────────────────► collect_garbage(...)  (when convenient)
//! ```

use coil_shared::{SyncConfig, Vec2};

use crate::buffer::Tick;
use crate::error::SyncResult;
use crate::prediction::OffsetWalker;
use crate::protocol::{ChunkKey, DeathEvent, HeatMap, Scoreboard, SnakeDelta, SnakeId, Viewport};
use crate::registry::{ChunkOutcome, GcReport, Registry, ReleaseHook};

/// Rendered state of one chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkView {
    /// Identity.
    pub key: ChunkKey,
    /// Predicted path offset.
    pub offset: f64,
    /// Total path length.
    pub path_length: f64,
}

/// Rendered state of one snake.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeView {
    /// Snake id.
    pub id: SnakeId,
    /// Predicted head position.
    pub position: Vec2,
    /// Predicted heading.
    pub heading: f64,
    /// Body width.
    pub width: f64,
    /// Length.
    pub length: f64,
    /// Boost glow, 0..1.
    pub fast_intensity: f64,
    /// Skin index.
    pub skin: u8,
    /// Display name.
    pub name: Option<String>,
    /// Reported dead.
    pub dead: bool,
    /// No sample for a while.
    pub paused: bool,
    /// Chunks, oldest first.
    pub chunks: Vec<ChunkView>,
}

/// What one `integrate` call changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrateReport {
    /// Snakes seen for the first time.
    pub new_snakes: usize,
    /// Snakes whose prediction was reconciled.
    pub reconciled: usize,
    /// Chunks inserted.
    pub chunks_inserted: usize,
    /// Chunks corrected or finalized.
    pub chunks_corrected: usize,
    /// Chunk records dropped for unknown owners.
    pub chunks_skipped: usize,
    /// Food cells applied.
    pub foods: usize,
}

/// Registry plus prediction, owned by the consumer.
pub struct ClientWorld {
    config: SyncConfig,
    registry: Registry,
    walker: OffsetWalker,
    server_tick: u64,
    local_snake: Option<SnakeId>,
    scoreboard: Option<Scoreboard>,
    heatmap: Option<HeatMap>,
    deaths: Vec<DeathEvent>,
}

impl ClientWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            walker: OffsetWalker::new(&config),
            registry: Registry::new(config.clone()),
            config,
            server_tick: 0,
            local_snake: None,
            scoreboard: None,
            heatmap: None,
            deaths: Vec::new(),
        }
    }

    /// Sets the snake this client controls.
    pub fn set_local_snake(&mut self, id: SnakeId) {
        self.local_snake = Some(id);
    }

    /// Applies one buffered tick.
    ///
    /// Fails only under [`coil_shared::IntegrityPolicy::Strict`] when a chunk
    /// names an unknown snake; everything before that record stays applied.
    pub fn integrate(&mut self, tick: Tick, now: f64) -> SyncResult<IntegrateReport> {
        let mut report = IntegrateReport::default();
        self.server_tick += u64::from(tick.ticks);

        for delta in &tick.snakes {
            if self.registry.apply_snake(delta, now) {
                report.new_snakes += 1;
                if let Some(snake) = self.registry.snake_mut(delta.id) {
                    snake.last_tick = self.server_tick;
                }
            } else if self.reconcile(delta, now) {
                report.reconciled += 1;
            }
        }

        for delta in tick.chunks {
            match self.registry.apply_chunk(delta, now, tick.ticks)? {
                ChunkOutcome::Inserted => report.chunks_inserted += 1,
                ChunkOutcome::Corrected | ChunkOutcome::Finalized => report.chunks_corrected += 1,
                ChunkOutcome::Skipped => report.chunks_skipped += 1,
                ChunkOutcome::Ignored => {}
            }
        }

        report.foods = tick.foods.len();
        for food in tick.foods {
            self.registry.apply_food(food);
        }

        for death in tick.deaths {
            if !self.registry.mark_dead(death.snake_id) {
                tracing::debug!("Death of unknown snake {}", death.snake_id);
            }
            self.deaths.push(death);
        }
        if tick.scoreboard.is_some() {
            self.scoreboard = tick.scoreboard;
        }
        if tick.heatmap.is_some() {
            self.heatmap = tick.heatmap;
        }

        Ok(report)
    }

    /// Walks offsets and resamples motion. Zero elapsed ticks do nothing.
    fn reconcile(&mut self, delta: &SnakeDelta, now: f64) -> bool {
        let server_tick = self.server_tick;
        let Some(snake) = self.registry.snake_mut(delta.id) else {
            return false;
        };
        let elapsed = server_tick.saturating_sub(snake.last_tick);
        if elapsed == 0 {
            return false;
        }
        snake.last_tick = server_tick;

        let distance = self
            .walker
            .distance(elapsed, delta.fast, delta.speed_history);
        snake.walk_offsets(distance, now, self.config.offset_blend);
        snake.motion.sample(
            delta.head,
            delta.direction,
            delta.target_direction,
            delta.fast,
            now,
            &self.config,
        );
        true
    }

    /// Advances every prediction to `now` and returns what to draw.
    pub fn advance(&mut self, now: f64) -> Vec<SnakeView> {
        let config = &self.config;
        self.registry
            .snakes_mut()
            .map(|snake| {
                snake.flag_consumed(now, config.offset_blend);
                let state = snake.motion.advance(now, config);
                let chunks = snake
                    .chunks()
                    .iter()
                    .map(|chunk| ChunkView {
                        key: chunk.key,
                        offset: snake.chunk_offset(chunk, now, config.offset_blend),
                        path_length: chunk.path_length(),
                    })
                    .collect();
                SnakeView {
                    id: snake.id,
                    position: state.position,
                    heading: state.heading,
                    width: snake.width,
                    length: snake.length,
                    fast_intensity: state.fast_intensity,
                    skin: snake.skin,
                    name: snake.name.clone(),
                    dead: snake.dead,
                    paused: state.paused,
                    chunks,
                }
            })
            .collect()
    }

    /// Evicts junk, never the local snake.
    pub fn collect_garbage<H: ReleaseHook + ?Sized>(
        &mut self,
        viewport: &Viewport,
        now: f64,
        hook: &mut H,
    ) -> GcReport {
        self.registry
            .collect_garbage(viewport, self.local_snake, now, hook)
    }

    /// Server ticks integrated so far.
    #[must_use]
    pub const fn server_tick(&self) -> u64 {
        self.server_tick
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Latest scoreboard.
    #[must_use]
    pub const fn scoreboard(&self) -> Option<&Scoreboard> {
        self.scoreboard.as_ref()
    }

    /// Latest heat-map.
    #[must_use]
    pub const fn heatmap(&self) -> Option<&HeatMap> {
        self.heatmap.as_ref()
    }

    /// Deaths seen since the last call.
    pub fn take_deaths(&mut self) -> Vec<DeathEvent> {
        std::mem::take(&mut self.deaths)
    }
}
