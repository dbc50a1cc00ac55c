//! # Entity/Chunk Registry
//!
//! Live snakes, their body chunks in render order, and food cells.
//!
//! ## Ownership
//!
//! The registry owns every entity outright. Entities leave it only through
//! [`Registry::collect_garbage`], which moves each one into a
//! [`ReleaseHook`] so external resources are freed exactly once.
//!
//! ## Chunk Lifecycle
//!
//! ```text
//! new ──► open ──(point corrections)──► open ──(full record)──► final
//!                                                                 │
//!               offset > path length or off-screen & old ─────────┴──► junk ──► released
//! ```

pub mod gc;
pub mod ordering;

pub use gc::{GcReport, NoopRelease, ReleaseHook};
pub use ordering::{chunk_age, insert_ordered};

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use coil_shared::{Aabb, IntegrityPolicy, SyncConfig};

use crate::error::{SyncError, SyncResult};
use crate::prediction::{PredictedScalar, SnakeMotion};
use crate::protocol::{
    ChunkDelta, ChunkGeometry, ChunkKey, FoodChunk, PathVertex, SnakeDelta, SnakeId,
};

/// What `apply_chunk` did with a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// First time this chunk was seen.
    Inserted,
    /// Geometry of an open chunk was replaced.
    Corrected,
    /// A full record closed the chunk.
    Finalized,
    /// The chunk was already final.
    Ignored,
    /// Owner unknown and the policy says skip.
    Skipped,
}

/// One segment of a snake body.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeChunk {
    /// Identity.
    pub key: ChunkKey,
    /// Decoded path.
    pub geometry: ChunkGeometry,
    /// Box around the path vertices.
    pub bounds: Aabb,
    /// Path offset prediction.
    pub offset: PredictedScalar,
    /// Reached the byte budget.
    pub full: bool,
    /// No further point corrections accepted.
    pub is_final: bool,
    /// Flagged for removal.
    pub junk: bool,
    /// Server offset from a full record that arrived with no server time
    /// elapsed. Applied on the next reconciling sample.
    pub pending_offset: Option<f64>,
}

impl SnakeChunk {
    fn from_delta(delta: ChunkDelta, now: f64) -> Self {
        Self {
            key: delta.key,
            bounds: path_bounds(&delta.geometry),
            offset: PredictedScalar::new(delta.offset, now),
            full: delta.full,
            is_final: delta.full,
            junk: false,
            pending_offset: None,
            geometry: delta.geometry,
        }
    }

    /// Total path length.
    #[inline]
    #[must_use]
    pub fn path_length(&self) -> f64 {
        self.geometry.path_length
    }

    /// Vertex buffer for upload.
    #[must_use]
    pub fn vertex_buffer(&self) -> Vec<PathVertex> {
        self.geometry.vertex_buffer()
    }
}

fn path_bounds(geometry: &ChunkGeometry) -> Aabb {
    let mut points = geometry.points.iter().map(|p| p.position);
    let Some(first) = points.next() else {
        return Aabb::default();
    };
    let mut bounds = Aabb::point(first);
    for p in points {
        bounds.include_disc(p, 0.0);
    }
    bounds
}

/// A live snake.
#[derive(Clone, Debug, PartialEq)]
pub struct Snake {
    /// Snake id.
    pub id: SnakeId,
    /// Skin index.
    pub skin: u8,
    /// Length.
    pub length: f64,
    /// Width derived from length.
    pub width: f64,
    /// Local id of the newest chunk.
    pub head_chunk: u16,
    /// Boosting during the latest tick.
    pub fast: bool,
    /// Boost flags of the seven ticks before the latest.
    pub speed_history: u8,
    /// Display name.
    pub name: Option<String>,
    /// Reported dead on the side channel.
    pub dead: bool,
    /// Head prediction.
    pub motion: SnakeMotion,
    /// Server tick of the last reconciled sample.
    pub(crate) last_tick: u64,
    /// Head chunk as of the last reconciling sample.
    sampled_head: u16,
    chunks: Vec<SnakeChunk>,
}

impl Snake {
    fn from_delta(delta: &SnakeDelta, now: f64, config: &SyncConfig) -> Self {
        Self {
            id: delta.id,
            skin: delta.skin,
            length: delta.length,
            width: delta.width,
            head_chunk: delta.head_chunk,
            fast: delta.fast,
            speed_history: delta.speed_history,
            name: delta.name.clone(),
            dead: false,
            motion: SnakeMotion::new(
                delta.head,
                delta.direction,
                delta.target_direction,
                delta.fast,
                now,
                config,
            ),
            last_tick: 0,
            sampled_head: delta.head_chunk,
            chunks: Vec::new(),
        }
    }

    fn update(&mut self, delta: &SnakeDelta) {
        self.skin = delta.skin;
        self.length = delta.length;
        self.width = delta.width;
        self.head_chunk = delta.head_chunk;
        self.fast = delta.fast;
        self.speed_history = delta.speed_history;
        if delta.name.is_some() {
            self.name.clone_from(&delta.name);
        }
    }

    /// Chunks, oldest first.
    #[must_use]
    pub fn chunks(&self) -> &[SnakeChunk] {
        &self.chunks
    }

    /// Looks up a chunk by local id.
    #[must_use]
    pub fn chunk(&self, local: u16) -> Option<&SnakeChunk> {
        self.chunks.iter().find(|c| c.key.local() == local)
    }

    /// Age of a chunk relative to the current head.
    #[must_use]
    pub const fn chunk_age(&self, local: u16) -> u16 {
        chunk_age(self.head_chunk, local)
    }

    /// Rate at which a chunk's offset grows.
    ///
    /// The head chunk never moves. Neither does the previous head until a
    /// sample with elapsed server time has walked it.
    #[must_use]
    pub fn offset_rate(&self, local: u16) -> f64 {
        if local == self.head_chunk || local == self.sampled_head {
            0.0
        } else {
            self.motion.speed()
        }
    }

    /// Predicted offset of a chunk at `now`.
    #[must_use]
    pub fn chunk_offset(&self, chunk: &SnakeChunk, now: f64, weight: f64) -> f64 {
        chunk
            .offset
            .value_at(now, self.offset_rate(chunk.key.local()), weight)
    }

    /// Adds `distance` to every non-head chunk's known offset and pins the
    /// head chunk at zero.
    ///
    /// The head as of the previous sample was predicted at rate zero until
    /// now. A pending server offset replaces the known offset before walking.
    pub fn walk_offsets(&mut self, distance: f64, now: f64, weight: f64) {
        let head = self.head_chunk;
        let previous_head = self.sampled_head;
        let speed = self.motion.speed();
        for chunk in &mut self.chunks {
            let local = chunk.key.local();
            let base = chunk
                .pending_offset
                .take()
                .unwrap_or(chunk.offset.last_known);
            if local == head {
                chunk.offset.snap(0.0, now);
            } else {
                let rate = if local == previous_head { 0.0 } else { speed };
                chunk.offset.observe(base + distance, now, rate, weight);
            }
        }
        self.sampled_head = head;
    }

    /// Flags chunks whose predicted offset ran past their path.
    pub fn flag_consumed(&mut self, now: f64, weight: f64) -> usize {
        let mut flagged = 0;
        for i in 0..self.chunks.len() {
            let offset = self.chunk_offset(&self.chunks[i], now, weight);
            let chunk = &mut self.chunks[i];
            if !chunk.junk && offset > chunk.path_length() {
                chunk.junk = true;
                flagged += 1;
            }
        }
        flagged
    }
}

/// All live entities.
pub struct Registry {
    config: SyncConfig,
    snakes: BTreeMap<SnakeId, Snake>,
    foods: BTreeMap<(u8, u8), FoodChunk>,
    /// Replaced food cells waiting for the next release pass.
    retired_foods: Vec<FoodChunk>,
    skipped_chunks: u64,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            snakes: BTreeMap::new(),
            foods: BTreeMap::new(),
            retired_foods: Vec::new(),
            skipped_chunks: 0,
        }
    }

    /// Inserts or updates a snake. Returns true if it is new.
    pub fn apply_snake(&mut self, delta: &SnakeDelta, now: f64) -> bool {
        match self.snakes.entry(delta.id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().update(delta);
                false
            }
            Entry::Vacant(entry) => {
                tracing::debug!("Snake {} appeared", delta.id);
                entry.insert(Snake::from_delta(delta, now, &self.config));
                true
            }
        }
    }

    /// Inserts or corrects a body chunk.
    ///
    /// A chunk whose owner is unknown is handled by the configured
    /// [`IntegrityPolicy`]. `ticks` is the server time carried by the update;
    /// with zero ticks a full record's offset is held until the next
    /// reconciling sample instead of re-anchoring the prediction.
    pub fn apply_chunk(
        &mut self,
        delta: ChunkDelta,
        now: f64,
        ticks: u32,
    ) -> SyncResult<ChunkOutcome> {
        let key = delta.key;
        let Some(snake) = self.snakes.get_mut(&key.snake()) else {
            return match self.config.integrity_policy {
                IntegrityPolicy::Strict => Err(SyncError::UnknownSnake {
                    snake: key.snake(),
                    chunk: key.local(),
                }),
                IntegrityPolicy::Skip => {
                    tracing::debug!("Skipping chunk {} of unknown snake", key);
                    self.skipped_chunks += 1;
                    Ok(ChunkOutcome::Skipped)
                }
            };
        };

        let rate = snake.offset_rate(key.local());
        if let Some(chunk) = snake.chunks.iter_mut().find(|c| c.key == key) {
            if chunk.is_final {
                return Ok(ChunkOutcome::Ignored);
            }
            chunk.bounds = path_bounds(&delta.geometry);
            chunk.geometry = delta.geometry;
            if delta.full {
                chunk.full = true;
                chunk.is_final = true;
                if ticks == 0 {
                    chunk.pending_offset = Some(delta.offset);
                } else {
                    chunk
                        .offset
                        .observe(delta.offset, now, rate, self.config.offset_blend);
                }
                return Ok(ChunkOutcome::Finalized);
            }
            return Ok(ChunkOutcome::Corrected);
        }

        let head = snake.head_chunk;
        insert_ordered(
            &mut snake.chunks,
            SnakeChunk::from_delta(delta, now),
            head,
            |c| c.key.local(),
        );
        Ok(ChunkOutcome::Inserted)
    }

    /// Replaces a food cell. The previous occupant is released on the next
    /// garbage pass.
    pub fn apply_food(&mut self, chunk: FoodChunk) {
        if let Some(previous) = self.foods.insert(chunk.cell(), chunk) {
            self.retired_foods.push(previous);
        }
    }

    /// Marks a snake dead. Returns false if it is unknown.
    pub fn mark_dead(&mut self, id: SnakeId) -> bool {
        match self.snakes.get_mut(&id) {
            Some(snake) => {
                snake.dead = true;
                true
            }
            None => false,
        }
    }

    /// Looks up a snake.
    #[must_use]
    pub fn snake(&self, id: SnakeId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    /// Looks up a snake for mutation.
    pub fn snake_mut(&mut self, id: SnakeId) -> Option<&mut Snake> {
        self.snakes.get_mut(&id)
    }

    /// All snakes, by id.
    pub fn snakes(&self) -> impl Iterator<Item = &Snake> {
        self.snakes.values()
    }

    /// All snakes for mutation, by id.
    pub fn snakes_mut(&mut self) -> impl Iterator<Item = &mut Snake> {
        self.snakes.values_mut()
    }

    /// A snake's chunks, oldest first.
    #[must_use]
    pub fn chunks_in_render_order(&self, id: SnakeId) -> Option<&[SnakeChunk]> {
        self.snakes.get(&id).map(Snake::chunks)
    }

    /// Food cell lookup.
    #[must_use]
    pub fn food(&self, cell: (u8, u8)) -> Option<&FoodChunk> {
        self.foods.get(&cell)
    }

    /// All food cells.
    pub fn foods(&self) -> impl Iterator<Item = &FoodChunk> {
        self.foods.values()
    }

    /// Number of live snakes.
    #[must_use]
    pub fn snake_count(&self) -> usize {
        self.snakes.len()
    }

    /// Number of live chunks across all snakes.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.snakes.values().map(|s| s.chunks.len()).sum()
    }

    /// Chunks dropped under [`IntegrityPolicy::Skip`].
    #[must_use]
    pub const fn skipped_chunks(&self) -> u64 {
        self.skipped_chunks
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_chunk, decode_snake, ChunkRecord, MessageWriter, SnakeRecord};
    use coil_shared::CHUNK_HEADER_SIZE;

    fn snake_delta(id: u16, head_chunk: u16, config: &SyncConfig) -> SnakeDelta {
        let mut writer = MessageWriter::new();
        SnakeRecord {
            id,
            head_chunk,
            skin: 1,
            fast: false,
            speed_history: 0,
            length: 20.0,
            direction: 0.0,
            target_direction: 0.0,
            head: (0.0, 0.0),
        }
        .write(&mut writer);
        decode_snake(writer.as_slice(), 0, config).unwrap().0
    }

    fn chunk_delta(record: ChunkRecord, config: &SyncConfig) -> ChunkDelta {
        let mut writer = MessageWriter::new();
        record.write(&mut writer);
        decode_chunk(writer.as_slice(), 0, config).unwrap().0
    }

    fn strict() -> SyncConfig {
        SyncConfig {
            integrity_policy: IntegrityPolicy::Strict,
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_apply_snake_reports_new() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        assert!(registry.apply_snake(&snake_delta(1, 0, &config), 0.0));
        assert!(!registry.apply_snake(&snake_delta(1, 1, &config), 0.1));
        assert_eq!(registry.snake(1).unwrap().head_chunk, 1);
    }

    #[test]
    fn test_unknown_snake_strict() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        let orphan = chunk_delta(ChunkRecord::new(9, 0, vec![0]), &config);
        let result = registry.apply_chunk(orphan, 0.0, 1);
        assert!(matches!(
            result,
            Err(SyncError::UnknownSnake { snake: 9, chunk: 0 })
        ));
    }

    #[test]
    fn test_unknown_snake_skip() {
        let config = SyncConfig {
            integrity_policy: IntegrityPolicy::Skip,
            ..SyncConfig::default()
        };
        let mut registry = Registry::new(config.clone());
        let orphan = chunk_delta(ChunkRecord::new(9, 0, vec![0]), &config);
        let result = registry.apply_chunk(orphan, 0.0, 1);
        assert_eq!(result.unwrap(), ChunkOutcome::Skipped);
        assert_eq!(registry.skipped_chunks(), 1);
        assert_eq!(registry.chunk_count(), 0);
    }

    #[test]
    fn test_out_of_order_chunks_render_oldest_first() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(1, 3, &config), 0.0);
        for id in [3u16, 1, 2, 0] {
            registry
                .apply_chunk(chunk_delta(ChunkRecord::new(1, id, vec![0; 2]), &config), 0.0, 1)
                .unwrap();
        }
        let order: Vec<u16> = registry
            .chunks_in_render_order(1)
            .unwrap()
            .iter()
            .map(|c| c.key.local())
            .collect();
        assert_eq!(order, [0, 1, 2, 3]);
    }

    #[test]
    fn test_corrections_until_final() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(1, 5, &config), 0.0);

        let open = chunk_delta(ChunkRecord::new(1, 4, vec![0; 3]), &config);
        assert_eq!(registry.apply_chunk(open, 0.0, 1).unwrap(), ChunkOutcome::Inserted);

        let longer = chunk_delta(ChunkRecord::new(1, 4, vec![0; 6]), &config);
        assert_eq!(registry.apply_chunk(longer, 0.1, 1).unwrap(), ChunkOutcome::Corrected);
        assert_eq!(registry.snake(1).unwrap().chunk(4).unwrap().geometry.points.len(), 7);

        let codes = vec![0; config.max_chunk_bytes - CHUNK_HEADER_SIZE];
        let full = chunk_delta(ChunkRecord::new(1, 4, codes).with_offset(1.5), &config);
        assert_eq!(registry.apply_chunk(full, 0.2, 1).unwrap(), ChunkOutcome::Finalized);

        let late = chunk_delta(ChunkRecord::new(1, 4, vec![0; 2]), &config);
        assert_eq!(registry.apply_chunk(late, 0.3, 1).unwrap(), ChunkOutcome::Ignored);

        let chunk = registry.snake(1).unwrap().chunk(4).unwrap();
        assert!(chunk.is_final && chunk.full);
        assert_eq!(chunk.offset.last_known, 1.5);
    }

    #[test]
    fn test_head_offset_snaps_and_others_walk() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(1, 1, &config), 0.0);
        for id in [0u16, 1] {
            registry
                .apply_chunk(chunk_delta(ChunkRecord::new(1, id, vec![0; 4]), &config), 0.0, 1)
                .unwrap();
        }

        let snake = registry.snake_mut(1).unwrap();
        snake.walk_offsets(0.48, 0.25, 1.0);
        assert_eq!(snake.chunk(1).unwrap().offset.last_known, 0.0);
        assert!((snake.chunk(0).unwrap().offset.last_known - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_previous_head_holds_until_walked() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(1, 1, &config), 0.0);
        registry
            .apply_chunk(chunk_delta(ChunkRecord::new(1, 1, vec![0; 4]), &config), 0.0, 1)
            .unwrap();

        registry.apply_snake(&snake_delta(1, 2, &config), 0.5);
        let snake = registry.snake(1).unwrap();
        assert_eq!(snake.offset_rate(1), 0.0);
        assert_eq!(snake.offset_rate(2), 0.0);

        let snake = registry.snake_mut(1).unwrap();
        snake.walk_offsets(0.24, 0.625, 1.0);
        assert!(snake.offset_rate(1) > 0.0);
        assert!((snake.chunk(1).unwrap().offset.last_known - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_full_record_without_elapsed_time_is_deferred() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(1, 2, &config), 0.0);
        registry
            .apply_chunk(chunk_delta(ChunkRecord::new(1, 1, vec![0; 4]), &config), 0.0, 1)
            .unwrap();
        let before = registry.snake(1).unwrap().chunk(1).unwrap().offset;

        let codes = vec![0; config.max_chunk_bytes - CHUNK_HEADER_SIZE];
        let full = chunk_delta(ChunkRecord::new(1, 1, codes).with_offset(5.0), &config);
        assert_eq!(
            registry.apply_chunk(full, 0.5, 0).unwrap(),
            ChunkOutcome::Finalized
        );

        let chunk = registry.snake(1).unwrap().chunk(1).unwrap();
        assert!(chunk.is_final);
        assert_eq!(chunk.offset, before);
        assert_eq!(chunk.pending_offset, Some(5.0));

        let snake = registry.snake_mut(1).unwrap();
        snake.walk_offsets(0.24, 0.625, 1.0);
        let chunk = snake.chunk(1).unwrap();
        assert!((chunk.offset.last_known - 5.24).abs() < 1e-12);
        assert_eq!(chunk.pending_offset, None);
    }

    #[test]
    fn test_mark_dead() {
        let config = strict();
        let mut registry = Registry::new(config.clone());
        registry.apply_snake(&snake_delta(2, 0, &config), 0.0);
        assert!(registry.mark_dead(2));
        assert!(!registry.mark_dead(3));
        assert!(registry.snake(2).unwrap().dead);
    }
}
