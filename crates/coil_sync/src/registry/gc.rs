//! Two-pass garbage collection.
//!
//! Pass one only reads and collects keys. Pass two removes each entity and
//! hands its owned value to the [`ReleaseHook`], so nothing is mutated while
//! it is being iterated and no hook can fire twice.

use std::collections::HashSet;

use coil_shared::Aabb;

use super::{Registry, Snake, SnakeChunk};
use crate::protocol::{ChunkKey, FoodChunk, SnakeId, Viewport};

/// Frees whatever external resources an evicted entity holds.
pub trait ReleaseHook {
    /// A body chunk left the registry.
    fn release_chunk(&mut self, chunk: SnakeChunk);

    /// A food cell left the registry.
    fn release_food(&mut self, food: FoodChunk);

    /// A snake left the registry.
    fn release_snake(&mut self, snake: Snake);
}

/// Hook that just drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRelease;

impl ReleaseHook for NoopRelease {
    fn release_chunk(&mut self, _chunk: SnakeChunk) {}
    fn release_food(&mut self, _food: FoodChunk) {}
    fn release_snake(&mut self, _snake: Snake) {}
}

/// What one pass released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Chunks released.
    pub chunks: usize,
    /// Food cells released.
    pub foods: usize,
    /// Snakes released.
    pub snakes: usize,
}

impl GcReport {
    /// Total entities released.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.chunks + self.foods + self.snakes
    }
}

impl Registry {
    fn is_junk_chunk(&self, snake: &Snake, chunk: &SnakeChunk, area: &Aabb, now: f64) -> bool {
        if chunk.junk {
            return true;
        }
        if snake.chunk_offset(chunk, now, self.config.offset_blend) > chunk.path_length() {
            return true;
        }
        let visible = area.intersects(&chunk.bounds.expanded(snake.width * 0.5));
        !visible && snake.chunk_age(chunk.key.local()) > self.config.gc_age_margin
    }

    /// Evicts junk entities.
    ///
    /// `local` is never evicted for having no chunks or being off-screen.
    pub fn collect_garbage<H: ReleaseHook + ?Sized>(
        &mut self,
        viewport: &Viewport,
        local: Option<SnakeId>,
        now: f64,
        hook: &mut H,
    ) -> GcReport {
        let area = viewport.extended(self.config.viewport_margin);

        // Pass 1: collect
        let mut junk_chunks: HashSet<ChunkKey> = HashSet::new();
        for snake in self.snakes.values() {
            for chunk in &snake.chunks {
                if self.is_junk_chunk(snake, chunk, &area, now) {
                    junk_chunks.insert(chunk.key);
                }
            }
        }

        let junk_foods: Vec<(u8, u8)> = self
            .foods
            .values()
            .filter(|food| !area.intersects(&food.bounds))
            .map(FoodChunk::cell)
            .collect();

        let junk_snakes: Vec<SnakeId> = self
            .snakes
            .values()
            .filter(|snake| {
                let emptied = snake.chunks.iter().all(|c| junk_chunks.contains(&c.key));
                let head = snake.motion.peek(now, &self.config).position;
                emptied && Some(snake.id) != local && (snake.dead || !area.contains(head))
            })
            .map(|snake| snake.id)
            .collect();

        // Pass 2: destroy and remove
        let mut report = GcReport::default();

        for snake in self.snakes.values_mut() {
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut snake.chunks)
                .into_iter()
                .partition(|c| junk_chunks.contains(&c.key));
            snake.chunks = kept;
            for chunk in gone {
                hook.release_chunk(chunk);
                report.chunks += 1;
            }
        }

        for cell in junk_foods {
            if let Some(food) = self.foods.remove(&cell) {
                hook.release_food(food);
                report.foods += 1;
            }
        }
        for food in self.retired_foods.drain(..) {
            hook.release_food(food);
            report.foods += 1;
        }

        for id in junk_snakes {
            if let Some(snake) = self.snakes.remove(&id) {
                hook.release_snake(snake);
                report.snakes += 1;
            }
        }

        if report.total() > 0 {
            tracing::debug!(
                "Released {} chunks, {} food cells, {} snakes",
                report.chunks, report.foods, report.snakes
            );
        }
        report
    }
}
