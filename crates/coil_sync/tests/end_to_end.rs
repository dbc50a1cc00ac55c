//! End-to-end checks from raw frame bytes to render views.

use coil_sync::protocol::{
    decode_chunk, ChainCode, ChunkRecord, FrameBuilder, MessageWriter, SnakeRecord,
};
use coil_sync::registry::{Snake, SnakeChunk};
use coil_sync::{
    ChunkKey, ClientWorld, IntegrityPolicy, Registry, ReleaseHook, SnakeMotion, SyncConfig,
    UpdateBuffer, Vec2, Viewport,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn strict() -> SyncConfig {
    SyncConfig {
        integrity_policy: IntegrityPolicy::Strict,
        ..SyncConfig::default()
    }
}

fn snake(id: u16, head_chunk: u16, head: (f32, f32)) -> SnakeRecord {
    SnakeRecord {
        id,
        head_chunk,
        skin: 1,
        fast: false,
        speed_history: 0,
        length: 40.0,
        direction: 0.0,
        target_direction: 0.0,
        head,
    }
}

fn straight(count: usize) -> Vec<u8> {
    let code = ChainCode {
        fast: false,
        steps: 1,
        turn_level: 0,
    };
    vec![code.to_byte(); count]
}

#[derive(Default)]
struct Released {
    chunks: Vec<ChunkKey>,
    snakes: Vec<u16>,
}

impl ReleaseHook for Released {
    fn release_chunk(&mut self, chunk: SnakeChunk) {
        self.chunks.push(chunk.key);
    }
    fn release_food(&mut self, _food: coil_sync::protocol::FoodChunk) {}
    fn release_snake(&mut self, snake: Snake) {
        self.snakes.push(snake.id);
    }
}

#[test]
fn test_chain_length_scales_with_speed() {
    let config = strict();
    let mut writer = MessageWriter::new();
    ChunkRecord::new(1, 0, straight(42)).write(&mut writer);
    let bytes = writer.into_bytes();

    let (slow, used) = decode_chunk(&bytes, 0, &config).unwrap();
    assert_eq!(used, bytes.len());
    assert!(slow.geometry.path_length >= 42.0 * 0.24 - 1e-9);

    let scaled = SyncConfig {
        slow_speed: config.slow_speed * 4.2,
        fast_speed: config.fast_speed * 4.2,
        ..config
    };
    let (fast, _) = decode_chunk(&bytes, 0, &scaled).unwrap();
    assert!((fast.geometry.path_length - 4.2 * slow.geometry.path_length).abs() < 1e-4);
}

#[test]
fn test_buffer_delivers_in_arrival_order() {
    let config = strict();
    let mut buffer = UpdateBuffer::new(config.clone());
    for x in 1..=4u8 {
        let frame = FrameBuilder::new(1)
            .snake(snake(1, 0, (f32::from(x), 0.0)))
            .build();
        buffer.add_binary_update(&frame).unwrap();
    }

    for x in 1..=4u8 {
        let tick = buffer.next_update();
        assert_eq!(tick.ticks, 1);
        assert_eq!(tick.snakes[0].head.x, f64::from(x));
    }
    let idle = buffer.next_update();
    assert_eq!(idle.ticks, 0);
    assert!(idle.is_empty());
}

#[test]
fn test_shuffled_chunks_across_wrap_stay_ordered() {
    let config = strict();
    let mut rng = StdRng::seed_from_u64(0xC011);

    for round in 0..20u16 {
        let head: u16 = round.wrapping_sub(6);
        let mut ids: Vec<u16> = (0..12u16).map(|back| head.wrapping_sub(back)).collect();
        ids.shuffle(&mut rng);

        let mut registry = Registry::new(config.clone());
        let frame = FrameBuilder::new(1).snake(snake(9, head, (0.0, 0.0))).build();
        let mut buffer = UpdateBuffer::new(config.clone());
        buffer.add_binary_update(&frame).unwrap();
        let tick = buffer.next_update();
        registry.apply_snake(&tick.snakes[0], 0.0);

        for id in ids {
            let mut writer = MessageWriter::new();
            ChunkRecord::new(9, id, straight(3)).write(&mut writer);
            let (delta, _) = decode_chunk(writer.as_slice(), 0, &config).unwrap();
            registry.apply_chunk(delta, 0.0, 1).unwrap();
        }

        let snake = registry.snake(9).unwrap();
        let ages: Vec<u16> = snake
            .chunks()
            .iter()
            .map(|c| snake.chunk_age(c.key.local()))
            .collect();
        let expected: Vec<u16> = (0..12u16).rev().collect();
        assert_eq!(ages, expected, "head {head}");
        assert_eq!(snake.chunks().last().unwrap().key.local(), head);
    }
}

#[test]
fn test_consumed_chunk_released_exactly_once() {
    let config = strict();
    let mut world = ClientWorld::new(config.clone());
    let mut buffer = UpdateBuffer::new(config.clone());

    let first = FrameBuilder::new(1)
        .snake(snake(3, 1, (0.0, 0.0)))
        .chunk(ChunkRecord::new(3, 0, straight(2)))
        .chunk(ChunkRecord::new(3, 1, straight(2)))
        .build();
    buffer.add_binary_update(&first).unwrap();
    world.integrate(buffer.next_update(), 0.0).unwrap();

    // Ten slow ticks walk chunk 0 well past its 0.48 length
    let later = FrameBuilder::new(10)
        .snake(snake(3, 1, (2.4, 0.0)))
        .build();
    buffer.add_binary_update(&later).unwrap();
    world.integrate(buffer.next_update(), 0.5).unwrap();
    world.advance(0.5);

    let viewport = Viewport::new(Vec2::ZERO, Vec2::new(40.0, 40.0));
    let mut hook = Released::default();
    world.collect_garbage(&viewport, 0.5, &mut hook);
    world.collect_garbage(&viewport, 0.6, &mut hook);

    assert_eq!(hook.chunks, [ChunkKey::new(3, 0)]);
    assert!(hook.snakes.is_empty());
    assert_eq!(world.registry().chunk_count(), 1);
}

#[test]
fn test_prediction_continuity_at_constant_velocity() {
    let config = SyncConfig::default();
    let heading = 0.7;
    let start = Vec2::new(12.0, -3.0);
    let mut motion = SnakeMotion::new(start, heading, heading, false, 2.0, &config);
    let velocity = Vec2::from_angle(heading) * motion.speed();

    for step in 1..=8 {
        let t = 0.1 * f64::from(step);
        let state = motion.advance(2.0 + t, &config);
        let expected = start + velocity * t;
        assert!(state.position.distance(expected) < 1e-6, "t = {t}");
    }
}

#[test]
fn test_views_follow_integrated_frames() {
    let config = strict();
    let mut world = ClientWorld::new(config.clone());
    let mut buffer = UpdateBuffer::new(config.clone());
    world.set_local_snake(5);

    let frame = FrameBuilder::new(1)
        .snake(snake(5, 2, (1.0, 1.0)))
        .chunk(ChunkRecord::new(5, 1, straight(4)))
        .chunk(ChunkRecord::new(5, 2, straight(4)))
        .build();
    buffer.add_binary_update(&frame).unwrap();
    let report = world.integrate(buffer.next_update(), 0.0).unwrap();
    assert_eq!(report.new_snakes, 1);
    assert_eq!(report.chunks_inserted, 2);

    let views = world.advance(0.0);
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, 5);
    assert_eq!(views[0].position, Vec2::new(1.0, 1.0));
    let order: Vec<u16> = views[0].chunks.iter().map(|c| c.key.local()).collect();
    assert_eq!(order, [1, 2]);
}
