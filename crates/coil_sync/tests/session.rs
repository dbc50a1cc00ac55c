//! Session lifecycle against an in-memory transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coil_sync::protocol::{FrameBuilder, SnakeRecord};
use coil_sync::{
    Connector, EventKind, Notification, Session, SyncConfig, SyncError, SyncResult,
    TransportFrame, TransportLink, TransportPeer, Vec2, Viewport,
};

const JOIN: &str = r#"{"type":"join","snake_id":7,"tick_rate":8.0,"world_radius":21600.0}"#;

/// Hands out one pre-built link.
struct MemoryConnector {
    link: Mutex<Option<TransportLink>>,
}

impl MemoryConnector {
    fn new() -> (Self, TransportPeer) {
        let (link, peer) = TransportLink::pair();
        (
            Self {
                link: Mutex::new(Some(link)),
            },
            peer,
        )
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, address: &str) -> SyncResult<TransportLink> {
        self.link
            .lock()
            .ok()
            .and_then(|mut link| link.take())
            .ok_or_else(|| SyncError::ConnectFailed {
                address: address.to_owned(),
                reason: "already used".to_owned(),
            })
    }
}

struct Refusing;

impl Connector for Refusing {
    fn connect(&self, address: &str) -> SyncResult<TransportLink> {
        Err(SyncError::ConnectFailed {
            address: address.to_owned(),
            reason: "connection refused".to_owned(),
        })
    }
}

fn snake_frame(ticks: u8, x: f32) -> Vec<u8> {
    FrameBuilder::new(ticks)
        .snake(SnakeRecord {
            id: 7,
            head_chunk: 0,
            skin: 0,
            fast: false,
            speed_history: 0,
            length: 10.0,
            direction: 0.0,
            target_direction: 0.0,
            head: (x, 0.0),
        })
        .build()
}

fn viewport() -> Viewport {
    Viewport::new(Vec2::ZERO, Vec2::new(20.0, 12.0))
}

fn sent_direction(bytes: &[u8]) -> f32 {
    f32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]])
}

/// Lets the session task drain everything already queued.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_init_waits_for_join() {
    let (connector, peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();

    let (handle, info) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    assert_eq!(info.snake_id, 7);
    assert_eq!(info.tick_rate, 8.0);
    assert_eq!(info.server_address, "arena:444");
    assert!(!handle.is_closed());
    handle.quit();
}

#[tokio::test(start_paused = true)]
async fn test_ticks_come_out_in_order() {
    let (connector, peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();
    let (handle, _) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    for x in [1.0f32, 2.0, 3.0] {
        peer.frames
            .send(TransportFrame::Binary(snake_frame(1, x)))
            .unwrap();
    }
    settle().await;

    assert!((handle.buffered_duration().await.unwrap() - 0.375).abs() < 1e-9);
    for x in [1.0f32, 2.0, 3.0] {
        let tick = handle.get_data_changes().await.unwrap();
        assert_eq!(tick.ticks, 1);
        assert_eq!(tick.snakes[0].head.x, f64::from(x));
    }

    let idle = handle.get_data_changes().await.unwrap();
    assert_eq!(idle.ticks, 0);
    assert!(idle.is_empty());

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.frames_received, 3);
    assert_eq!(stats.ticks_delivered, 3);
}

#[tokio::test(start_paused = true)]
async fn test_input_is_throttled_on_the_trailing_edge() {
    let (connector, mut peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();
    let (handle, _) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    for direction in [0.5, 1.0, 1.5] {
        handle.send_user_input(direction, false, viewport()).unwrap();
    }

    let first = peer.outgoing.recv().await.unwrap();
    assert_eq!(sent_direction(&first), 0.5);

    let started = tokio::time::Instant::now();
    let trailing = peer.outgoing.recv().await.unwrap();
    assert_eq!(sent_direction(&trailing), 1.5);
    assert!(started.elapsed() <= SyncConfig::default().input_interval());

    settle().await;
    assert!(peer.outgoing.try_recv().is_err());
    handle.quit();
}

#[tokio::test(start_paused = true)]
async fn test_close_discards_buffer_and_notifies() {
    let (connector, peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();
    let (handle, _) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    handle
        .subscribe(EventKind::Disconnected, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let channel = handle.subscribe_channel().unwrap();
    settle().await;

    peer.frames
        .send(TransportFrame::Binary(snake_frame(2, 1.0)))
        .unwrap();
    peer.frames.send(TransportFrame::Closed).unwrap();
    settle().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(channel.try_recv().unwrap(), Notification::Disconnected);
    assert!(handle.is_closed());
    assert!(matches!(
        handle.get_data_changes().await,
        Err(SyncError::Disconnected)
    ));
    assert!(matches!(
        handle.send_user_input(0.0, false, viewport()),
        Err(SyncError::Disconnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_side_channel_notifications_reach_subscribers() {
    let (connector, peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();
    let (handle, _) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    let channel = handle.subscribe_channel().unwrap();
    settle().await;
    peer.frames
        .send(TransportFrame::Text(
            r#"{"type":"death","snake_id":3,"killer":7}"#.to_owned(),
        ))
        .unwrap();
    peer.frames
        .send(TransportFrame::Text("not json".to_owned()))
        .unwrap();
    settle().await;

    match channel.try_recv().unwrap() {
        Notification::Death(death) => {
            assert_eq!(death.snake_id, 3);
            assert_eq!(death.killer, Some(7));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(channel.try_recv().is_err());

    let tick = handle.get_data_changes().await.unwrap();
    assert_eq!(tick.ticks, 0);
    assert_eq!(tick.deaths.len(), 1);
    handle.quit();
}

#[tokio::test(start_paused = true)]
async fn test_channel_subscriber_reads_on_another_thread() {
    let (connector, peer) = MemoryConnector::new();
    peer.frames.send(TransportFrame::Text(JOIN.to_owned())).unwrap();
    let (handle, _) = Session::init("arena:444", &connector, SyncConfig::default())
        .await
        .unwrap();

    let channel = handle.subscribe_channel().unwrap();
    settle().await;
    peer.frames
        .send(TransportFrame::Text(
            r#"{"type":"spectate","enabled":true}"#.to_owned(),
        ))
        .unwrap();
    peer.frames.send(TransportFrame::Closed).unwrap();
    settle().await;

    let reader = std::thread::spawn(move || channel.try_iter().collect::<Vec<_>>());
    assert_eq!(
        reader.join().unwrap(),
        vec![
            Notification::Spectate { enabled: true },
            Notification::Disconnected
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_join_times_out() {
    let (connector, _peer) = MemoryConnector::new();
    let config = SyncConfig::default();
    let expected = config.join_timeout();

    let result = Session::init("arena:444", &connector, config).await;
    match result {
        Err(SyncError::JoinTimeout(waited)) => assert_eq!(waited, expected),
        other => panic!("expected timeout, got {:?}", other.map(|(_, info)| info)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_closed_before_join_is_disconnected() {
    let (connector, peer) = MemoryConnector::new();
    drop(peer);

    let result = Session::init("arena:444", &connector, SyncConfig::default()).await;
    assert!(matches!(result, Err(SyncError::Disconnected)));
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let result = Session::init("arena:444", &Refusing, SyncConfig::default()).await;
    match result {
        Err(SyncError::ConnectFailed { address, .. }) => assert_eq!(address, "arena:444"),
        other => panic!("expected connect failure, got {:?}", other.map(|(_, info)| info)),
    }
}
