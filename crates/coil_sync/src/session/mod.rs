//! # Session
//!
//! The async boundary between the network context and the consumer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  TransportFrame   ┌──────────────────────────┐   Command    ┌───────────────┐
//! │ transport  │ ────────────────► │ session task (tokio)     │ ◄─────────── │ SessionHandle │
//! │ (external) │ ◄──────────────── │ UpdateBuffer             │ ───────────► │ (consumer)    │
//! └────────────┘   input bytes     │ InputThrottle            │  Tick (move) └───────────────┘
//!                                  │ subscribers              │
//!                                  └──────────────────────────┘
//! ```
//!
//! The task is the only owner of the buffer. Ticks leave it by value through
//! a oneshot reply, so nothing is ever shared between contexts.

pub mod throttle;

pub use throttle::InputThrottle;

use std::collections::HashMap;

use coil_shared::SyncConfig;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::buffer::{BufferStats, Tick, UpdateBuffer};
use crate::error::{SyncError, SyncResult};
use crate::events::{EventKind, Notification};
use crate::protocol::{
    encode_user_input, parse_side_channel, JoinInfo, SideChannelEvent, SnakeId, UserInput,
    Viewport,
};

// ============================================================================
// TRANSPORT SEAM
// ============================================================================

/// One whole message from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportFrame {
    /// A binary world update.
    Binary(Vec<u8>),
    /// A side-channel text message.
    Text(String),
    /// The connection is gone.
    Closed,
}

/// Session end of a connected transport.
#[derive(Debug)]
pub struct TransportLink {
    /// Frames from the server, in order.
    pub incoming: mpsc::UnboundedReceiver<TransportFrame>,
    /// Encoded messages for the server.
    pub outgoing: mpsc::UnboundedSender<Vec<u8>>,
}

/// Transport end of a [`TransportLink`].
#[derive(Debug)]
pub struct TransportPeer {
    /// Push frames received from the server here.
    pub frames: mpsc::UnboundedSender<TransportFrame>,
    /// Messages the session wants sent.
    pub outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl TransportLink {
    /// Creates a connected link/peer pair.
    #[must_use]
    pub fn pair() -> (Self, TransportPeer) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (
            Self {
                incoming: frame_rx,
                outgoing: out_tx,
            },
            TransportPeer {
                frames: frame_tx,
                outgoing: out_rx,
            },
        )
    }
}

/// Opens transports. Socket handling lives behind this trait.
pub trait Connector {
    /// Connects to `address`.
    fn connect(&self, address: &str) -> SyncResult<TransportLink>;
}

// ============================================================================
// HANDLE
// ============================================================================

/// Returned by [`Session::init`] once the server accepted us.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionInfo {
    /// Snake controlled by this client.
    pub snake_id: SnakeId,
    /// Server ticks per second.
    pub tick_rate: f64,
    /// Arena radius.
    pub world_radius: f64,
    /// Address we connected to.
    pub server_address: String,
}

type Callback = Box<dyn FnMut(&Notification) + Send + 'static>;

enum Command {
    GetDataChanges(oneshot::Sender<Tick>),
    SendInput(UserInput),
    Subscribe(EventKind, Callback),
    SubscribeChannel(Sender<Notification>),
    BufferedDuration(oneshot::Sender<f64>),
    Stats(oneshot::Sender<BufferStats>),
    Quit,
}

/// Consumer-side handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    fn command(&self, command: Command) -> SyncResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::Disconnected)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.command(make(reply))?;
        response.await.map_err(|_| SyncError::Disconnected)
    }

    /// Takes the oldest buffered tick, or a zero tick if none is waiting.
    pub async fn get_data_changes(&self) -> SyncResult<Tick> {
        self.request(Command::GetDataChanges).await
    }

    /// Queues a steering update through the trailing-edge throttle.
    pub fn send_user_input(
        &self,
        direction: f64,
        wants_fast: bool,
        viewport: Viewport,
    ) -> SyncResult<()> {
        self.command(Command::SendInput(UserInput {
            direction,
            wants_fast,
            viewport,
        }))
    }

    /// Runs `callback` on the network context for every notification of `kind`.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl FnMut(&Notification) + Send + 'static,
    ) -> SyncResult<()> {
        self.command(Command::Subscribe(kind, Box::new(callback)))
    }

    /// Receives every notification on a channel usable from any thread.
    pub fn subscribe_channel(&self) -> SyncResult<Receiver<Notification>> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.command(Command::SubscribeChannel(sender))?;
        Ok(receiver)
    }

    /// Seconds of server time buffered and not yet taken.
    pub async fn buffered_duration(&self) -> SyncResult<f64> {
        self.request(Command::BufferedDuration).await
    }

    /// Buffer counters.
    pub async fn stats(&self) -> SyncResult<BufferStats> {
        self.request(Command::Stats).await
    }

    /// Stops the session. Buffered ticks are discarded.
    pub fn quit(&self) {
        // Already gone is fine
        let _ = self.commands.send(Command::Quit);
    }

    /// True once the session task has exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

// ============================================================================
// TASK
// ============================================================================

/// Network-context state. Lives inside the spawned task.
pub struct Session {
    address: String,
    buffer: UpdateBuffer,
    throttle: InputThrottle<UserInput>,
    subscribers: HashMap<EventKind, Vec<Callback>>,
    channels: Vec<Sender<Notification>>,
    link: TransportLink,
    commands: mpsc::UnboundedReceiver<Command>,
    join: Option<oneshot::Sender<JoinInfo>>,
}

impl Session {
    /// Connects, starts the network task and waits for the join message.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn init<C: Connector + ?Sized>(
        server_address: &str,
        connector: &C,
        config: SyncConfig,
    ) -> SyncResult<(SessionHandle, SessionInfo)> {
        config.validate()?;
        let link = connector.connect(server_address)?;
        tracing::info!("Connected to {}", server_address);

        let join_timeout = config.join_timeout();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (join_tx, join_rx) = oneshot::channel();

        let session = Self {
            address: server_address.to_owned(),
            throttle: InputThrottle::new(config.input_interval()),
            buffer: UpdateBuffer::new(config),
            subscribers: HashMap::new(),
            channels: Vec::new(),
            link,
            commands: command_rx,
            join: Some(join_tx),
        };
        tokio::spawn(session.run());

        let handle = SessionHandle {
            commands: command_tx,
        };
        let join = match tokio::time::timeout(join_timeout, join_rx).await {
            Ok(Ok(join)) => join,
            Ok(Err(_)) => return Err(SyncError::Disconnected),
            Err(_) => {
                tracing::warn!(
                    "No join message from {} within {:?}",
                    server_address,
                    join_timeout
                );
                handle.quit();
                return Err(SyncError::JoinTimeout(join_timeout));
            }
        };

        tracing::info!(
            "Joined as snake {} (tick rate {})",
            join.snake_id,
            join.tick_rate
        );
        let info = SessionInfo {
            snake_id: join.snake_id,
            tick_rate: join.tick_rate,
            world_radius: join.world_radius,
            server_address: server_address.to_owned(),
        };
        Ok((handle, info))
    }

    async fn run(mut self) {
        loop {
            let deadline = self.throttle.deadline();
            let flush = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                frame = self.link.incoming.recv() => match frame {
                    Some(TransportFrame::Binary(bytes)) => self.on_binary(&bytes),
                    Some(TransportFrame::Text(text)) => self.on_text(&text),
                    Some(TransportFrame::Closed) | None => break,
                },
                command = self.commands.recv() => match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => self.on_command(command),
                },
                () = flush => self.flush_input(),
            }
        }
        self.shutdown();
    }

    fn on_binary(&mut self, bytes: &[u8]) {
        // Errors are logged and counted by the buffer
        if let Ok(Some(congestion)) = self.buffer.add_binary_update(bytes) {
            self.publish(&congestion);
        }
    }

    fn on_text(&mut self, text: &str) {
        let event = match parse_side_channel(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Ignoring side-channel message: {}", e);
                return;
            }
        };
        if let SideChannelEvent::Join(info) = &event {
            if let Some(join) = self.join.take() {
                let _ = join.send(info.clone());
            }
        }
        let notification = self.buffer.add_side_channel_update(event);
        self.publish(&notification);
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::GetDataChanges(reply) => {
                let _ = reply.send(self.buffer.next_update());
            }
            Command::SendInput(input) => {
                if let Some(input) = self.throttle.offer(input, Instant::now()) {
                    self.send_input(&input);
                }
            }
            Command::Subscribe(kind, callback) => {
                self.subscribers.entry(kind).or_default().push(callback);
            }
            Command::SubscribeChannel(sender) => self.channels.push(sender),
            Command::BufferedDuration(reply) => {
                let _ = reply.send(self.buffer.duration());
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.buffer.stats());
            }
            Command::Quit => {}
        }
    }

    fn flush_input(&mut self) {
        if let Some(input) = self.throttle.poll(Instant::now()) {
            self.send_input(&input);
        }
    }

    fn send_input(&self, input: &UserInput) {
        if self.link.outgoing.send(encode_user_input(input)).is_err() {
            tracing::debug!("Input dropped, transport closed");
        }
    }

    fn publish(&mut self, notification: &Notification) {
        if let Some(callbacks) = self.subscribers.get_mut(&notification.kind()) {
            for callback in callbacks.iter_mut() {
                callback(notification);
            }
        }
        self.channels
            .retain(|sender| match sender.try_send(notification.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    fn shutdown(&mut self) {
        self.buffer.clear();
        self.publish(&Notification::Disconnected);
        tracing::info!("Session with {} closed", self.address);
    }
}
