//! # Out-of-Band Notifications
//!
//! Events raised by the network context that do not travel inside a tick.
//!
//! ```text
//! side channel ──► UpdateBuffer ──► Notification ──► subscribers (callbacks)
//!                                                └─► crossbeam receivers (threads)
//! ```

use crate::protocol::{DeathEvent, JoinInfo, NameAssignment, Scoreboard};

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Something the consumer may want to react to immediately.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The server accepted us.
    Joined(JoinInfo),
    /// A snake died.
    Death(DeathEvent),
    /// New leaderboard.
    Scoreboard(Scoreboard),
    /// Spectator mode changed.
    Spectate {
        /// Now spectating.
        enabled: bool,
    },
    /// Names were assigned.
    Names(Vec<NameAssignment>),
    /// The buffered backlog crossed the congestion threshold.
    Congestion {
        /// Seconds of server time waiting to be consumed.
        buffered_secs: f64,
    },
    /// The transport is gone.
    Disconnected,
}

impl Notification {
    /// Subscription key for this notification.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Joined(_) => EventKind::Joined,
            Self::Death(_) => EventKind::Death,
            Self::Scoreboard(_) => EventKind::Scoreboard,
            Self::Spectate { .. } => EventKind::Spectate,
            Self::Names(_) => EventKind::Names,
            Self::Congestion { .. } => EventKind::Congestion,
            Self::Disconnected => EventKind::Disconnected,
        }
    }
}

/// Subscription key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Notification::Joined`]
    Joined,
    /// [`Notification::Death`]
    Death,
    /// [`Notification::Scoreboard`]
    Scoreboard,
    /// [`Notification::Spectate`]
    Spectate,
    /// [`Notification::Names`]
    Names,
    /// [`Notification::Congestion`]
    Congestion,
    /// [`Notification::Disconnected`]
    Disconnected,
}
