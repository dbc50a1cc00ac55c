//! # Side-Channel Messages
//!
//! Text frames carry JSON objects discriminated by their `"type"` field:
//!
//! ```json
//! {"type": "join", "snake_id": 7, "tick_rate": 8.0, "world_radius": 2000.0}
//! {"type": "death", "snake_id": 7, "killer": 12}
//! {"type": "names", "names": [{"snake_id": 7, "name": "ada"}]}
//! ```

use serde::{Deserialize, Serialize};

use super::records::SnakeId;
use crate::error::SyncResult;

/// Sent once after connecting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinInfo {
    /// Snake controlled by this client.
    pub snake_id: SnakeId,
    /// Server ticks per second.
    pub tick_rate: f64,
    /// Arena radius.
    pub world_radius: f64,
}

/// A snake died.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// The victim.
    pub snake_id: SnakeId,
    /// Who ran into whom, if anyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer: Option<SnakeId>,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Snake id.
    pub snake_id: SnakeId,
    /// Current length.
    pub length: f64,
    /// Display name, if the server sent one inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Leaderboard snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// Rows, best first.
    pub entries: Vec<ScoreEntry>,
    /// This client's rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Players on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Name for one snake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAssignment {
    /// Snake id.
    pub snake_id: SnakeId,
    /// Display name.
    pub name: String,
}

/// Any side-channel message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideChannelEvent {
    /// Session established.
    Join(JoinInfo),
    /// A snake died.
    Death(DeathEvent),
    /// Leaderboard snapshot.
    Scoreboard(Scoreboard),
    /// Batch of name assignments.
    Names {
        /// Assignments in arrival order.
        names: Vec<NameAssignment>,
    },
    /// Spectator mode toggled.
    Spectate {
        /// Whether the client now spectates.
        enabled: bool,
    },
}

impl SideChannelEvent {
    /// Wire tag of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Death(_) => "death",
            Self::Scoreboard(_) => "scoreboard",
            Self::Names { .. } => "names",
            Self::Spectate { .. } => "spectate",
        }
    }
}

/// Parses one text frame.
pub fn parse_side_channel(text: &str) -> SyncResult<SideChannelEvent> {
    Ok(serde_json::from_str(text)?)
}
