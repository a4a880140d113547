//! Command values: immutable events flowing through the intake queue.
//!
//! Commands are produced by input collaborators (keyboard, network adapter)
//! or internally by the motion engine when a trajectory completes. The wire
//! shape is line-delimited JSON:
//! `{"timestamp":0,"actor_id":"PW_1","kind":"move","params":[[6,0],[4,0]]}`.

use serde::{Deserialize, Serialize};

use crate::types::{Cell, EventKind};

/// A requested or internally generated event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Game time in milliseconds at which the command was issued.
    pub timestamp: i64,
    /// Id of the piece this command targets. Empty for motion-completion
    /// events, which are routed internally and never looked up by id.
    pub actor_id: String,
    #[serde(with = "kind_str")]
    pub kind: EventKind,
    /// Board cells carried by the event. For player-issued Move commands
    /// `params[0]` is the source and `params[1]` the destination; `Arrived`
    /// carries the single cell the motion just reached.
    pub params: Vec<Cell>,
}

impl Command {
    pub fn new(timestamp: i64, actor_id: impl Into<String>, kind: EventKind, params: Vec<Cell>) -> Self {
        Self {
            timestamp,
            actor_id: actor_id.into(),
            kind,
            params,
        }
    }

    /// Idle reset for a piece at `cell`.
    pub fn idle(timestamp: i64, actor_id: impl Into<String>, cell: Cell) -> Self {
        Self::new(timestamp, actor_id, EventKind::Idle, vec![cell])
    }

    /// Player move request from `src` to `dst`.
    pub fn travel(timestamp: i64, actor_id: impl Into<String>, src: Cell, dst: Cell) -> Self {
        Self::new(timestamp, actor_id, EventKind::Move, vec![src, dst])
    }

    /// In-place jump at `cell`.
    pub fn jump(timestamp: i64, actor_id: impl Into<String>, cell: Cell) -> Self {
        Self::new(timestamp, actor_id, EventKind::Jump, vec![cell])
    }

    /// Motion-completion event carrying the reached cell.
    pub fn arrived(timestamp: i64, cell: Cell) -> Self {
        Self::new(timestamp, "", EventKind::Arrived, vec![cell])
    }

    /// Destination cell for legality evaluation: the last param.
    pub fn dest(&self) -> Option<Cell> {
        self.params.last().copied()
    }
}

/// Serialize [`EventKind`] as its lowercase wire string.
mod kind_str {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::EventKind;

    pub fn serialize<S: Serializer>(kind: &EventKind, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(kind.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<EventKind, D::Error> {
        let s = String::deserialize(de)?;
        EventKind::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event kind: {s}")))
    }
}
