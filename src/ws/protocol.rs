//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::state::MatchState;

/// A movement/aim correction reported by the turn-holder's client.
///
/// Positions and velocities are client-computed; the server only stores the
/// values it accepts, it never simulates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCorrection {
    /// Walk intent: -1 left, 1 right, 0 stop
    pub walk: i8,
    /// Jump intent: -1 backflip, 1 forward, 0 stop
    pub jump: i8,
    /// Aim intent: -1 up, 1 down, 0 stop
    pub aim: i8,
    /// Aim angle in degrees
    pub angle: f32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Fire message payload: the firing bird's client-side pose plus impulse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponFirePacket {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub impulse: f32,
}

/// One entry of a client-reported damage batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageClaim {
    /// Team that owns the struck bird
    pub participant_id: Uuid,
    /// Index of the struck bird within that team's squad
    pub bird_slot: usize,
    pub damage: u16,
}

/// A bird pose snapshot used for post-resolution position corrections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPacket {
    pub angle: f32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Descriptive arguments of a reported explosion.
///
/// `origin`, `shape` and `kind` discriminate the physical event for
/// consensus fingerprinting; the rest is passed through to clients verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionArgs {
    pub origin: Point,
    pub shape: u32,
    pub kind: u32,
    pub radius: f32,
    pub power: f32,
    pub caused_by: String,
}

/// A client's view of one explosion: what blew up, and where every bird
/// ended up after the client's own physics resolved the blast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionReport {
    pub args: ExplosionArgs,
    /// participant id -> squad-ordered bird poses after the explosion
    pub positions: HashMap<Uuid, Vec<PositionPacket>>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Movement/aim correction for the active bird
    MoveCorrection(MoveCorrection),

    /// Select a weapon slot
    WeaponSelect { slot: usize },

    /// Fire the selected weapon
    WeaponFire(WeaponFirePacket),

    /// Batch of locally-detected hits awaiting server consensus
    DamageReport { claims: Vec<DamageClaim> },

    /// Locally-detected explosion awaiting server consensus
    ExplosionReport(ExplosionReport),

    /// Vote to advance the turn early, with post-resolution bird poses
    ReadyForNext {
        positions: HashMap<Uuid, Vec<PositionPacket>>,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        participant_id: Uuid,
        server_time: u64,
    },

    /// Authoritative match state snapshot
    StatePatch { state: MatchState },

    /// A member left the session
    MemberLeft { participant_id: Uuid },

    /// The session has been torn down
    SessionDisposed,

    /// Turn advanced to a new participant/bird
    TurnChanged {
        active_participant: usize,
        active_bird: usize,
    },

    /// A winner has been determined; the match is terminal
    Winner { participant_id: Uuid },

    /// A resolved explosion notice (positions travel in the state patch)
    Explosion { args: ExplosionArgs },

    /// Error message
    Error { code: String, message: String },
}
