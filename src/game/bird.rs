//! Bird (combat character) state: identity, health and movement intents

use serde::{Deserialize, Serialize};

use crate::game::arena::SpawnPoint;
use crate::ws::protocol::MoveCorrection;

/// Every bird spawns with this much health
pub const MAX_HEALTH: u16 = 100;

/// One cosmetic attribute slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub display: String,
}

/// Structured visual skin descriptor, decoded once at roster time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinAttributes {
    #[serde(default)]
    pub body: Attribute,
    #[serde(default)]
    pub eyes: Attribute,
    #[serde(default)]
    pub accessory: Attribute,
    #[serde(default)]
    pub beak: Attribute,
    #[serde(default)]
    pub head: Attribute,
    #[serde(default)]
    pub wings: Attribute,
}

/// Client-reconciled movement state of one bird
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Facing direction, follows the last non-zero walk intent
    pub direction: i8,
    /// Walk intent: -1 left, 1 right, 0 stop
    pub walk: i8,
    /// Jump intent: -1 backflip, 1 forward, 0 stop
    pub jump: i8,
    /// Aim intent: -1 up, 1 down, 0 stop
    pub aim: i8,
    pub angle: Option<f32>,
}

impl MoveState {
    fn at(spawn: SpawnPoint) -> Self {
        Self {
            x: spawn.x,
            y: spawn.y,
            vx: 0.0,
            vy: 0.0,
            direction: 1,
            walk: 0,
            jump: 0,
            aim: 0,
            angle: None,
        }
    }

    /// Clear intents at a turn transition; position and velocity are kept
    pub fn reset_intents(&mut self) {
        self.walk = 0;
        self.jump = 0;
        self.aim = 0;
    }
}

/// One controllable combat character within a squad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdState {
    pub bird_type: u32,
    pub name: String,
    pub skin: SkinAttributes,
    pub spawn: SpawnPoint,
    pub is_dead: bool,
    pub health: u16,
    /// Transient damage display, reset to zero after each applied batch
    pub damage: u16,
    pub movement: MoveState,
}

impl BirdState {
    pub fn new(bird_type: u32, name: String, skin: SkinAttributes, spawn: SpawnPoint) -> Self {
        Self {
            bird_type,
            name,
            skin,
            spawn,
            is_dead: false,
            health: MAX_HEALTH,
            damage: 0,
            movement: MoveState::at(spawn),
        }
    }

    /// A bird accepts interaction only while alive with no lethal damage pending
    pub fn available(&self) -> bool {
        if self.is_dead {
            return false;
        }
        if self.health == 0 {
            return false;
        }
        if self.damage >= self.health {
            return false;
        }
        true
    }

    /// Apply resolved damage. Health clamps at zero and the bird dies when
    /// the damage reaches its remaining health.
    pub fn hit(&mut self, value: u16) -> bool {
        if !self.available() {
            return false;
        }

        self.damage = value;

        if value < self.health {
            self.health -= value;
        } else {
            self.health = 0;
            self.is_dead = true;
        }

        true
    }

    /// Walk sub-update: debounced on the walk intent
    pub fn walk(&mut self, packet: &MoveCorrection) -> bool {
        if !self.available() {
            return false;
        }
        if packet.walk == self.movement.walk {
            return false;
        }
        if packet.walk != 0 {
            self.movement.direction = packet.walk;
        }

        self.movement.walk = packet.walk;
        self.movement.x = packet.x;
        self.movement.y = packet.y;
        self.movement.vx = packet.vx;
        self.movement.vy = packet.vy;

        true
    }

    /// Jump sub-update: debounced on the jump intent, records the origin pose
    pub fn jump(&mut self, packet: &MoveCorrection) -> bool {
        if !self.available() {
            return false;
        }
        if packet.jump == self.movement.jump {
            return false;
        }

        self.movement.jump = packet.jump;
        self.movement.x = packet.x;
        self.movement.y = packet.y;

        true
    }

    /// Aim sub-update: always overwrites intent and angle
    pub fn aim(&mut self, packet: &MoveCorrection) -> bool {
        if !self.available() {
            return false;
        }

        self.movement.aim = packet.aim;
        self.movement.angle = Some(packet.angle);

        true
    }
}
