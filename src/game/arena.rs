//! Arena definitions and spawn point sets

use serde::{Deserialize, Serialize};

/// A spawn location within an arena
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// A playable arena: a level id plus the set of spawn points clients know
/// how to render for it.
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub name: &'static str,
    pub spawn_points: &'static [SpawnPoint],
}

const BASIC_SPAWNS: &[SpawnPoint] = &[
    SpawnPoint { x: 180.0, y: 520.0 },
    SpawnPoint { x: 360.0, y: 470.0 },
    SpawnPoint { x: 560.0, y: 540.0 },
    SpawnPoint { x: 760.0, y: 430.0 },
    SpawnPoint { x: 980.0, y: 460.0 },
    SpawnPoint { x: 1180.0, y: 520.0 },
    SpawnPoint { x: 1400.0, y: 480.0 },
    SpawnPoint { x: 1620.0, y: 530.0 },
];

const GARDEN_SPAWNS: &[SpawnPoint] = &[
    SpawnPoint { x: 140.0, y: 600.0 },
    SpawnPoint { x: 330.0, y: 560.0 },
    SpawnPoint { x: 520.0, y: 620.0 },
    SpawnPoint { x: 710.0, y: 500.0 },
    SpawnPoint { x: 930.0, y: 540.0 },
    SpawnPoint { x: 1120.0, y: 610.0 },
    SpawnPoint { x: 1340.0, y: 560.0 },
    SpawnPoint { x: 1540.0, y: 590.0 },
];

/// All playable arenas; the level id stored in match state indexes this pool.
pub const ARENAS: &[Arena] = &[
    Arena {
        name: "basic",
        spawn_points: BASIC_SPAWNS,
    },
    Arena {
        name: "garden",
        spawn_points: GARDEN_SPAWNS,
    },
];

/// Look up an arena by level id, clamping out-of-range ids to the first arena.
pub fn arena(level: usize) -> &'static Arena {
    ARENAS.get(level).unwrap_or(&ARENAS[0])
}
