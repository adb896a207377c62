//! Team state: one connected side and its squad

use serde::{Deserialize, Serialize};

use crate::game::bird::BirdState;
use crate::game::weapons::WeaponsState;
use crate::ws::protocol::{DamageClaim, ExplosionReport};

/// Display colors drawn without replacement per session
pub const TEAM_COLORS: &[&str] = &[
    "#08c56a", "#9ec508", "#06c5a3", "#258edb", "#a21ad9", "#d727a0",
];

/// One participant's team: squad, armament and per-turn flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamState {
    pub color: String,
    /// Cumulative score: sum of squad health, recomputed after damage
    pub points: u32,
    /// Index of the currently active bird
    pub active_bird: usize,
    /// Turn-advance vote
    pub ready_next: bool,
    /// Whether this team may currently act
    pub allowed: bool,
    pub birds: Vec<BirdState>,
    pub weapons: WeaponsState,

    /// Damage batches applied on behalf of this team (audit only)
    #[serde(skip)]
    pub hits: Vec<Vec<DamageClaim>>,
    /// Explosions resolved from this team's reports (audit only)
    #[serde(skip)]
    pub explosions: Vec<ExplosionReport>,
}

impl TeamState {
    pub fn new(color: String, birds: Vec<BirdState>) -> Self {
        let points = birds.iter().map(|b| b.health as u32).sum();
        Self {
            color,
            points,
            active_bird: 0,
            ready_next: false,
            allowed: true,
            birds,
            weapons: WeaponsState::with_default_loadout(),
            hits: Vec::new(),
            explosions: Vec::new(),
        }
    }

    /// A team is alive while any of its birds is
    pub fn is_alive(&self) -> bool {
        self.birds.iter().any(|b| !b.is_dead)
    }

    pub fn total_health(&self) -> u32 {
        self.birds.iter().map(|b| b.health as u32).sum()
    }

    /// The currently active bird; `alive_only` filters out a dead one
    pub fn current_bird(&self, alive_only: bool) -> Option<&BirdState> {
        let bird = self.birds.get(self.active_bird)?;
        if alive_only && bird.is_dead {
            return None;
        }
        Some(bird)
    }

    pub fn current_bird_mut(&mut self, alive_only: bool) -> Option<&mut BirdState> {
        let bird = self.birds.get_mut(self.active_bird)?;
        if alive_only && bird.is_dead {
            return None;
        }
        Some(bird)
    }

    /// Move the active-bird pointer to the next living bird, wrapping and
    /// skipping dead ones. Returns None when the whole squad is dead.
    pub fn next_bird(&mut self) -> Option<usize> {
        if !self.is_alive() {
            return None;
        }

        let len = self.birds.len();
        let mut idx = self.active_bird;
        loop {
            idx = if idx + 1 >= len { 0 } else { idx + 1 };
            if !self.birds[idx].is_dead {
                self.active_bird = idx;
                return Some(idx);
            }
        }
    }

    /// Recompute the score from squad health
    pub fn update_points(&mut self) {
        self.points = self.total_health();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::SpawnPoint;
    use crate::game::bird::SkinAttributes;

    fn squad(count: usize) -> Vec<BirdState> {
        (0..count)
            .map(|i| {
                BirdState::new(
                    0,
                    format!("Bird {}", i),
                    SkinAttributes::default(),
                    SpawnPoint { x: 0.0, y: 0.0 },
                )
            })
            .collect()
    }

    #[test]
    fn test_next_bird_wraps_and_skips_dead() {
        let mut team = TeamState::new("#08c56a".to_string(), squad(3));
        team.birds[1].is_dead = true;

        assert_eq!(team.next_bird(), Some(2));
        assert_eq!(team.next_bird(), Some(0));
        assert_eq!(team.next_bird(), Some(2));
    }

    #[test]
    fn test_next_bird_none_when_squad_dead() {
        let mut team = TeamState::new("#08c56a".to_string(), squad(2));
        for bird in &mut team.birds {
            bird.is_dead = true;
        }

        assert_eq!(team.next_bird(), None);
        assert!(!team.is_alive());
    }

    #[test]
    fn test_current_bird_alive_only() {
        let mut team = TeamState::new("#08c56a".to_string(), squad(2));
        team.birds[0].is_dead = true;

        assert!(team.current_bird(true).is_none());
        assert!(team.current_bird(false).is_some());
    }

    #[test]
    fn test_update_points_tracks_health() {
        let mut team = TeamState::new("#08c56a".to_string(), squad(2));
        assert_eq!(team.points, 200);

        team.birds[0].hit(30);
        team.update_points();
        assert_eq!(team.points, 170);
    }
}
