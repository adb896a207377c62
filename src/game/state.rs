//! Authoritative match state: turn order, team membership and win detection

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::team::TeamState;

/// Serializable match state; broadcast to clients as an opaque snapshot.
///
/// Teams live in a BTreeMap for deterministic iteration order. Invariant:
/// `turn_order` holds exactly the keys of `teams`, in join order, without
/// duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    pub turn_order: Vec<Uuid>,
    /// Index into `turn_order` of the current turn-holder
    pub active_player: usize,
    /// Number of participants required for the match to go live
    pub capacity: usize,
    /// Arena index into the arena pool
    pub level: usize,
    /// Round timer interval in milliseconds (serialized for clients)
    pub round_time_interval: u64,
    /// Grace delay before the first round in milliseconds
    pub round_time_start: u64,
    pub teams: BTreeMap<Uuid, TeamState>,
}

impl MatchState {
    pub fn new(capacity: usize, level: usize, round_time_interval: u64, round_time_start: u64) -> Self {
        Self {
            turn_order: Vec::new(),
            active_player: 0,
            capacity,
            level,
            round_time_interval,
            round_time_start,
            teams: BTreeMap::new(),
        }
    }

    pub fn add_team(&mut self, participant_id: Uuid, team: TeamState) {
        self.teams.insert(participant_id, team);
        self.turn_order.push(participant_id);
    }

    pub fn remove_team(&mut self, participant_id: &Uuid) -> bool {
        if self.teams.remove(participant_id).is_some() {
            if let Some(idx) = self.turn_order.iter().position(|id| id == participant_id) {
                self.turn_order.remove(idx);
                // Keep the turn pointer on the same team when an earlier
                // entry disappears.
                if idx < self.active_player {
                    self.active_player -= 1;
                }
            }
            return true;
        }
        false
    }

    /// The match is live while every seat is filled
    pub fn is_live(&self) -> bool {
        self.teams.len() == self.capacity
    }

    /// Any team with a living bird left?
    pub fn exists_alive(&self) -> bool {
        self.teams.values().any(|t| t.is_alive())
    }

    pub fn active_participant_id(&self) -> Option<Uuid> {
        self.turn_order.get(self.active_player).copied()
    }

    pub fn is_active_participant(&self, participant_id: Uuid) -> bool {
        self.teams.contains_key(&participant_id)
            && self.active_participant_id() == Some(participant_id)
    }

    pub fn is_allowed_participant(&self, participant_id: Uuid) -> bool {
        self.teams
            .get(&participant_id)
            .map(|t| t.allowed)
            .unwrap_or(false)
    }

    /// Uniformly drawn participant; re-drawn on every consensus evaluation
    pub fn random_participant_id<R: Rng>(&self, rng: &mut R) -> Option<Uuid> {
        if self.turn_order.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.turn_order.len());
        Some(self.turn_order[idx])
    }

    pub fn active_team(&self) -> Option<&TeamState> {
        self.teams.get(&self.active_participant_id()?)
    }

    pub fn active_team_mut(&mut self) -> Option<&mut TeamState> {
        let id = self.active_participant_id()?;
        self.teams.get_mut(&id)
    }

    /// Move the turn-holder pointer to the next team with at least one
    /// living bird, wrapping around the turn order. Teams whose whole squad
    /// is dead are skipped; they are removed lazily by win evaluation, not
    /// here. Returns None when no living team exists.
    pub fn next_team(&mut self) -> Option<Uuid> {
        if self.turn_order.is_empty() || !self.exists_alive() {
            return None;
        }

        let len = self.turn_order.len();
        let mut idx = self.active_player;
        loop {
            idx = if idx + 1 >= len { 0 } else { idx + 1 };
            let id = self.turn_order[idx];
            if self.teams.get(&id).map(|t| t.is_alive()).unwrap_or(false) {
                self.active_player = idx;
                return Some(id);
            }
        }
    }

    /// Cascading elimination check.
    ///
    /// Removes every team whose squad health sums to zero and re-evaluates,
    /// because each removal can reduce the field to a single survivor. The
    /// sole remaining team (membership and turn order agreeing) wins; the
    /// winner is not removed from the turn order.
    pub fn find_winner(&mut self) -> Option<Uuid> {
        loop {
            if self.teams.len() == 1 && self.turn_order.len() == 1 {
                return Some(self.turn_order[0]);
            }

            let eliminated: Vec<Uuid> = self
                .turn_order
                .iter()
                .filter(|id| {
                    self.teams
                        .get(id)
                        .map(|t| t.total_health() == 0)
                        .unwrap_or(false)
                })
                .copied()
                .collect();

            if eliminated.is_empty() {
                return None;
            }

            for id in eliminated {
                self.remove_team(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::SpawnPoint;
    use crate::game::bird::{BirdState, SkinAttributes};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

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

    fn state_with_teams(count: usize) -> (MatchState, Vec<Uuid>) {
        let mut state = MatchState::new(count, 0, 20_000, 10_000);
        let mut ids = Vec::new();
        for _ in 0..count {
            let id = Uuid::new_v4();
            state.add_team(id, TeamState::new("#08c56a".to_string(), squad(2)));
            ids.push(id);
        }
        (state, ids)
    }

    fn kill_team(state: &mut MatchState, id: &Uuid) {
        let team = state.teams.get_mut(id).unwrap();
        for bird in &mut team.birds {
            bird.health = 0;
            bird.is_dead = true;
        }
    }

    #[test]
    fn test_no_winner_while_multiple_teams_live() {
        let (mut state, _) = state_with_teams(2);
        assert_eq!(state.find_winner(), None);
        assert_eq!(state.teams.len(), 2);
    }

    #[test]
    fn test_sole_remaining_team_wins_without_elimination() {
        let (mut state, ids) = state_with_teams(2);
        state.remove_team(&ids[0]);

        assert_eq!(state.find_winner(), Some(ids[1]));
        // The winner keeps its seat; the evaluation stays stable.
        assert_eq!(state.find_winner(), Some(ids[1]));
    }

    #[test]
    fn test_cascading_removal_yields_survivor() {
        let (mut state, ids) = state_with_teams(3);
        kill_team(&mut state, &ids[0]);
        kill_team(&mut state, &ids[1]);
        state.teams.get_mut(&ids[2]).unwrap().birds[0].health = 5;
        state.teams.get_mut(&ids[2]).unwrap().birds[1].health = 0;

        assert_eq!(state.find_winner(), Some(ids[2]));
        assert_eq!(state.teams.len(), 1);
        assert_eq!(state.turn_order, vec![ids[2]]);
    }

    #[test]
    fn test_all_dead_teams_removed_without_winner_loop() {
        let (mut state, ids) = state_with_teams(2);
        kill_team(&mut state, &ids[0]);
        kill_team(&mut state, &ids[1]);

        // Everyone is dead: the cascade clears the field and terminates.
        assert_eq!(state.find_winner(), None);
        assert!(state.teams.is_empty());
        // Advance on an empty field is a no-op, not an infinite loop.
        assert_eq!(state.next_team(), None);
    }

    #[test]
    fn test_next_team_skips_dead_teams() {
        let (mut state, ids) = state_with_teams(3);
        kill_team(&mut state, &ids[1]);

        assert_eq!(state.active_participant_id(), Some(ids[0]));
        assert_eq!(state.next_team(), Some(ids[2]));
        assert_eq!(state.next_team(), Some(ids[0]));
    }

    #[test]
    fn test_next_team_handles_stale_pointer_after_removal() {
        let (mut state, ids) = state_with_teams(3);
        state.active_player = 2;
        state.remove_team(&ids[1]);
        state.remove_team(&ids[2]);

        assert_eq!(state.next_team(), Some(ids[0]));
        assert_eq!(state.active_player, 0);
    }

    #[test]
    fn test_random_participant_comes_from_turn_order() {
        let (state, ids) = state_with_teams(4);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..32 {
            let picked = state.random_participant_id(&mut rng).unwrap();
            assert!(ids.contains(&picked));
        }
    }
}
