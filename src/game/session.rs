//! Game session: the authoritative turn-based match state machine.
//!
//! Each session runs as one spawned task owning all of its state; inbound
//! messages and timer expiries are serialized through a single select loop,
//! so handlers never interleave and need no locking. Admission is the only
//! point that awaits external work (the roster lookup).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::arena::{arena, SpawnPoint, ARENAS};
use crate::game::bird::BirdState;
use crate::game::clock::RoundClock;
use crate::game::consensus::{
    damage_fingerprint, explosion_fingerprint, ConsensusLedger, Verdict,
};
use crate::game::state::MatchState;
use crate::game::team::{TeamState, TEAM_COLORS};
use crate::store::roster::RosterStore;
use crate::util::draw::DrawPool;
use crate::ws::protocol::{
    ClientMsg, DamageClaim, ExplosionReport, MoveCorrection, PositionPacket, ServerMsg,
    WeaponFirePacket,
};

/// Match variants offered by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    #[serde(rename = "1on1")]
    OneOnOne,
    #[serde(rename = "2on2")]
    TwoOnTwo,
}

impl SessionMode {
    pub fn config(self) -> SessionConfig {
        match self {
            SessionMode::OneOnOne => SessionConfig {
                mode_name: "1on1",
                capacity: 2,
                squad_size: 2,
                round_interval: Duration::from_secs(20),
                start_grace: Duration::from_secs(10),
                ready_delay: Duration::from_secs(2),
            },
            SessionMode::TwoOnTwo => SessionConfig {
                mode_name: "2on2",
                capacity: 4,
                squad_size: 2,
                round_interval: Duration::from_secs(20),
                start_grace: Duration::from_secs(10),
                ready_delay: Duration::from_secs(2),
            },
        }
    }
}

/// Fixed per-variant match configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub mode_name: &'static str,
    /// Participants required for the match to go live
    pub capacity: usize,
    /// Birds per team
    pub squad_size: usize,
    /// Round timer interval
    pub round_interval: Duration,
    /// Grace delay before the round clock first resumes
    pub start_grace: Duration,
    /// Delay between an all-ready vote and the turn advance
    pub ready_delay: Duration,
}

/// Why an admission attempt failed
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("session is already full")]
    SessionLive,

    #[error("no roster found for credential")]
    RosterNotFound,

    #[error("roster has the wrong squad size")]
    RosterSize,

    #[error("session closed")]
    SessionClosed,
}

/// Admission request carried over the session's input channel
#[derive(Debug)]
pub struct JoinRequest {
    pub participant_id: Uuid,
    pub credential: String,
    pub reply: oneshot::Sender<Result<(), JoinError>>,
}

/// Inbound work for a session task
#[derive(Debug)]
pub enum SessionInput {
    Join(JoinRequest),
    Leave { participant_id: Uuid },
    Client { participant_id: Uuid, msg: ClientMsg },
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub mode: SessionMode,
    pub input_tx: mpsc::Sender<SessionInput>,
    pub events_tx: broadcast::Sender<ServerMsg>,
    pub member_count: Arc<AtomicUsize>,
    pub locked: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn member_count(&self) -> usize {
        self.member_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn total_members(&self) -> usize {
        self.sessions.iter().map(|s| s.value().member_count()).sum()
    }

    /// Find a joinable session of the requested mode
    pub fn find_open(&self, mode: SessionMode) -> Option<SessionHandle> {
        let capacity = mode.config().capacity;
        for entry in self.sessions.iter() {
            let handle = entry.value();
            if handle.mode == mode
                && !handle.locked.load(Ordering::Relaxed)
                && handle.member_count() < capacity
            {
                return Some(handle.clone());
            }
        }
        None
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative match session
pub struct GameSession {
    id: Uuid,
    config: SessionConfig,
    state: MatchState,
    /// Corroboration ledger for damage batches
    hits: ConsensusLedger<DamageClaim>,
    /// Corroboration ledger for explosions
    explosions: ConsensusLedger<ExplosionReport>,
    clock: RoundClock,
    /// Pending round-clock resume after the start grace delay
    resume_at: Option<Instant>,
    /// Pending early advance after an all-ready vote
    advance_at: Option<Instant>,
    round_index: u32,
    winner: Option<Uuid>,
    locked: Arc<AtomicBool>,
    ever_joined: bool,
    rng: ChaCha8Rng,
    color_pool: DrawPool<String>,
    spawn_pool: DrawPool<SpawnPoint>,
    roster_store: Arc<RosterStore>,
    input_rx: mpsc::Receiver<SessionInput>,
    events_tx: broadcast::Sender<ServerMsg>,
    member_count: Arc<AtomicUsize>,
}

/// Sleep until an optional deadline; pend forever when there is none
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

impl GameSession {
    /// Create a new session task plus the handle the lobby keeps
    pub fn new(mode: SessionMode, seed: u64, roster_store: Arc<RosterStore>) -> (Self, SessionHandle) {
        let config = mode.config();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let level = rng.gen_range(0..ARENAS.len());

        let state = MatchState::new(
            config.capacity,
            level,
            config.round_interval.as_millis() as u64,
            config.start_grace.as_millis() as u64,
        );

        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        let member_count = Arc::new(AtomicUsize::new(0));
        let locked = Arc::new(AtomicBool::new(false));
        let id = Uuid::new_v4();

        let handle = SessionHandle {
            id,
            mode,
            input_tx,
            events_tx: events_tx.clone(),
            member_count: member_count.clone(),
            locked: locked.clone(),
        };

        let session = Self {
            id,
            config,
            state,
            hits: ConsensusLedger::new(config.capacity),
            explosions: ConsensusLedger::new(config.capacity),
            clock: RoundClock::new(config.round_interval),
            resume_at: None,
            advance_at: None,
            round_index: 1,
            winner: None,
            locked,
            ever_joined: false,
            rng,
            color_pool: DrawPool::new(TEAM_COLORS.iter().map(|c| c.to_string()).collect()),
            spawn_pool: DrawPool::new(arena(level).spawn_points.to_vec()),
            roster_store,
            input_rx,
            events_tx,
            member_count,
        };

        (session, handle)
    }

    /// Run the session loop until the last member leaves
    pub async fn run(mut self) {
        info!(
            session_id = %self.id,
            mode = self.config.mode_name,
            level = self.state.level,
            "Session started"
        );

        loop {
            let round_deadline = self.clock.deadline();
            let resume_at = self.resume_at;
            let advance_at = self.advance_at;

            tokio::select! {
                maybe_input = self.input_rx.recv() => {
                    match maybe_input {
                        Some(input) => self.dispatch(input).await,
                        None => break,
                    }
                }
                _ = sleep_until_opt(round_deadline) => {
                    self.clock.rearm();
                    self.advance_turn();
                }
                _ = sleep_until_opt(resume_at) => {
                    self.resume_at = None;
                    self.clock.resume();
                }
                _ = sleep_until_opt(advance_at) => {
                    self.advance_at = None;
                    self.advance_turn();
                }
            }

            if self.ever_joined && self.state.teams.is_empty() {
                break;
            }
        }

        self.dispose();
    }

    async fn dispatch(&mut self, input: SessionInput) {
        match input {
            SessionInput::Join(request) => {
                let result = self
                    .handle_join(request.participant_id, &request.credential)
                    .await;
                let _ = request.reply.send(result);
            }
            SessionInput::Leave { participant_id } => self.handle_leave(participant_id),
            SessionInput::Client { participant_id, msg } => match msg {
                ClientMsg::MoveCorrection(packet) => self.handle_move(participant_id, &packet),
                ClientMsg::WeaponSelect { slot } => self.handle_weapon_select(participant_id, slot),
                ClientMsg::WeaponFire(packet) => self.handle_weapon_fire(participant_id, &packet),
                ClientMsg::DamageReport { claims } => {
                    self.handle_damage_report(participant_id, &claims)
                }
                ClientMsg::ExplosionReport(report) => {
                    self.handle_explosion_report(participant_id, report)
                }
                ClientMsg::ReadyForNext { positions } => {
                    self.handle_ready_next(participant_id, &positions)
                }
            },
        }
    }

    /// Admission: fetch the cached roster and seat the team.
    ///
    /// No state is mutated on a rejected join.
    async fn handle_join(
        &mut self,
        participant_id: Uuid,
        credential: &str,
    ) -> Result<(), JoinError> {
        if self.locked.load(Ordering::Relaxed) || self.state.is_live() {
            return Err(JoinError::SessionLive);
        }

        let roster = self
            .roster_store
            .fetch_roster(credential, self.config.squad_size)
            .await
            .ok_or(JoinError::RosterNotFound)?;

        if roster.len() != self.config.squad_size {
            return Err(JoinError::RosterSize);
        }

        let color = self.color_pool.draw(&mut self.rng);
        let mut birds = Vec::with_capacity(roster.len());
        for one in roster {
            let name = match one.name.filter(|n| !n.is_empty()) {
                Some(name) => name,
                None => self.roster_store.placeholder_name(),
            };
            let spawn = self.spawn_pool.draw(&mut self.rng);
            birds.push(BirdState::new(one.bird_type, name, one.attributes, spawn));
        }

        self.state.add_team(participant_id, TeamState::new(color, birds));
        self.ever_joined = true;
        self.member_count
            .store(self.state.teams.len(), Ordering::Relaxed);

        info!(session_id = %self.id, participant = %participant_id, "JOIN");

        if self.state.is_live() {
            self.on_ready();
        }

        self.broadcast_patch();
        Ok(())
    }

    /// The session is full: lock it and start the round clock after the
    /// opening grace delay, giving clients time to render the initial state.
    fn on_ready(&mut self) {
        info!(session_id = %self.id, "READY TO PLAY");
        self.locked.store(true, Ordering::Relaxed);
        self.resume_at = Some(Instant::now() + self.config.start_grace);
    }

    fn handle_leave(&mut self, participant_id: Uuid) {
        if !self.state.teams.contains_key(&participant_id) {
            return;
        }

        let was_active = self.state.is_active_participant(participant_id);
        let left_index = self
            .state
            .turn_order
            .iter()
            .position(|id| *id == participant_id);

        self.state.remove_team(&participant_id);
        self.member_count
            .store(self.state.teams.len(), Ordering::Relaxed);

        info!(session_id = %self.id, participant = %participant_id, "LEAVE");
        self.broadcast(ServerMsg::MemberLeft { participant_id });

        if !self.locked.load(Ordering::Relaxed) {
            return;
        }
        if self.check_winner() {
            return;
        }

        // An absent turn-holder must never stall the match: re-anchor the
        // pointer so the forced advance lands on the leaver's successor.
        if was_active {
            if let Some(idx) = left_index {
                let len = self.state.turn_order.len();
                if len > 0 {
                    self.state.active_player = (idx + len - 1) % len;
                }
            }
            self.clock.reset();
            self.advance_turn();
        }
    }

    /// Movement/aim reconciliation for the turn-holder's active bird
    fn handle_move(&mut self, participant_id: Uuid, packet: &MoveCorrection) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_active_participant(participant_id) {
            return;
        }

        debug!(session_id = %self.id, participant = %participant_id, "move correction");

        let changed = {
            let Some(team) = self.state.active_team_mut() else {
                return;
            };
            let Some(bird) = team.current_bird_mut(true) else {
                return;
            };
            // Each sub-update runs independently and reports whether it
            // changed anything; aim has no debounce.
            let updates = [bird.walk(packet), bird.jump(packet), bird.aim(packet)];
            updates.iter().any(|&changed| changed)
        };

        // Only changed state is worth a broadcast.
        if changed {
            self.broadcast_patch();
        }
    }

    fn handle_weapon_select(&mut self, participant_id: Uuid, slot: usize) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_active_participant(participant_id) {
            return;
        }
        if !self.state.is_allowed_participant(participant_id) {
            return;
        }

        debug!(session_id = %self.id, participant = %participant_id, slot, "select weapon");

        if let Some(team) = self.state.teams.get_mut(&participant_id) {
            team.weapons.select(slot);
        }

        self.broadcast_patch();
    }

    fn handle_weapon_fire(&mut self, participant_id: Uuid, packet: &WeaponFirePacket) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_active_participant(participant_id) {
            return;
        }
        if !self.state.is_allowed_participant(participant_id) {
            return;
        }

        let fired = {
            let Some(team) = self.state.teams.get_mut(&participant_id) else {
                return;
            };
            let Some(bird) = team.current_bird_mut(true) else {
                warn!(session_id = %self.id, participant = %participant_id, "fire from a dead bird");
                return;
            };

            bird.movement.x = packet.x;
            bird.movement.y = packet.y;
            bird.movement.angle = Some(packet.angle);

            if team.weapons.fire(packet.impulse) {
                // A non-toggleable activation ends this team's ability to
                // act for the rest of the turn.
                team.allowed = team.weapons.current().kind.is_toggleable();
                true
            } else {
                false
            }
        };

        if fired {
            // Extend the turn by a full interval so consensus resolution
            // can complete before a forced advance cuts it off.
            self.clock.reset();
        }

        if let Some(team) = self.state.teams.get(&participant_id) {
            debug!(
                session_id = %self.id,
                participant = %participant_id,
                selected = team.weapons.selected,
                ammo = team.weapons.current().ammo,
                status = ?team.weapons.status,
                "weapon state"
            );
        }

        self.broadcast_patch();
    }

    /// Resolve a batch of client-reported hits through the consensus ledger
    fn handle_damage_report(&mut self, reporter: Uuid, claims: &[DamageClaim]) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_live() {
            return;
        }
        if !self.state.teams.contains_key(&reporter) {
            return;
        }
        if claims.is_empty() {
            return;
        }

        let mut applied = false;

        for claim in claims {
            if !self.state.teams.contains_key(&claim.participant_id) {
                continue;
            }

            let fingerprint = damage_fingerprint(claim);
            let authority = self.state.random_participant_id(&mut self.rng);
            let from_authority = authority == Some(reporter);

            match self.hits.observe(fingerprint.clone(), claim.clone(), from_authority) {
                Verdict::Resolved(hit) => {
                    info!(
                        session_id = %self.id,
                        reporter = %reporter,
                        fingerprint = %fingerprint,
                        from_authority,
                        "damage applied"
                    );

                    if let Some(team) = self.state.teams.get_mut(&hit.participant_id) {
                        // Damage on the active bird closes the target team's
                        // input for the rest of the turn.
                        let hit_current =
                            hit.bird_slot < team.birds.len() && hit.bird_slot == team.active_bird;
                        if hit_current {
                            team.allowed = false;
                        }
                        if let Some(bird) = team.birds.get_mut(hit.bird_slot) {
                            bird.hit(hit.damage);
                        }
                        team.update_points();
                        team.hits.push(claims.to_vec());
                        applied = true;
                    }
                }
                Verdict::Pending | Verdict::AlreadyApplied => {}
            }
        }

        if applied {
            self.broadcast_patch();
            // The damage flash renders exactly once: clear the transient
            // display so later patches do not repeat it.
            for team in self.state.teams.values_mut() {
                for bird in &mut team.birds {
                    bird.damage = 0;
                }
            }
            self.check_winner();
        }
    }

    /// Resolve a client-reported explosion through the consensus ledger
    fn handle_explosion_report(&mut self, reporter: Uuid, report: ExplosionReport) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_live() {
            return;
        }
        if !self.state.teams.contains_key(&reporter) {
            return;
        }

        let fingerprint = explosion_fingerprint(&report.args);
        let authority = self.state.random_participant_id(&mut self.rng);
        let from_authority = authority == Some(reporter);

        match self.explosions.observe(fingerprint.clone(), report, from_authority) {
            Verdict::Resolved(report) => {
                info!(
                    session_id = %self.id,
                    reporter = %reporter,
                    fingerprint = %fingerprint,
                    from_authority,
                    "explosion applied"
                );

                // The reporter's physics already moved every bird; fold the
                // post-explosion poses into the authoritative state.
                self.apply_position_snapshots(&report.positions);
                self.broadcast_patch();

                if let Some(team) = self.state.teams.get_mut(&reporter) {
                    team.explosions.push(report.clone());
                }

                self.broadcast(ServerMsg::Explosion { args: report.args });
            }
            Verdict::Pending | Verdict::AlreadyApplied => {}
        }
    }

    /// Turn-advance vote; the last vote's position snapshots win
    fn handle_ready_next(
        &mut self,
        participant_id: Uuid,
        positions: &HashMap<Uuid, Vec<PositionPacket>>,
    ) {
        if self.winner.is_some() {
            return;
        }
        if !self.state.is_live() {
            return;
        }

        {
            let Some(team) = self.state.teams.get_mut(&participant_id) else {
                return;
            };
            team.ready_next = true;
        }

        if self.state.teams.values().all(|t| t.ready_next) {
            for team in self.state.teams.values_mut() {
                team.ready_next = false;
            }
            self.clock.reset();

            debug!(session_id = %self.id, participant = %participant_id, "all ready");

            self.apply_position_snapshots(positions);
            self.broadcast_patch();

            self.advance_at = Some(Instant::now() + self.config.ready_delay);
        }
    }

    fn apply_position_snapshots(&mut self, positions: &HashMap<Uuid, Vec<PositionPacket>>) {
        for (participant_id, poses) in positions {
            let Some(team) = self.state.teams.get_mut(participant_id) else {
                continue;
            };
            for (slot, pose) in poses.iter().enumerate() {
                if let Some(bird) = team.birds.get_mut(slot) {
                    bird.movement.x = pose.x;
                    bird.movement.y = pose.y;
                    bird.movement.vx = pose.vx;
                    bird.movement.vy = pose.vy;
                }
            }
        }
    }

    /// Advance the turn: also the forced-timeout action of the round clock.
    ///
    /// Win evaluation runs first, so all-dead teams are removed before the
    /// next-team search and the search cannot spin.
    fn advance_turn(&mut self) {
        if self.state.turn_order.is_empty() {
            return;
        }
        if self.check_winner() {
            return;
        }

        info!(
            session_id = %self.id,
            round = self.round_index,
            current = ?self.state.active_participant_id(),
            "NEXT TURN"
        );

        self.round_index += 1;

        self.state.next_team();
        if let Some(team) = self.state.active_team_mut() {
            team.next_bird();
        }

        for team in self.state.teams.values_mut() {
            team.allowed = true;
            team.ready_next = false;
            team.weapons.deactivate();
            for bird in &mut team.birds {
                bird.movement.reset_intents();
            }
        }

        self.hits.clear();
        self.explosions.clear();

        let active_bird = self
            .state
            .active_team()
            .map(|t| t.active_bird)
            .unwrap_or(0);
        self.broadcast(ServerMsg::TurnChanged {
            active_participant: self.state.active_player,
            active_bird,
        });
    }

    /// Consult the win evaluator; on a winner the match becomes terminal
    fn check_winner(&mut self) -> bool {
        if self.winner.is_some() {
            return true;
        }

        if let Some(winner) = self.state.find_winner() {
            info!(session_id = %self.id, winner = %winner, "WINNER");
            self.winner = Some(winner);
            self.member_count
                .store(self.state.teams.len(), Ordering::Relaxed);
            self.broadcast(ServerMsg::Winner {
                participant_id: winner,
            });
            self.clock.pause();
            self.advance_at = None;
            return true;
        }

        false
    }

    /// Tear down: cancel timers, release state, notify clients
    fn dispose(&mut self) {
        info!(session_id = %self.id, teams = self.state.teams.len(), "DISPOSE");

        self.clock.pause();
        self.resume_at = None;
        self.advance_at = None;

        for team in self.state.teams.values_mut() {
            team.birds.clear();
        }
        self.state.teams.clear();
        self.state.turn_order.clear();
        self.member_count.store(0, Ordering::Relaxed);

        self.broadcast(ServerMsg::SessionDisposed);
    }

    fn broadcast(&self, msg: ServerMsg) {
        let _ = self.events_tx.send(msg);
    }

    fn broadcast_patch(&self) {
        let _ = self.events_tx.send(ServerMsg::StatePatch {
            state: self.state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::roster::RosterBird;
    use crate::ws::protocol::{ExplosionArgs, Point};

    const HOLY_GRENADE: usize = 4;

    fn sample_birds(count: usize) -> Vec<RosterBird> {
        (0..count)
            .map(|i| RosterBird {
                bird_type: 0,
                name: Some(format!("Bird {}", i)),
                is_egg: false,
                attributes: Default::default(),
            })
            .collect()
    }

    fn seeded_store(credentials: &[&str]) -> Arc<RosterStore> {
        let store = Arc::new(RosterStore::new());
        for credential in credentials {
            store.cache_roster(credential, sample_birds(2), 2);
        }
        store
    }

    async fn live_one_on_one() -> (GameSession, Uuid, Uuid) {
        let store = seeded_store(&["cred-a", "cred-b"]);
        let (mut session, _handle) = GameSession::new(SessionMode::OneOnOne, 42, store);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        session.handle_join(a, "cred-a").await.unwrap();
        session.handle_join(b, "cred-b").await.unwrap();
        assert!(session.state.is_live());

        (session, a, b)
    }

    #[tokio::test]
    async fn test_join_rejected_when_live() {
        let (mut session, _, _) = live_one_on_one().await;

        let late = Uuid::new_v4();
        assert!(matches!(
            session.handle_join(late, "cred-a").await,
            Err(JoinError::SessionLive)
        ));
        assert_eq!(session.state.teams.len(), 2);
    }

    #[tokio::test]
    async fn test_join_rejected_without_roster() {
        let store = seeded_store(&[]);
        let (mut session, _handle) = GameSession::new(SessionMode::OneOnOne, 42, store);

        let result = session.handle_join(Uuid::new_v4(), "unknown").await;
        assert!(matches!(result, Err(JoinError::RosterNotFound)));
        assert!(session.state.teams.is_empty());
    }

    #[tokio::test]
    async fn test_joined_teams_get_distinct_colors_and_spawns() {
        let (session, a, b) = live_one_on_one().await;

        let team_a = session.state.teams.get(&a).unwrap();
        let team_b = session.state.teams.get(&b).unwrap();
        assert_ne!(team_a.color, team_b.color);

        let mut spawns: Vec<(i64, i64)> = session
            .state
            .teams
            .values()
            .flat_map(|t| t.birds.iter())
            .map(|bird| (bird.spawn.x as i64, bird.spawn.y as i64))
            .collect();
        let total = spawns.len();
        spawns.sort_unstable();
        spawns.dedup();
        assert_eq!(spawns.len(), total);
    }

    #[tokio::test]
    async fn test_move_correction_requires_turn_holder() {
        let (mut session, a, b) = live_one_on_one().await;
        let holder = session.state.active_participant_id().unwrap();
        let other = if holder == a { b } else { a };

        let packet = MoveCorrection {
            walk: 1,
            jump: 0,
            aim: 0,
            angle: 10.0,
            x: 5.0,
            y: 5.0,
            vx: 0.0,
            vy: 0.0,
        };

        session.handle_move(other, &packet);
        let bird = session.state.teams.get(&other).unwrap().current_bird(false).unwrap();
        assert_eq!(bird.movement.walk, 0);

        session.handle_move(holder, &packet);
        let bird = session.state.teams.get(&holder).unwrap().current_bird(false).unwrap();
        assert_eq!(bird.movement.walk, 1);
    }

    #[tokio::test]
    async fn test_full_round_trip() {
        let (mut session, a, b) = live_one_on_one().await;

        let first = session.state.active_participant_id().unwrap();
        let second = if first == a { b } else { a };

        // Fire a non-toggleable weapon with a single shot of ammo.
        session.handle_weapon_select(first, HOLY_GRENADE);
        session.handle_weapon_fire(
            first,
            &WeaponFirePacket {
                x: 120.0,
                y: 300.0,
                angle: 30.0,
                impulse: 0.8,
            },
        );

        let shooter = session.state.teams.get(&first).unwrap();
        assert_eq!(shooter.weapons.selected, HOLY_GRENADE);
        assert_eq!(shooter.weapons.current().ammo, 0);
        assert!(shooter.weapons.is_active());
        assert!(!shooter.allowed);

        // Both clients corroborate the same hit; it applies exactly once.
        let claims = vec![DamageClaim {
            participant_id: second,
            bird_slot: 0,
            damage: 40,
        }];
        session.handle_damage_report(first, &claims);
        session.handle_damage_report(second, &claims);

        let target = &session.state.teams.get(&second).unwrap().birds[0];
        assert_eq!(target.health, 60);
        // The transient damage display was cleared after the patch.
        assert_eq!(target.damage, 0);
        assert_eq!(session.state.teams.get(&second).unwrap().points, 160);

        // Stale duplicates change nothing.
        session.handle_damage_report(first, &claims);
        assert_eq!(session.state.teams.get(&second).unwrap().birds[0].health, 60);

        // Advance resets activation and intents but never restores ammo.
        session.advance_turn();

        let shooter = session.state.teams.get(&first).unwrap();
        assert!(!shooter.weapons.is_active());
        assert_eq!(shooter.weapons.slots[HOLY_GRENADE].ammo, 0);
        assert!(shooter.allowed);
        assert_eq!(session.state.active_participant_id(), Some(second));
        assert_eq!(session.state.teams.get(&second).unwrap().active_bird, 1);
    }

    #[tokio::test]
    async fn test_explosion_consensus_applies_position_corrections() {
        let (mut session, a, b) = live_one_on_one().await;

        let report = ExplosionReport {
            args: ExplosionArgs {
                origin: Point { x: 101.0, y: 52.0 },
                shape: 2,
                kind: 1,
                radius: 60.0,
                power: 0.8,
                caused_by: "bazooka".to_string(),
            },
            positions: HashMap::from([(
                b,
                vec![
                    PositionPacket {
                        angle: 0.0,
                        x: 410.0,
                        y: 260.0,
                        vx: -3.0,
                        vy: 1.5,
                    },
                    PositionPacket {
                        angle: 0.0,
                        x: 500.0,
                        y: 280.0,
                        vx: 2.0,
                        vy: 0.0,
                    },
                ],
            )]),
        };

        session.handle_explosion_report(a, report.clone());
        session.handle_explosion_report(b, report);

        let team_b = session.state.teams.get(&b).unwrap();
        assert_eq!(team_b.birds[0].movement.x, 410.0);
        assert_eq!(team_b.birds[0].movement.vx, -3.0);
        assert_eq!(team_b.birds[1].movement.x, 500.0);
    }

    #[tokio::test]
    async fn test_elimination_by_damage_yields_winner() {
        let (mut session, a, b) = live_one_on_one().await;
        let first = session.state.active_participant_id().unwrap();
        let second = if first == a { b } else { a };

        for slot in 0..2 {
            let claims = vec![DamageClaim {
                participant_id: second,
                bird_slot: slot,
                damage: 100,
            }];
            session.handle_damage_report(first, &claims);
            session.handle_damage_report(second, &claims);
        }

        assert_eq!(session.winner, Some(first));
        assert!(session.clock.is_paused());
        // The match is terminal: further advances keep the winner in place.
        session.advance_turn();
        assert_eq!(session.winner, Some(first));
    }

    #[tokio::test]
    async fn test_leave_of_turn_holder_forces_advance() {
        let store = seeded_store(&["c1", "c2", "c3", "c4"]);
        let (mut session, _handle) = GameSession::new(SessionMode::TwoOnTwo, 7, store);

        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            session
                .handle_join(*id, &format!("c{}", i + 1))
                .await
                .unwrap();
        }
        assert!(session.state.is_live());

        let holder = session.state.active_participant_id().unwrap();
        let holder_idx = session
            .state
            .turn_order
            .iter()
            .position(|id| *id == holder)
            .unwrap();
        let successor = session.state.turn_order[(holder_idx + 1) % 4];

        session.handle_leave(holder);

        assert_eq!(session.state.teams.len(), 3);
        assert_eq!(session.state.active_participant_id(), Some(successor));
        assert!(session.winner.is_none());
    }

    #[tokio::test]
    async fn test_all_ready_vote_schedules_advance() {
        let (mut session, a, b) = live_one_on_one().await;

        session.handle_ready_next(a, &HashMap::new());
        assert!(session.advance_at.is_none());
        assert!(session.state.teams.get(&a).unwrap().ready_next);

        session.handle_ready_next(b, &HashMap::new());
        assert!(session.advance_at.is_some());
        assert!(session.state.teams.values().all(|t| !t.ready_next));
    }
}
