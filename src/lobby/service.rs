//! Lobby service - routes connections into sessions

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;
use uuid::Uuid;

use crate::game::{
    GameSession, JoinError, JoinRequest, SessionHandle, SessionInput, SessionMode, SessionRegistry,
};
use crate::store::RosterStore;
use crate::ws::protocol::ServerMsg;

/// Finds or creates sessions and wires member channels to them
pub struct LobbyService {
    registry: Arc<SessionRegistry>,
    roster_store: Arc<RosterStore>,
    /// Connected members currently seated in a session
    member_sessions: Arc<DashMap<Uuid, Uuid>>,
}

impl LobbyService {
    pub fn new(registry: Arc<SessionRegistry>, roster_store: Arc<RosterStore>) -> Self {
        Self {
            registry,
            roster_store,
            member_sessions: Arc::new(DashMap::new()),
        }
    }

    /// Seat a connection in an open session of the requested mode,
    /// spawning a fresh session when none has room.
    ///
    /// The session re-validates admission authoritatively; a rejected join
    /// is surfaced to the caller and nothing is registered.
    pub async fn place(
        &self,
        participant_id: Uuid,
        mode: SessionMode,
        credential: String,
    ) -> Result<(mpsc::Sender<SessionInput>, broadcast::Receiver<ServerMsg>), JoinError> {
        let handle = match self.registry.find_open(mode) {
            Some(handle) => handle,
            None => self.spawn_session(mode),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .input_tx
            .send(SessionInput::Join(JoinRequest {
                participant_id,
                credential,
                reply: reply_tx,
            }))
            .await
            .map_err(|_| JoinError::SessionClosed)?;

        let admitted = reply_rx.await.map_err(|_| JoinError::SessionClosed)?;
        admitted?;

        self.member_sessions.insert(participant_id, handle.id);

        Ok((handle.input_tx.clone(), handle.events_tx.subscribe()))
    }

    fn spawn_session(&self, mode: SessionMode) -> SessionHandle {
        let seed = rand::random::<u64>();
        let (session, handle) = GameSession::new(mode, seed, self.roster_store.clone());

        self.registry.insert(handle.clone());

        info!(session_id = %handle.id, mode = ?mode, "Created new session");

        let registry = self.registry.clone();
        let member_sessions = self.member_sessions.clone();
        let session_id = handle.id;

        tokio::spawn(async move {
            session.run().await;

            registry.remove(&session_id);
            member_sessions.retain(|_, sid| *sid != session_id);

            info!(session_id = %session_id, "Session removed from registry");
        });

        handle
    }

    /// Called when a connection drops; the session sees a leave
    pub async fn disconnect(&self, participant_id: Uuid) {
        if let Some((_, session_id)) = self.member_sessions.remove(&participant_id) {
            if let Some(handle) = self.registry.get(&session_id) {
                let _ = handle
                    .input_tx
                    .send(SessionInput::Leave { participant_id })
                    .await;
            }
        }

        info!(participant = %participant_id, "Member unregistered from lobby");
    }
}
