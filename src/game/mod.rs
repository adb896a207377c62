//! Match simulation modules

pub mod arena;
pub mod bird;
pub mod clock;
pub mod consensus;
pub mod session;
pub mod state;
pub mod team;
pub mod weapons;

pub use session::{
    GameSession, JoinError, JoinRequest, SessionHandle, SessionInput, SessionMode, SessionRegistry,
};
