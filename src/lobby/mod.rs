//! Session directory and member routing

pub mod service;

pub use service::LobbyService;
