//! Roster storage and upstream API integration

pub mod birds_api;
pub mod roster;

pub use birds_api::BirdsApiClient;
pub use roster::RosterStore;
