//! Core types: message envelope and connection state

pub mod message;
pub mod state;

pub use message::{kinds, Message};
pub use state::{ConnectionState, SharedState};
