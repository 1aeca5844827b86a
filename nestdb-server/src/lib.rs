//! Server process pieces, exported so the integration tests can drive a
//! real listener.

pub mod server;

pub use server::{Server, ServerState};
