//! nestdb core - document model, path resolution, store and wire protocol
//!
//! This crate provides the building blocks of the nestdb server:
//! - Schemaless JSON value tree ([`document`])
//! - Key addressing and path resolution ([`path`])
//! - The locked, write-through document store ([`store`])
//! - Length-prefixed JSON wire protocol ([`protocol`])
//! - Per-connection request handling ([`connection`])

pub mod connection;
pub mod document;
pub mod path;
pub mod protocol;
pub mod store;

pub use connection::Outcome;
pub use document::{Object, Value};
pub use path::Key;
pub use protocol::{Request, Response, Status};
pub use store::{Store, StoreError};
