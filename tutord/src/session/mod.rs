//! Session management for the tutor
//!
//! Sessions carry the conversation history between requests. The `SessionStore`
//! trait is implemented by an in-memory store, a durable key/value store, and a
//! failover store that starts on the durable one and drops to memory if it fails.

pub mod adapters;
pub mod failover;
mod locks;
pub mod store;

pub use adapters::{DurableSessionStore, InMemorySessionStore, KeyValueBackend, RedisBackend};
pub use failover::FailoverSessionStore;
pub use store::{Session, SessionStore, SessionStoreError, SessionStoreRef, SessionUpdate};
