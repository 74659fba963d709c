//! Storage backends for sessions

pub mod durable;
pub mod in_memory;
pub mod redis_backend;

pub use durable::{DurableSessionStore, KeyValueBackend};
pub use in_memory::InMemorySessionStore;
pub use redis_backend::RedisBackend;
