//! Persistence contract consumed by the lifecycle services, plus the bundled
//! in-memory backend.

pub mod game_store;
pub mod models;
pub mod storage;
