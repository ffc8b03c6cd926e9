//! Backend core for a target-ring elimination game.
//!
//! Every alive participant hunts exactly one other, forming a single
//! directed cycle. This crate owns the maintenance of that cycle
//! (eliminations splice one node out, revivals splice one back in, shuffles
//! rebuild it whole), the lifecycle operations that drive it, the
//! append-only audit log and the rate-limited outbound notification queue.
//! Storage and delivery are injected behind traits.

pub mod config;
pub mod dao;
pub mod error;
pub mod notify;
pub mod ring;
pub mod services;
pub mod state;
