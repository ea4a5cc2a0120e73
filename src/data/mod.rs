//! Data layer module
//!
//! Handles all data persistence and caching:
//! - SQLite database operations (users, posts, followers, fanout queue,
//!   durable timeline store)
//! - Timeline cache (volatile)

mod cache;
mod database;
mod models;

pub use cache::TimelineCache;
pub use database::Database;
pub use models::*;
