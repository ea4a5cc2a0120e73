//! Fanout distribution subsystem
//!
//! Takes newly created posts off the durable fanout queue and propagates
//! them into every follower's timeline (cache + durable store),
//! asynchronously and with at-least-once delivery.

mod ports;
mod worker;

pub use ports::{FanoutQueueStore, FollowerLookup, TimelineCacheStore, TimelineStore};
pub use worker::FanoutWorker;
