//! Typed event bus.
//!
//! Three delivery patterns share one router:
//! - topic publish to every subscriber ([`EventBus::publish`]),
//! - addressed request/response to one recipient ([`EventBus::send_event`]),
//! - topic-independent broadcast ([`EventBus::broadcast`]).
//!
//! Recipients are opaque [`SubscriberId`] handles minted by
//! [`EventBus::register`].
mod bus;
mod payload;
mod topic;

pub use bus::{BroadcastHandler, EventBus, Handler, Reply, SubscriberId};
pub use payload::Payload;
pub use topic::Topic;
