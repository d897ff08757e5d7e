//! Process-wide services shared by every request

pub mod auth;
pub mod pubsub;

pub use auth::{AuthConfig, AuthService};
pub use pubsub::{HubEvent, PubSub, Topic};
