//! In-process publish/subscribe hub feeding GraphQL subscriptions.
//!
//! One broadcast channel carries every event; subscribers filter by [Topic].

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::db::{LinkRecord, VoteRecord};

/// Subscription topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NewLink,
    NewVote,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::NewLink => "NEW_LINK",
            Topic::NewVote => "NEW_VOTE",
        }
    }
}

/// An event published on the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    NewLink(LinkRecord),
    NewVote(VoteRecord),
}

impl HubEvent {
    pub fn topic(&self) -> Topic {
        match self {
            HubEvent::NewLink(_) => Topic::NewLink,
            HubEvent::NewVote(_) => Topic::NewVote,
        }
    }
}

/// Process-wide pub/sub handle. Clones share the same channel.
#[derive(Clone)]
pub struct PubSub {
    sender: broadcast::Sender<HubEvent>,
}

impl PubSub {
    /// `capacity` bounds how far a slow subscriber may fall behind before it skips events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will see it
    pub fn publish(&self, event: HubEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(topic = topic.as_str(), receivers, "Published event");
                receivers
            }
            Err(_) => {
                tracing::debug!(topic = topic.as_str(), "Published event with no subscribers");
                0
            }
        }
    }

    /// Stream of events on one topic, starting from the moment of subscription
    pub fn subscribe(&self, topic: Topic) -> impl Stream<Item = HubEvent> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |result| match result {
            Ok(event) if event.topic() == topic => Some(event),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(topic = topic.as_str(), error = %e, "Subscriber lagged");
                None
            }
        })
    }

    /// Number of live subscriptions across all topics
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
