use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BusError;
use crate::message::Message;

/// Publishes topic-addressed messages to the bus.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// Publish a message. Subscribers filter by the message's topic.
    async fn publish(&self, message: Message) -> Result<(), BusError>;
}

/// Blanket implementation so `Arc<dyn TopicPublisher>` can be used directly.
#[async_trait]
impl<T: TopicPublisher + ?Sized> TopicPublisher for Arc<T> {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        (**self).publish(message).await
    }
}

/// Receives messages matching topic prefixes.
#[async_trait]
pub trait TopicSubscriber: Send + Sync {
    /// Subscribe to messages with topics matching the given prefix.
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError>;

    /// Receive the next message. Blocks until a message is available.
    async fn recv(&self) -> Result<Message, BusError>;
}
