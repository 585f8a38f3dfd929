use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket, ZmqMessage};

use crate::error::BusError;
use crate::message::Message;
use crate::traits::{TopicPublisher, TopicSubscriber};
use crate::transport::Transport;

/// ZeroMQ PUB socket.
///
/// Messages go out as two frames: the topic string (for subscriber-side
/// prefix filtering) and the MessagePack-encoded [`Message`].
pub struct ZmqPublisher {
    socket: Mutex<PubSocket>,
}

impl ZmqPublisher {
    /// Connect to a broker frontend.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting PUB socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Bind the endpoint so subscribers can connect directly.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, BusError> {
        transport.ensure_ipc_dir()?;
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding PUB socket");
        socket.bind(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl TopicPublisher for ZmqPublisher {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        let topic = message.topic.clone();
        let frame = message.to_bytes()?;

        let mut zmq_msg = ZmqMessage::from(topic.as_str());
        zmq_msg.push_back(frame.into());

        let mut socket = self.socket.lock().await;
        socket.send(zmq_msg).await?;

        debug!(topic = %topic, event_id = %message.event_id, "published message");
        Ok(())
    }
}

/// ZeroMQ SUB socket. Used by downstream consumers and by tests.
pub struct ZmqSubscriber {
    socket: Mutex<SubSocket>,
}

impl ZmqSubscriber {
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = SubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting SUB socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl TopicSubscriber for ZmqSubscriber {
    /// An empty prefix subscribes to every topic.
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError> {
        let mut socket = self.socket.lock().await;
        socket.subscribe(topic_prefix).await?;
        info!(topic_prefix = %topic_prefix, "subscribed to topic prefix");
        Ok(())
    }

    async fn recv(&self) -> Result<Message, BusError> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;

        // Expect [topic, frame]; tolerate a bare frame.
        let frames: Vec<_> = zmq_msg.iter().collect();
        let frame: &[u8] = match frames.as_slice() {
            [_, frame, ..] => frame.as_ref(),
            [frame] => frame.as_ref(),
            [] => return Err(BusError::Transport("empty ZMQ message".into())),
        };
        let message = Message::from_bytes(frame)?;
        debug!(topic = %message.topic, "received message");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_frame_layout() {
        let topic = crate::topics::COMMIT_NEW;
        let mut msg = ZmqMessage::from(topic);
        msg.push_back(b"frame".to_vec().into());

        let frames: Vec<_> = msg.iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), topic.as_bytes());
        assert_eq!(frames[1].as_ref(), b"frame");
    }
}
