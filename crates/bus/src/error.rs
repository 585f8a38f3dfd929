use thiserror::Error;

/// Errors raised by the bus client.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid endpoint '{0}'")]
    Endpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
