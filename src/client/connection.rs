use std::future::Future;

use crate::{
    protocol::{self, Frame},
    Error,
};

/// Abstraction around a websocket connection.
///
/// A built in implementation is provided for `tungstenite` based streams,
/// including the ones returned by [`crate::connect`].
///
/// If users wish to add support for a new client they should implement this trait.
pub trait Connection {
    /// Receive the next message on this connection.
    ///
    /// Should fail with [`Error::TransportRead`] once the socket is closed or broken.
    /// Must be safe to drop before it resolves.
    fn receive(&mut self) -> impl Future<Output = Result<Message, Error>> + Send;

    /// Send a message with on connection
    fn send(&mut self, message: Message) -> impl Future<Output = Result<(), Error>> + Send;

    /// Close the underlying socket.
    ///
    /// This is called at most once per subscription but implementations should
    /// tolerate repeated calls.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// A websocket message
///
/// Websocket client libraries usually provide their own version of this struct.
/// The [Connection] trait for a given client should handle translation to & from this enum.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// A message containing the given text payload
    Text(String),
    /// A message that closes the connection with the given code & reason
    Close {
        /// The status code for this close message
        code: Option<u16>,
        /// Some text explaining the reason the connection is being closed
        reason: Option<String>,
    },
    /// A websocket level ping
    Ping,
    /// A websocket level reply to a ping
    Pong,
}

impl Message {
    /// Encodes a protocol frame into a text message
    pub fn frame(frame: &Frame) -> Result<Self, Error> {
        Ok(Message::Text(protocol::encode(frame)?))
    }
}
