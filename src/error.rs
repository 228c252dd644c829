use std::time::Duration;

use serde_json::Value;

#[derive(thiserror::Error, Debug, Clone)]
/// Error type
pub enum Error {
    /// The websocket could not be opened: DNS, TLS, the HTTP upgrade or the
    /// connect timeout failed.
    #[error("couldn't connect to the websocket endpoint: {0}")]
    Connect(String),
    /// The server never sent `connection_ack`
    #[error("graphql ws: timeout waiting for connection_ack after {0:?}")]
    HandshakeTimeout(Duration),
    /// The server sent an `error` frame before acknowledging the connection
    #[error("graphql ws: connection error before ack")]
    ConnectionError(Option<Value>),
    /// A `next` frame carried a non-empty `errors` list
    #[error("subscription error: {}", join_errors(.0))]
    Application(Vec<Value>),
    /// The server sent an `error` frame for the running subscription
    #[error("subscription error frame")]
    Subscription(Option<Value>),
    /// The socket closed or broke while reading
    #[error("transport read error: {0}")]
    TransportRead(String),
    /// The caller cancelled the subscription
    #[error("subscription cancelled")]
    Cancelled,
    /// An inbound frame could not be decoded
    #[error("message decode error, reason: {0}")]
    Decode(String),
    /// A data payload didn't match the operation's response type
    #[error("couldn't decode subscription payload, reason: {0}")]
    Payload(String),
    /// Serializing error
    #[error("couldn't serialize message, reason: {0}")]
    Serializing(String),
    /// Sending error
    #[error("message sending error, reason: {0}")]
    Send(String),
}

impl Error {
    /// Whether this error ends the subscription.
    ///
    /// Application level errors are reported but the stream keeps flowing,
    /// everything else tears the connection down.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Application(_) | Error::Subscription(_) | Error::Payload(_)
        )
    }
}

fn join_errors(errors: &[Value]) -> String {
    errors
        .iter()
        .map(|error| match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_owned(),
            None => error.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
