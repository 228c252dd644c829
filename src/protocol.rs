//! Frame definitions for the [graphql-transport-ws protocol][1]
//!
//! Every message on the socket is a JSON envelope of the form
//! `{"id"?: string, "type": string, "payload"?: any}`.  Payloads are kept as
//! opaque JSON, interpreting them is left to the operation that asked for them.
//!
//! [1]: https://github.com/enisdenjo/graphql-ws/blob/HEAD/PROTOCOL.md

use serde::{
    de::{value::StrDeserializer, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;

use crate::Error;

/// The `type` of a frame.  Anything outside this set fails to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// client -> server, opens the handshake
    ConnectionInit,
    /// server -> client, completes the handshake
    ConnectionAck,
    /// client -> server, starts an operation
    Subscribe,
    /// server -> client, a result for an operation
    Next,
    /// server -> client, the operation (or connection) failed
    Error,
    /// either direction, the operation is finished
    Complete,
    /// either direction
    Ping,
    /// either direction, answers a ping
    Pong,
}

/// A single graphql-transport-ws message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The operation this frame belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// What kind of frame this is
    #[serde(rename = "type")]
    pub kind: FrameType,
    /// The undecoded payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Frame {
    /// A `connection_init` frame.  The payload defaults to an empty object.
    pub fn connection_init(payload: Option<Value>) -> Self {
        Frame {
            id: None,
            kind: FrameType::ConnectionInit,
            payload: Some(payload.unwrap_or_else(|| Value::Object(Default::default()))),
        }
    }

    /// A `subscribe` frame for the given operation payload.
    pub fn subscribe(id: String, payload: Value) -> Self {
        Frame {
            id: Some(id),
            kind: FrameType::Subscribe,
            payload: Some(payload),
        }
    }

    /// A `pong` echoing the payload of the ping it answers.
    pub fn pong(payload: Option<Value>) -> Self {
        Frame {
            id: None,
            kind: FrameType::Pong,
            payload,
        }
    }

    /// A `complete` frame for the given subscription.
    pub fn complete(id: String) -> Self {
        Frame {
            id: Some(id),
            kind: FrameType::Complete,
            payload: None,
        }
    }

    /// Interprets the payload of a `next` frame.
    pub fn next_payload(&self) -> Result<NextPayload, Error> {
        match &self.payload {
            None => Ok(NextPayload::default()),
            Some(payload) => NextPayload::deserialize(payload)
                .map_err(|error| Error::Payload(error.to_string())),
        }
    }
}

/// The payload of a `next` frame.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NextPayload {
    /// The result data, left undecoded
    #[serde(default)]
    pub data: Value,
    /// GraphQL errors attached to this result, in the order the server sent them
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Encodes a frame as JSON text.
pub fn encode(frame: &Frame) -> Result<String, Error> {
    serde_json::to_string(frame).map_err(|error| Error::Serializing(error.to_string()))
}

/// Decodes a frame from JSON text.
///
/// Unknown fields are ignored, a missing or unrecognised `type` is an error.
pub fn decode(text: &str) -> Result<Frame, Error> {
    serde_json::from_str(text).map_err(|error| Error::Decode(error.to_string()))
}

/// Decodes a frame read off the socket.
///
/// A JSON object whose `type` is missing or not one we know gives `Ok(None)`
/// so the reader can skip it.  Text that isn't a well formed frame otherwise
/// is still an error.
pub fn decode_inbound(text: &str) -> Result<Option<Frame>, Error> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| Error::Decode(error.to_string()))?;

    let Value::Object(fields) = &value else {
        return Err(Error::Decode(format!("expected a JSON object, got {value}")));
    };

    let known = match fields.get("type") {
        Some(Value::String(kind)) => {
            let kind: StrDeserializer<'_, serde::de::value::Error> =
                kind.as_str().into_deserializer();
            FrameType::deserialize(kind).is_ok()
        }
        Some(_) => true,
        None => false,
    };
    if !known {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|error| Error::Decode(error.to_string()))
}
