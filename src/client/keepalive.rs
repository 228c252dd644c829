use serde_json::Value;

use crate::{logging::trace, protocol::Frame, Error};

use super::connection::{Connection, Message};

/// Answers a server `ping` with a `pong` carrying the same payload.
///
/// Pings are server driven: we never start one ourselves, and they're valid
/// in every state until the connection is closed.
pub(super) async fn respond<Conn>(connection: &mut Conn, payload: Option<Value>) -> Result<(), Error>
where
    Conn: Connection,
{
    trace!("ping received, sending pong");
    connection.send(Message::frame(&Frame::pong(payload))?).await
}
