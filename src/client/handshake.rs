use std::time::Duration;

use futures_lite::future;
use serde_json::Value;

use crate::{
    logging::{trace, warning},
    protocol::{self, Frame, FrameType},
    Error,
};

use super::{
    connection::{Connection, Message},
    keepalive,
    session::{closed_by_server, ConnectionState, Session},
};

impl<Conn> Session<Conn>
where
    Conn: Connection,
{
    /// Sends `connection_init` & waits for the server to ack it.
    ///
    /// The wait is bounded by `timeout` and the session's cancellation.  Any
    /// failure closes the connection, nothing is retried.
    pub(crate) async fn handshake(
        &mut self,
        payload: Option<Value>,
        timeout: Duration,
    ) -> Result<(), Error> {
        debug_assert_eq!(self.state(), ConnectionState::Open);

        if self.cancellation.is_cancelled() {
            self.close().await;
            return Err(Error::Cancelled);
        }

        self.advance(ConnectionState::AwaitingAck);
        if let Err(error) = self.send_frame(&Frame::connection_init(payload)).await {
            self.close().await;
            return Err(error);
        }

        let connection = &mut self.connection;
        let cancellation = &self.cancellation;
        let acked = wait_for_ack(connection);
        let timed_out = async {
            futures_timer::Delay::new(timeout).await;
            Err(Error::HandshakeTimeout(timeout))
        };
        let cancelled = async {
            cancellation.cancelled().await;
            Err(Error::Cancelled)
        };

        let result = future::or(acked, future::or(cancelled, timed_out)).await;
        match result {
            Ok(()) => {
                trace!("connection_ack received, handshake completed");
                self.advance(ConnectionState::Acked);
                Ok(())
            }
            Err(error) => {
                warning!("handshake failed: {error}");
                self.close().await;
                Err(error)
            }
        }
    }
}

async fn wait_for_ack<Conn>(connection: &mut Conn) -> Result<(), Error>
where
    Conn: Connection,
{
    loop {
        let text = match connection.receive().await? {
            Message::Text(text) => text,
            Message::Close { code, reason } => return Err(closed_by_server(code, reason)),
            Message::Ping | Message::Pong => continue,
        };

        let Some(frame) = protocol::decode_inbound(&text)? else {
            warning!("ignoring frame of unknown type received before ack: {text}");
            continue;
        };
        match frame.kind {
            FrameType::ConnectionAck => return Ok(()),
            // pings can be sent at any time
            FrameType::Ping => keepalive::respond(connection, frame.payload).await?,
            FrameType::Error => return Err(Error::ConnectionError(frame.payload)),
            FrameType::Next | FrameType::Complete | FrameType::Pong => {
                trace!("ignoring {:?} frame received before ack", frame.kind);
            }
            FrameType::ConnectionInit | FrameType::Subscribe => {
                warning!("ignoring unexpected {:?} frame", frame.kind);
            }
        }
    }
}
