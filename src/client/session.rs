use std::time::Duration;

use futures_lite::future;
use serde_json::Value;

use crate::{
    logging::{debug, trace, warning},
    protocol::{self, Frame, FrameType},
    Cancellation, Error,
};

use super::{
    connection::{Connection, Message},
    keepalive,
    subscription_id::SubscriptionId,
};

/// How long shutdown may spend on the courtesy `complete` & close before
/// the socket is simply dropped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle of the one connection behind a subscription.
///
/// Connecting happens before a session exists, so a session starts out `Open`.
/// States only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Open,
    AwaitingAck,
    Acked,
    Subscribed(SubscriptionId),
    Closing,
    Closed,
}

impl ConnectionState {
    fn rank(self) -> u8 {
        match self {
            ConnectionState::Open => 0,
            ConnectionState::AwaitingAck => 1,
            ConnectionState::Acked => 2,
            ConnectionState::Subscribed(_) => 3,
            ConnectionState::Closing => 4,
            ConnectionState::Closed => 5,
        }
    }
}

/// Owns the connection for a single subscription & drives it from the
/// handshake through to shutdown.
///
/// Everything happens on one sequential path: reads, and every write
/// (init, subscribe, pong, complete) are issued in turn, so there's never more
/// than one writer.
pub(crate) struct Session<Conn> {
    pub(super) connection: Conn,
    pub(super) cancellation: Cancellation,
    state: ConnectionState,
}

/// What to do with a frame that arrived after the subscription started
enum Step {
    Continue,
    Data(Value),
    Report(Error),
    Complete,
}

impl<Conn> Session<Conn>
where
    Conn: Connection,
{
    pub(crate) fn new(connection: Conn, cancellation: Cancellation) -> Self {
        Session {
            connection,
            cancellation,
            state: ConnectionState::Open,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(super) fn advance(&mut self, next: ConnectionState) {
        debug_assert!(
            next.rank() >= self.state.rank(),
            "connection can't go from {:?} back to {:?}",
            self.state,
            next
        );
        trace!("connection state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub(super) async fn send_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        trace!("sending {:?} frame", frame.kind);
        self.connection.send(Message::frame(frame)?).await
    }

    /// Sends `subscribe` for the operation.  Only valid once the handshake is acked.
    pub(crate) async fn start(&mut self, payload: Value) -> Result<SubscriptionId, Error> {
        debug_assert_eq!(self.state, ConnectionState::Acked);

        if self.cancellation.is_cancelled() {
            self.close().await;
            return Err(Error::Cancelled);
        }

        let id = SubscriptionId::next();
        if let Err(error) = self.send_frame(&Frame::subscribe(id.to_string(), payload)).await {
            self.close().await;
            return Err(error);
        }

        debug!("subscription {id} started");
        self.advance(ConnectionState::Subscribed(id));
        Ok(id)
    }

    /// Waits for the next result of the subscription.
    ///
    /// Non fatal errors are returned with the session still running, after a
    /// fatal one the connection is closed & the session is finished.
    /// Returns `None` once the server completes the subscription.
    pub(crate) async fn next_event(&mut self) -> Option<Result<Value, Error>> {
        let ConnectionState::Subscribed(id) = self.state else {
            return None;
        };

        loop {
            if self.cancellation.is_cancelled() {
                return Some(Err(self.cancel().await));
            }

            let connection = &mut self.connection;
            let cancellation = &self.cancellation;
            let received = future::or(async { Some(connection.receive().await) }, async {
                cancellation.cancelled().await;
                None
            })
            .await;

            let step = match received {
                None => return Some(Err(self.cancel().await)),
                Some(Ok(message)) => self.handle_message(id, message).await,
                Some(Err(error)) => Err(error),
            };

            match step {
                Ok(Step::Continue) => {}
                Ok(Step::Data(data)) => return Some(Ok(data)),
                Ok(Step::Report(error)) => return Some(Err(error)),
                Ok(Step::Complete) => {
                    debug!("subscription {id} completed by the server");
                    self.close().await;
                    return None;
                }
                Err(error) => {
                    warning!("subscription {id} failed: {error}");
                    self.close().await;
                    return Some(Err(error));
                }
            }
        }
    }

    async fn handle_message(&mut self, id: SubscriptionId, message: Message) -> Result<Step, Error> {
        let text = match message {
            Message::Text(text) => text,
            Message::Close { code, reason } => return Err(closed_by_server(code, reason)),
            Message::Ping | Message::Pong => return Ok(Step::Continue),
        };

        let Some(frame) = protocol::decode_inbound(&text)? else {
            warning!("ignoring frame of unknown type: {text}");
            return Ok(Step::Continue);
        };
        trace!("received {:?} frame", frame.kind);

        if frame.kind != FrameType::Ping && !belongs_to(&frame, id) {
            warning!("ignoring {:?} frame for unknown subscription {:?}", frame.kind, frame.id);
            return Ok(Step::Continue);
        }

        match frame.kind {
            FrameType::Ping => {
                keepalive::respond(&mut self.connection, frame.payload).await?;
                Ok(Step::Continue)
            }
            FrameType::Pong => Ok(Step::Continue),
            FrameType::Next => match frame.next_payload() {
                Ok(payload) if payload.errors.is_empty() => Ok(Step::Data(payload.data)),
                Ok(payload) => Ok(Step::Report(Error::Application(payload.errors))),
                Err(error) => Ok(Step::Report(error)),
            },
            FrameType::Error => Ok(Step::Report(Error::Subscription(frame.payload))),
            FrameType::Complete => Ok(Step::Complete),
            FrameType::ConnectionAck | FrameType::ConnectionInit | FrameType::Subscribe => {
                warning!("ignoring unexpected {:?} frame", frame.kind);
                Ok(Step::Continue)
            }
        }
    }

    /// Stops the session on behalf of the caller.
    ///
    /// The `complete` is best effort, closing the socket always happens.
    async fn cancel(&mut self) -> Error {
        if let ConnectionState::Subscribed(id) = self.state {
            debug!("subscription {id} cancelled, sending complete");
            self.advance(ConnectionState::Closing);

            let frame = Frame::complete(id.to_string());
            let sent = future::or(self.send_frame(&frame), async {
                futures_timer::Delay::new(SHUTDOWN_GRACE).await;
                Err(Error::Send("timed out".into()))
            })
            .await;

            if let Err(_error) = sent {
                trace!("couldn't send complete: {_error}");
            }
        }

        self.close().await;
        Error::Cancelled
    }

    /// Closes the socket.  Safe to call in any state, does nothing once closed.
    pub(crate) async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.advance(ConnectionState::Closing);

        future::or(self.connection.close(), async {
            futures_timer::Delay::new(SHUTDOWN_GRACE).await;
            trace!("timed out closing the websocket");
        })
        .await;

        self.advance(ConnectionState::Closed);
    }
}

/// Frames for our subscription either name it or carry no id at all.
fn belongs_to(frame: &Frame, id: SubscriptionId) -> bool {
    match &frame.id {
        Some(frame_id) => *frame_id == id.to_string(),
        None => true,
    }
}

pub(super) fn closed_by_server(code: Option<u16>, reason: Option<String>) -> Error {
    Error::TransportRead(format!(
        "connection closed by server, code: {}, reason: {}",
        code.unwrap_or_default(),
        reason.unwrap_or_default()
    ))
}
