//! An in memory stand in for a graphql-transport-ws server.
//!
//! Tests script the server side frame by frame while the client under test
//! runs against the other half of the pair.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use backboard_subscriptions::{Connection, Error, Message};
use serde_json::{json, Value};

pub struct MockConnection {
    incoming: async_channel::Receiver<Message>,
    outgoing: async_channel::Sender<Message>,
    closed: Arc<AtomicBool>,
}

pub struct MockServer {
    to_client: Option<async_channel::Sender<Message>>,
    from_client: async_channel::Receiver<Message>,
    closed: Arc<AtomicBool>,
}

pub fn pair() -> (MockConnection, MockServer) {
    let (to_client, incoming) = async_channel::unbounded();
    let (outgoing, from_client) = async_channel::unbounded();
    let closed = Arc::new(AtomicBool::new(false));

    (
        MockConnection {
            incoming,
            outgoing,
            closed: Arc::clone(&closed),
        },
        MockServer {
            to_client: Some(to_client),
            from_client,
            closed,
        },
    )
}

impl Connection for MockConnection {
    async fn receive(&mut self) -> Result<Message, Error> {
        self.incoming
            .recv()
            .await
            .map_err(|_| Error::TransportRead("connection reset".into()))
    }

    async fn send(&mut self, message: Message) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Send("already closed".into()));
        }
        self.outgoing
            .send(message)
            .await
            .map_err(|error| Error::Send(error.to_string()))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.outgoing.close();
    }
}

impl MockServer {
    pub async fn send(&self, frame: Value) {
        self.send_text(&frame.to_string()).await;
    }

    /// Sends raw text, which needn't be valid JSON
    pub async fn send_text(&self, text: &str) {
        self.to_client
            .as_ref()
            .expect("connection was already dropped")
            .send(Message::Text(text.into()))
            .await
            .expect("client hung up");
    }

    pub async fn send_close(&self, code: u16, reason: &str) {
        self.to_client
            .as_ref()
            .expect("connection was already dropped")
            .send(Message::Close {
                code: Some(code),
                reason: Some(reason.into()),
            })
            .await
            .expect("client hung up");
    }

    /// Drops the server half without a close frame, like a broken socket
    pub fn drop_connection(&mut self) {
        self.to_client = None;
    }

    /// The next frame the client sent, or None once it closed the connection
    pub async fn next_frame(&self) -> Option<Value> {
        let message = tokio::time::timeout(Duration::from_secs(5), self.from_client.recv())
            .await
            .expect("timed out waiting for the client")
            .ok()?;

        match message {
            Message::Text(text) => Some(serde_json::from_str(&text).unwrap()),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    pub async fn expect_frame(&self) -> Value {
        self.next_frame().await.expect("client closed the connection")
    }

    /// Everything the client sends until it closes the connection
    pub async fn remaining_frames(&self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame().await {
            frames.push(frame);
        }
        frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Runs the server side of a handshake, returning the subscription id
    pub async fn accept(&self) -> String {
        let init = self.expect_frame().await;
        assert_eq!(init, json!({"type": "connection_init", "payload": {}}));

        self.send(json!({"type": "connection_ack"})).await;

        let subscribe = self.expect_frame().await;
        assert_eq!(subscribe["type"], "subscribe");
        subscribe["id"].as_str().unwrap().to_owned()
    }
}
