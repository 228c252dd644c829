//! A real websocket server on localhost that serves a single scripted connection.

use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_tungstenite::{
    tokio::TokioAdapter,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderMap, HeaderValue},
    },
    WebSocketStream,
};
use backboard_subscriptions::{Connection, Message};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub struct TestServer {
    pub url: String,
    headers: Arc<Mutex<HeaderMap>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start<F, Fut>(script: F) -> TestServer
    where
        F: FnOnce(ServerSocket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/graphql/v2", listener.local_addr().unwrap());

        let headers = Arc::new(Mutex::new(HeaderMap::new()));
        let recorded = Arc::clone(&headers);

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();

            let callback = move |request: &Request,
                                 mut response: Response|
                  -> Result<Response, ErrorResponse> {
                *recorded.lock().unwrap() = request.headers().clone();
                response.headers_mut().insert(
                    SEC_WEBSOCKET_PROTOCOL,
                    HeaderValue::from_static("graphql-transport-ws"),
                );
                Ok(response)
            };

            let socket = async_tungstenite::tokio::accept_hdr_async(stream, callback)
                .await
                .unwrap();

            script(ServerSocket { socket }).await;
        });

        TestServer { url, headers, task }
    }

    /// Waits for the script to run to completion, returning the upgrade request headers
    pub async fn finished(self) -> HeaderMap {
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server script timed out")
            .expect("server script failed");

        let headers = self.headers.lock().unwrap();
        headers.clone()
    }
}

pub struct ServerSocket {
    socket: WebSocketStream<TokioAdapter<tokio::net::TcpStream>>,
}

impl ServerSocket {
    pub async fn expect(&mut self) -> Value {
        loop {
            match self.socket.receive().await.unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping | Message::Pong => continue,
                Message::Close { .. } => panic!("client closed the connection"),
            }
        }
    }

    pub async fn send(&mut self, frame: Value) {
        // WebSocketStream has an inherent send taking tungstenite messages
        Connection::send(&mut self.socket, Message::Text(frame.to_string()))
            .await
            .unwrap();
    }

    pub async fn send_close(&mut self, code: u16, reason: &str) {
        let close = Message::Close {
            code: Some(code),
            reason: Some(reason.into()),
        };
        Connection::send(&mut self.socket, close).await.unwrap();
    }

    /// Collects frames until the client closes the socket
    pub async fn until_closed(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), self.socket.receive())
                .await
                .expect("client never closed the connection");

            match message {
                Ok(Message::Text(text)) => frames.push(serde_json::from_str(&text).unwrap()),
                Ok(Message::Ping | Message::Pong) => {}
                Ok(Message::Close { .. }) | Err(_) => return frames,
            }
        }
    }
}

/// An HTTP proxy that tunnels a single `CONNECT`, answering with `status`.
///
/// The task resolves to the request line the client sent.
pub async fn start_proxy(status: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let task = tokio::spawn(async move {
        let (mut client, _) = listener.accept().await.unwrap();

        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            head.push(client.read_u8().await.unwrap());
        }
        let head = String::from_utf8(head).unwrap();
        let request_line = head.lines().next().unwrap().to_owned();

        client
            .write_all(format!("HTTP/1.1 {status}\r\n\r\n").as_bytes())
            .await
            .unwrap();

        if status.starts_with("200") {
            let target = request_line.split_whitespace().nth(1).unwrap();
            let mut upstream = TcpStream::connect(target).await.unwrap();
            // Either side hanging up ends the tunnel
            let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
        }

        request_line
    });

    (url, task)
}
