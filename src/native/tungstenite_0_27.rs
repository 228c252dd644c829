use futures_lite::{Stream, StreamExt};
use futures_sink::Sink;
use tungstenite::{self, protocol::CloseFrame, Bytes};

use crate::{
    client::{Connection, Message},
    logging::{trace, warning},
    sink,
    Error,
};

#[cfg_attr(docsrs, doc(cfg(feature = "tungstenite")))]
impl<T> Connection for T
where
    T: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
        + Sink<tungstenite::Message>
        + Send
        + Unpin,
    <T as Sink<tungstenite::Message>>::Error: std::fmt::Display,
{
    async fn receive(&mut self) -> Result<Message, Error> {
        loop {
            let message = match self.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => {
                    warning!("error receiving message: {error:?}");
                    return Err(Error::TransportRead(error.to_string()));
                }
                None => return Err(Error::TransportRead("connection closed".into())),
            };

            match message {
                tungstenite::Message::Text(text) => return Ok(Message::Text(text.as_str().into())),
                tungstenite::Message::Ping(_) => return Ok(Message::Ping),
                tungstenite::Message::Pong(_) => return Ok(Message::Pong),
                tungstenite::Message::Close(frame) => {
                    return Ok(Message::Close {
                        code: frame.as_ref().map(|frame| frame.code.into()),
                        reason: frame.map(|frame| frame.reason.to_string()),
                    });
                }
                tungstenite::Message::Frame(_) | tungstenite::Message::Binary(_) => continue,
            }
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), Error> {
        sink::send(
            self,
            match message {
                Message::Text(text) => tungstenite::Message::Text(text.into()),
                Message::Close { code, reason } => {
                    tungstenite::Message::Close(code.map(|code| CloseFrame {
                        code: code.into(),
                        reason: reason.unwrap_or_default().into(),
                    }))
                }
                Message::Ping => tungstenite::Message::Ping(Bytes::new()),
                Message::Pong => tungstenite::Message::Pong(Bytes::new()),
            },
        )
        .await
        .map_err(|error| Error::Send(error.to_string()))
    }

    async fn close(&mut self) {
        // Closing an already closed socket fails, there's nothing left to release then
        if let Err(_error) = sink::close::<_, tungstenite::Message>(self).await {
            trace!("error closing websocket: {_error}");
        }
    }
}
