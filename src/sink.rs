//! The two `Sink` operations the tungstenite glue needs, without pulling in
//! the whole of `futures`.

use std::{future::poll_fn, pin::Pin};

use futures_sink::Sink;

/// Sends one item and waits for it to be flushed.
pub(crate) async fn send<Si, Item>(sink: &mut Si, item: Item) -> Result<(), Si::Error>
where
    Si: Sink<Item> + Unpin + ?Sized,
{
    poll_fn(|cx| Pin::new(&mut *sink).poll_ready(cx)).await?;
    Pin::new(&mut *sink).start_send(item)?;
    poll_fn(|cx| Pin::new(&mut *sink).poll_flush(cx)).await
}

/// Flushes & closes the sink.
pub(crate) async fn close<Si, Item>(sink: &mut Si) -> Result<(), Si::Error>
where
    Si: Sink<Item> + Unpin + ?Sized,
{
    poll_fn(|cx| Pin::new(&mut *sink).poll_close(cx)).await
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use futures_lite::future;
    use futures_sink::Sink;

    #[derive(Default)]
    struct Recorder {
        items: Vec<u8>,
        flushed: usize,
        closed: bool,
    }

    impl Sink<u8> for Recorder {
        type Error = &'static str;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            if self.closed {
                return Poll::Ready(Err("closed"));
            }
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: u8) -> Result<(), Self::Error> {
            self.items.push(item);
            Ok(())
        }

        fn poll_flush(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.flushed = self.items.len();
            Poll::Ready(Ok(()))
        }

        fn poll_close(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.closed = true;
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn send_flushes_each_item() {
        let mut sink = Recorder::default();

        future::block_on(super::send(&mut sink, 1u8)).unwrap();
        future::block_on(super::send(&mut sink, 2u8)).unwrap();

        assert_eq!(sink.items, vec![1, 2]);
        assert_eq!(sink.flushed, 2);
    }

    #[test]
    fn sending_after_close_fails() {
        let mut sink = Recorder::default();

        future::block_on(super::close::<_, u8>(&mut sink)).unwrap();

        assert!(sink.closed);
        assert_eq!(future::block_on(super::send(&mut sink, 3u8)), Err("closed"));
    }
}
