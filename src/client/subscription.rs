use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_lite::{stream, Stream, StreamExt};
use serde_json::Value;

use crate::{graphql::GraphqlOperation, Error};

use super::{connection::Connection, session::Session, subscription_id::SubscriptionId};

/// A `futures::Stream` for a subscription.
///
/// Emits an item for each message received by the subscription, in the
/// order the server sent them:
///
/// - `Ok(response)` for each result.
/// - A non fatal `Err` (see [`Error::is_fatal`]) when the server reports a
///   GraphQL error.  More items may follow.
/// - A fatal `Err` when the connection fails or is cancelled.  This is always
///   the last item.
///
/// The stream ends without an error once the server completes the subscription.
/// Dropping it closes the connection.
#[pin_project::pin_project]
pub struct Subscription<Operation>
where
    Operation: GraphqlOperation,
{
    id: SubscriptionId,
    stream: stream::Boxed<Result<Operation::Response, Error>>,
}

impl<Operation> Subscription<Operation>
where
    Operation: GraphqlOperation + Send + 'static,
    Operation::Response: Send + 'static,
{
    pub(super) fn new<Conn>(id: SubscriptionId, session: Session<Conn>, operation: Operation) -> Self
    where
        Conn: Connection + Send + 'static,
    {
        let stream = stream::unfold(Some(session), next_item)
            .map(move |item| item.and_then(|data| operation.decode(data)))
            .fuse()
            .boxed();

        Subscription { id, stream }
    }
}

impl<Operation> Subscription<Operation>
where
    Operation: GraphqlOperation,
{
    /// Returns the identifier for this subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Runs the subscription to the end, handing results to callbacks.
    ///
    /// `on_error` sees every GraphQL error and also the fatal error that
    /// ends the stream, unless that was a cancellation.  Returns `Ok(())`
    /// when the server completes the subscription, or the fatal error.
    ///
    /// ```rust
    /// # async fn example() -> Result<(), backboard_subscriptions::Error> {
    /// # let connection = backboard_subscriptions::__doc_utils::Conn;
    /// # let request = backboard_subscriptions::graphql::Request::new("subscription { a }");
    /// use backboard_subscriptions::SubscriptionBuilder;
    ///
    /// let subscription = SubscriptionBuilder::new().subscribe(connection, request).await?;
    /// subscription
    ///     .run(|data| println!("{data}"), |error| eprintln!("{error}"))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(
        mut self,
        mut on_data: impl FnMut(Operation::Response),
        mut on_error: impl FnMut(Error),
    ) -> Result<(), Error> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(response) => on_data(response),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(error) if error.is_fatal() => {
                    on_error(error.clone());
                    return Err(error);
                }
                Err(error) => on_error(error),
            }
        }

        Ok(())
    }
}

async fn next_item<Conn>(
    session: Option<Session<Conn>>,
) -> Option<(Result<Value, Error>, Option<Session<Conn>>)>
where
    Conn: Connection,
{
    let mut session = session?;
    let item = session.next_event().await?;

    // A fatal error has already closed the session
    let session = match &item {
        Err(error) if error.is_fatal() => None,
        _ => Some(session),
    };
    Some((item, session))
}

impl<Operation> fmt::Debug for Subscription<Operation>
where
    Operation: GraphqlOperation,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<Operation> Stream for Subscription<Operation>
where
    Operation: GraphqlOperation,
{
    type Item = Result<Operation::Response, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().stream.as_mut().poll_next(cx)
    }
}
