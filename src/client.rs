use std::time::Duration;

use serde::Serialize;

use crate::{graphql::GraphqlOperation, Cancellation, Error};

mod connection;
mod handshake;
mod keepalive;
mod session;
mod subscription;
mod subscription_id;

pub use self::{
    connection::{Connection, Message},
    subscription::Subscription,
    subscription_id::SubscriptionId,
};

use self::session::Session;

const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for a single GraphQL subscription over a websocket.
///
/// Each subscription gets a connection of its own: the builder performs the
/// `connection_init` handshake, sends `subscribe` and hands back a
/// [`Subscription`] stream.
///
/// ```rust
/// use std::time::Duration;
/// use backboard_subscriptions::SubscriptionBuilder;
/// #
/// # async fn example() -> Result<(), backboard_subscriptions::Error> {
/// # let connection = backboard_subscriptions::__doc_utils::Conn;
/// # let operation = backboard_subscriptions::__doc_utils::Subscription;
/// let (_handle, cancellation) = backboard_subscriptions::cancellation();
///
/// let subscription = SubscriptionBuilder::new()
///     .ack_timeout(Duration::from_secs(5))
///     .cancellation(cancellation)
///     .subscribe(connection, operation)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SubscriptionBuilder {
    payload: Option<serde_json::Value>,
    ack_timeout: Duration,
    cancellation: Cancellation,
}

impl Default for SubscriptionBuilder {
    fn default() -> Self {
        SubscriptionBuilder {
            payload: None,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            cancellation: Cancellation::never(),
        }
    }
}

impl SubscriptionBuilder {
    /// Creates a SubscriptionBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add payload to `connection_init`.  Defaults to an empty object.
    pub fn payload(self, payload: impl Serialize) -> Result<Self, Error> {
        Ok(Self {
            payload: Some(
                serde_json::to_value(payload)
                    .map_err(|error| Error::Serializing(error.to_string()))?,
            ),
            ..self
        })
    }

    /// How long to wait for `connection_ack`.  Defaults to 10 seconds.
    pub fn ack_timeout(self, timeout: Duration) -> Self {
        Self {
            ack_timeout: timeout,
            ..self
        }
    }

    /// A signal that stops the subscription, in any state.
    pub fn cancellation(self, cancellation: Cancellation) -> Self {
        Self {
            cancellation,
            ..self
        }
    }

    /// Runs the handshake on an already open connection & starts the operation.
    ///
    /// The connection is closed if anything fails along the way.
    pub async fn subscribe<Conn, Operation>(
        self,
        connection: Conn,
        operation: Operation,
    ) -> Result<Subscription<Operation>, Error>
    where
        Conn: Connection + Send + 'static,
        Operation: GraphqlOperation + Send + 'static,
        Operation::Response: Send + 'static,
    {
        let Self {
            payload,
            ack_timeout,
            cancellation,
        } = self;

        let mut session = Session::new(connection, cancellation);

        let request = match serde_json::to_value(&operation) {
            Ok(request) => request,
            Err(error) => {
                session.close().await;
                return Err(Error::Serializing(error.to_string()));
            }
        };

        session.handshake(payload, ack_timeout).await?;
        let id = session.start(request).await?;

        Ok(Subscription::new(id, session, operation))
    }

    /// Connects to the endpoint then behaves like [`SubscriptionBuilder::subscribe`].
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(feature = "connect")]
    #[cfg_attr(docsrs, doc(cfg(feature = "connect")))]
    pub async fn connect<Operation>(
        self,
        endpoint: &crate::Endpoint,
        operation: Operation,
    ) -> Result<Subscription<Operation>, Error>
    where
        Operation: GraphqlOperation + Send + 'static,
        Operation::Response: Send + 'static,
    {
        let connection = crate::connect(endpoint, &self.cancellation).await?;
        self.subscribe(connection, operation).await
    }
}

/// Streams an operation from the endpoint until the server completes it,
/// the connection fails or `cancellation` fires.
///
/// Results are handed to `on_data`, GraphQL errors to `on_error` without
/// stopping the stream.  A connection failure after the subscription started
/// is also offered to `on_error` before it's returned.
///
/// ```rust,no_run
/// use backboard_subscriptions::{graphql::Request, Endpoint};
///
/// # async fn example() -> Result<(), backboard_subscriptions::Error> {
/// let (_handle, cancellation) = backboard_subscriptions::cancellation();
/// let request = Request::new("subscription Deployment($id: String!) { deployment(id: $id) { status } }")
///     .variable("id", "f62b534a")?;
///
/// backboard_subscriptions::subscribe(
///     &Endpoint::from_env(),
///     request,
///     cancellation,
///     |data| println!("{data}"),
///     |error| eprintln!("{error}"),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "connect")]
#[cfg_attr(docsrs, doc(cfg(feature = "connect")))]
pub async fn subscribe<Operation>(
    endpoint: &crate::Endpoint,
    operation: Operation,
    cancellation: Cancellation,
    on_data: impl FnMut(Operation::Response),
    on_error: impl FnMut(Error),
) -> Result<(), Error>
where
    Operation: GraphqlOperation + Send + 'static,
    Operation::Response: Send + 'static,
{
    SubscriptionBuilder::new()
        .cancellation(cancellation)
        .connect(endpoint, operation)
        .await?
        .run(on_data, on_error)
        .await
}
