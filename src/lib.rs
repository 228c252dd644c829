//! # backboard-subscriptions
//!
//! backboard-subscriptions streams build logs, deployment logs, deployment
//! status & environment logs from a GraphQL backend using the
//! [graphql-transport-ws protocol][protocol].
//!
//! Every subscription owns a websocket of its own.  The client performs the
//! `connection_init` / `connection_ack` handshake, answers server pings,
//! hands each result over in the order it was sent and shuts the socket down
//! promptly when the server completes the subscription, the connection
//! breaks or the caller cancels.  Reconnecting is left to callers.
//!
//! Results can be consumed either as a [`Subscription`] stream or through
//! the callback based [`subscribe`] function:
//!
//! ```rust,no_run
//! use backboard_subscriptions::{operations::DeploymentLogs, Endpoint, SubscriptionBuilder};
//! use futures_lite::StreamExt;
//!
//! # async fn example() -> Result<(), backboard_subscriptions::Error> {
//! let mut logs = SubscriptionBuilder::new()
//!     .connect(&Endpoint::from_env(), DeploymentLogs::new("f62b534a").limit(100))
//!     .await?;
//!
//! while let Some(lines) = logs.next().await {
//!     for line in lines? {
//!         println!("[{}] {}", line.timestamp, line.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [protocol]: https://github.com/enisdenjo/graphql-ws/blob/HEAD/PROTOCOL.md

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cancel;
mod client;
mod endpoint;
mod error;
mod logging;
mod native;
#[cfg(feature = "tungstenite")]
mod sink;

pub mod graphql;
pub mod operations;
pub mod protocol;

#[doc(hidden)]
#[path = "doc_utils.rs"]
pub mod __doc_utils;

pub use self::{
    cancel::{cancellation, CancelHandle, Cancellation},
    client::{Connection, Message, Subscription, SubscriptionBuilder, SubscriptionId},
    endpoint::{Credentials, Endpoint, Environment, SUBPROTOCOL},
    error::Error,
};

#[cfg(feature = "connect")]
pub use self::{
    client::subscribe,
    native::{connect, WebsocketStream},
};
