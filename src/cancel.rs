//! External cancellation for running subscriptions.

use std::future::pending;

/// Creates a linked [`CancelHandle`] & [`Cancellation`] pair.
///
/// ```rust
/// let (handle, cancellation) = backboard_subscriptions::cancellation();
/// assert!(!cancellation.is_cancelled());
///
/// handle.cancel();
/// assert!(cancellation.is_cancelled());
/// ```
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (sender, receiver) = async_channel::bounded(1);
    (
        CancelHandle { sender },
        Cancellation {
            receiver: Some(receiver),
        },
    )
}

/// Triggers a [`Cancellation`].
///
/// Dropping every clone of the handle also triggers it.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    sender: async_channel::Sender<()>,
}

impl CancelHandle {
    /// Cancels every subscription watching the linked [`Cancellation`].
    pub fn cancel(&self) {
        self.sender.close();
    }
}

/// A signal a subscription watches for while it waits on the server.
///
/// Clones observe the same signal, so one handle can stop several
/// concurrent subscriptions.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    receiver: Option<async_channel::Receiver<()>>,
}

impl Cancellation {
    /// A cancellation that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .map(async_channel::Receiver::is_closed)
            .unwrap_or(false)
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        match &self.receiver {
            // Nothing is ever sent on the channel, recv only returns once it closes
            Some(receiver) => while receiver.recv().await.is_ok() {},
            None => pending().await,
        }
    }
}
