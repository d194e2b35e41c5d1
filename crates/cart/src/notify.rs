//! User-facing notification side-channel.
//!
//! Every failed cart operation fires exactly one [`Notification`]. Notifications
//! are fire-and-forget: the cart never waits on or inspects what a
//! [`Notifier`] does with them.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::CartError;

/// The cart operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Remove,
    UpdateAmount,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::UpdateAmount => "update_amount",
        })
    }
}

/// Fixed user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// Adding a product failed.
    AddFailed,
    /// The product to remove is not in the cart.
    RemoveFailed,
    /// The requested quantity exceeds available stock.
    OutOfStock,
    /// Changing a quantity failed.
    UpdateFailed,
}

impl Notification {
    /// Pick the message for a failed operation.
    ///
    /// Stock shortages always surface as [`Notification::OutOfStock`], including
    /// when adding a product that is already in the cart.
    #[must_use]
    pub fn for_failure(operation: Operation, error: &CartError) -> Self {
        match (operation, error) {
            (_, CartError::OutOfStock { .. }) => Self::OutOfStock,
            (Operation::Add, _) => Self::AddFailed,
            (Operation::Remove, _) => Self::RemoveFailed,
            (Operation::UpdateAmount, _) => Self::UpdateFailed,
        }
    }

    /// The message shown to the shopper.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::AddFailed => "Erro na adição do produto",
            Self::RemoveFailed => "Erro na remoção do produto",
            Self::OutOfStock => "Quantidade solicitada fora de estoque",
            Self::UpdateFailed => "Erro na alteração de quantidade do produto",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Receives notifications. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs notifications as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::warn!(notification = ?notification, "{}", notification.message());
    }
}

/// Forwards notifications to an unbounded channel, e.g. a UI toast queue.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // Nobody listening is fine; notifications are best-effort
        if self.sender.send(notification).is_err() {
            tracing::debug!(notification = ?notification, "Notification dropped, receiver closed");
        }
    }
}
