//! Alert delivery.
//!
//! Alerts leave the coordinator through a [`NotificationDispatcher`], which
//! queues them for a background worker so a slow or failing [`Notifier`]
//! never stalls sensor ingestion.

pub mod dispatch;
pub mod notifier;

#[cfg(test)]
pub mod mock;

pub use dispatch::{DeliveryPolicy, NotificationDispatcher};
pub use notifier::{LogNotifier, Notifier, NotifyError, PushbulletNotifier};
