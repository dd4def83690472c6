//! Notification dispatch for the foundry marketplace.
//!
//! Domain operations append events to the outbox in the same write as the
//! state change. The [`NotificationDispatcher`] reads the outbox from a
//! persisted checkpoint, renders emails and hands them to a [`Mailer`].
//! Delivery failures are logged and counted, never propagated back to the
//! operation that raised the event.

pub mod dispatcher;
pub mod error;
pub mod mailer;
pub mod templates;

pub use dispatcher::{DispatchCheckpoint, DispatchStats, NotificationDispatcher};
pub use error::{NotificationError, Result};
pub use mailer::{Email, HttpMailer, InMemoryMailer, Mailer};
pub use templates::{NOT_PROVIDED, render};
