//! Subscriber interface.
//!
//! A subscriber either implements [`RealtimeHandler`] directly, overriding
//! only the callbacks it cares about, or hands the client an
//! `mpsc::UnboundedSender<RealtimeNotification>` and drains the channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RealtimeError;
use crate::payload::{ReminderEvent, TestEvent};

/// Callbacks invoked by the realtime client.
///
/// Callbacks run on the client's task and should return quickly.
pub trait RealtimeHandler: Send + Sync + 'static {
    /// The stream connection opened.
    fn on_open(&self) {}

    /// A non-fatal error: transport failure, HTTP rejection, or a malformed
    /// event. The client keeps running.
    fn on_error(&self, error: &RealtimeError) {
        let _ = error;
    }

    /// A reminder that passed deduplication.
    fn on_reminder(&self, event: &ReminderEvent) {
        let _ = event;
    }

    /// A diagnostic test event.
    fn on_test(&self, event: &TestEvent) {
        let _ = event;
    }
}

/// Ignores everything; for callers that only watch connection state.
impl RealtimeHandler for () {}

impl<H: RealtimeHandler + ?Sized> RealtimeHandler for Arc<H> {
    fn on_open(&self) {
        (**self).on_open()
    }

    fn on_error(&self, error: &RealtimeError) {
        (**self).on_error(error)
    }

    fn on_reminder(&self, event: &ReminderEvent) {
        (**self).on_reminder(event)
    }

    fn on_test(&self, event: &TestEvent) {
        (**self).on_test(event)
    }
}

/// Everything a subscriber can be told, as a channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeNotification {
    Opened,
    Error(RealtimeError),
    Reminder(ReminderEvent),
    Test(TestEvent),
}

impl RealtimeHandler for mpsc::UnboundedSender<RealtimeNotification> {
    fn on_open(&self) {
        forward(self, RealtimeNotification::Opened);
    }

    fn on_error(&self, error: &RealtimeError) {
        forward(self, RealtimeNotification::Error(error.clone()));
    }

    fn on_reminder(&self, event: &ReminderEvent) {
        forward(self, RealtimeNotification::Reminder(event.clone()));
    }

    fn on_test(&self, event: &TestEvent) {
        forward(self, RealtimeNotification::Test(event.clone()));
    }
}

fn forward(tx: &mpsc::UnboundedSender<RealtimeNotification>, notification: RealtimeNotification) {
    if tx.send(notification).is_err() {
        debug!("notification receiver dropped");
    }
}
