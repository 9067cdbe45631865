//! Session status publishing
//!
//! [`StatusPublisher`] holds the latest session status, storage snapshot and
//! notification in watch channels. Observers always see the most recent
//! value and are woken on every later change; nothing is queued.
//! [`StorageRefresh`] republishes the storage snapshot on a timer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::notification::{Notification, NotificationSink};
use crate::recorder::SessionStatus;
use crate::storage::{StorageProvider, StorageSnapshot};

struct Channels {
    status: watch::Sender<SessionStatus>,
    storage: watch::Sender<StorageSnapshot>,
    notification: watch::Sender<Option<Notification>>,
}

/// Process-wide holder of the values the UI observes
#[derive(Clone)]
pub struct StatusPublisher {
    channels: Arc<Channels>,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        let (storage, _) = watch::channel(StorageSnapshot::default());
        let (notification, _) = watch::channel(None);
        Self {
            channels: Arc::new(Channels {
                status,
                storage,
                notification,
            }),
        }
    }

    pub fn publish_status(&self, status: SessionStatus) {
        self.channels.status.send_replace(status);
    }

    pub fn publish_storage(&self, snapshot: StorageSnapshot) {
        self.channels.storage.send_replace(snapshot);
    }

    pub fn status(&self) -> SessionStatus {
        self.channels.status.borrow().clone()
    }

    pub fn storage(&self) -> StorageSnapshot {
        self.channels.storage.borrow().clone()
    }

    pub fn notification(&self) -> Option<Notification> {
        self.channels.notification.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.channels.status.subscribe()
    }

    pub fn subscribe_storage(&self) -> watch::Receiver<StorageSnapshot> {
        self.channels.storage.subscribe()
    }

    pub fn subscribe_notification(&self) -> watch::Receiver<Option<Notification>> {
        self.channels.notification.subscribe()
    }
}

impl NotificationSink for StatusPublisher {
    fn post(&self, notification: &Notification) {
        debug!("Notification: {} | {}", notification.title, notification.text);
        self.channels
            .notification
            .send_replace(Some(notification.clone()));
    }

    fn remove(&self) {
        debug!("Notification removed");
        self.channels.notification.send_replace(None);
    }
}

/// Periodic free-space refresh
///
/// Refreshes once right away, then on every interval tick or
/// [`refresh_now`](Self::refresh_now) call. Cancelling or dropping the
/// handle ends the loop.
pub struct StorageRefresh {
    trigger: Arc<Notify>,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl StorageRefresh {
    pub fn spawn(provider: StorageProvider, publisher: StatusPublisher, interval: Duration) -> Self {
        let trigger = Arc::new(Notify::new());
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let wake = trigger.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }

                let snapshot = provider.snapshot();
                debug!(
                    "Storage refresh: {} bytes free ({})",
                    snapshot.free_bytes, snapshot.time_remaining
                );
                publisher.publish_storage(snapshot);
            }

            debug!("Storage refresh stopped");
        });

        Self {
            trigger,
            cancel: Some(cancel_tx),
            handle,
        }
    }

    /// Refresh as soon as possible instead of waiting for the next tick
    pub fn refresh_now(&self) {
        self.trigger.notify_one();
    }

    /// Stop the loop and wait for it to finish; nothing is published after
    /// this returns.
    pub async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for StorageRefresh {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.handle.abort();
    }
}
