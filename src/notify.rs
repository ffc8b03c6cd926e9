//! Rate-limited outbound notification queue.
//!
//! Ring mutations commit first and push here second; delivery happens on an
//! independent consumer task so a slow or failing transport never holds a
//! lifecycle operation hostage. The consumer drains one item per tick to
//! respect the downstream rate limit and re-queues failed items after a
//! backoff, retrying until they go through.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;

/// Why a target notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetReason {
    /// First assignment of a game, or a re-send of the current one.
    Initial,
    /// The recipient inherited a new target after an elimination.
    NewTarget,
    /// The recipient was just revived and gets their comeback target.
    Revival,
}

/// One outbound notification. Rendering and addressing are the transport's
/// concern; the queue only carries identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Tell a user who they are hunting.
    TargetAssigned {
        /// Game the assignment belongs to.
        game_id: Uuid,
        /// User receiving the notification.
        recipient: Uuid,
        /// User they must eliminate.
        target: Uuid,
        /// Why this assignment is being announced.
        reason: TargetReason,
    },
    /// Tell a user they are out of the game.
    Eliminated {
        /// Game the elimination belongs to.
        game_id: Uuid,
        /// User receiving the notification.
        recipient: Uuid,
        /// User who got them, when disclosed.
        eliminated_by: Option<Uuid>,
    },
}

/// Failure reported by a transport for a single delivery attempt.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Outbound medium the consumer hands notifications to.
pub trait NotificationTransport: Send + Sync {
    /// Attempt to deliver one notification.
    fn deliver(&self, notification: Notification) -> BoxFuture<'_, Result<(), DeliveryError>>;
}

/// Producer handle to the queue. Cheap to clone; `push` never blocks.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Start the consumer task and return a producer handle.
    ///
    /// At most one delivery is attempted per `drain_interval` tick and only
    /// one is ever in flight. Failed deliveries are re-queued at the tail
    /// after `retry_backoff`, so they lose their original position but are
    /// never dropped.
    pub fn spawn(
        transport: Arc<dyn NotificationTransport>,
        drain_interval: Duration,
        retry_backoff: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(rx, tx.clone(), transport, drain_interval, retry_backoff));
        Self { tx }
    }

    /// Start the consumer paced by the application configuration.
    pub fn from_config(config: &AppConfig, transport: Arc<dyn NotificationTransport>) -> Self {
        Self::spawn(transport, config.drain_interval(), config.retry_backoff())
    }

    /// Enqueue a notification for eventual delivery. Fire-and-forget.
    pub fn push(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("notification consumer is gone; dropping notification");
        }
    }
}

/// Single-consumer loop.
///
/// Holds its own sender clone so retries can re-enter the channel; as a
/// consequence the loop lives for the lifetime of the process.
async fn drain(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    retry_tx: mpsc::UnboundedSender<Notification>,
    transport: Arc<dyn NotificationTransport>,
    drain_interval: Duration,
    retry_backoff: Duration,
) {
    let mut ticker = interval(drain_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while let Some(notification) = rx.recv().await {
        ticker.tick().await;
        match transport.deliver(notification.clone()).await {
            Ok(()) => debug!(?notification, "notification delivered"),
            Err(err) => {
                warn!(
                    ?notification,
                    error = %err,
                    backoff_secs = retry_backoff.as_secs(),
                    "notification delivery failed; re-queueing after backoff"
                );
                let tx = retry_tx.clone();
                tokio::spawn(async move {
                    sleep(retry_backoff).await;
                    let _ = tx.send(notification);
                });
            }
        }
    }
}
