use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use super::intents::NotificationIntent;

/// Error types for notification dispatch
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch channel is closed")]
    ChannelClosed,
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Outbound notification delivery boundary.
///
/// Implementations are best-effort by contract: the engine drains intents
/// through this trait only after commit and never rolls anything back on
/// failure.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, intent: &NotificationIntent) -> Result<(), DispatchError>;
}

/// In-process dispatcher backed by a tokio broadcast channel.
///
/// Downstream consumers (a worker delivering email/SMS, a test asserting on
/// intents) subscribe; publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<NotificationIntent>,
}

impl BroadcastDispatcher {
    /// Create a new dispatcher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to dispatched intents
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationIntent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastDispatcher {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastDispatcher {
    async fn dispatch(&self, intent: &NotificationIntent) -> Result<(), DispatchError> {
        // A send with no subscribers is acceptable; intents are best-effort
        match self.sender.send(intent.clone()) {
            Ok(_) | Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }
}

/// Drain a use case's intents through a dispatcher, logging failures.
///
/// Called after the unit of work commits; a failed delivery never surfaces to
/// the caller and never affects the committed aggregate.
pub async fn drain_best_effort(
    dispatcher: &dyn NotificationDispatcher,
    intents: &[NotificationIntent],
) {
    for intent in intents {
        if let Err(err) = dispatcher.dispatch(intent).await {
            warn!(
                intent_id = %intent.id,
                action = intent.action.action_name(),
                error = %err,
                "notification dispatch failed; intent dropped"
            );
        }
    }
}
