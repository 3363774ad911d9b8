use tokio::sync::broadcast;

use crate::domain::{models::AvatarUpdated, ports::outbound::AvatarEventSink};

/// Fans "avatar updated" events out to any number of independent subscribers.
///
/// Publishing never blocks and never fails the caller: events are dropped
/// when nobody listens, and slow subscribers observe `Lagged`.
#[derive(Clone)]
pub struct AvatarEventBus {
    sender: broadcast::Sender<AvatarUpdated>,
}

impl AvatarEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvatarUpdated> {
        self.sender.subscribe()
    }

    /// Log every event until the bus is dropped.
    pub fn spawn_logger(&self) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => tracing::info!(
                        user_id = %event.user_id,
                        avatar_id = %event.avatar_id,
                        "avatar updated"
                    ),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Avatar event logger lagged, skipped {} events", skipped)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl AvatarEventSink for AvatarEventBus {
    fn publish(&self, event: AvatarUpdated) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No subscribers for avatar event of user {}", event.user_id);
        }
    }
}
