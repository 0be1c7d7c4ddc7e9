use async_trait::async_trait;
use fieldserv_shared::events::{OrderCancelledEvent, OrderScheduledEvent};
use std::sync::Mutex;

/// Everything the engine asks the notification collaborator to deliver.
#[derive(Debug, Clone)]
pub enum Notification {
    SchedulingConfirmed(OrderScheduledEvent),
    CancellationConfirmed(OrderCancelledEvent),
}

/// Best-effort delivery: a failure here never rolls back the transition
/// that triggered it, the coordinator only records the flag.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Records every notification instead of sending it.
#[derive(Default)]
pub struct MockNotificationSender {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl MockNotificationSender {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail {
            return Err("Simulated mail delivery failure".into());
        }
        tracing::info!("Delivering notification: {:?}", notification);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}
