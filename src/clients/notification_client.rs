use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::{Notification, Recipient};
use crate::error::NotificationError;
use crate::store::{Collection, DocumentStore};

/// Fire-and-forget delivery of customer and admin notices. Callers log a
/// failure and carry on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Writes notifications into the store's `notifications` collection, where
/// the customer inbox and admin dashboard read them.
#[derive(Clone)]
pub struct StoreNotificationSink {
    notifications: Collection<Notification>,
}

impl StoreNotificationSink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            notifications: Collection::new(store),
        }
    }

    /// Unread notices addressed to one customer.
    #[instrument(skip(self))]
    pub async fn unread_for_customer(&self, email: &str) -> Result<Vec<Notification>, NotificationError> {
        let notices = self.notifications.list_where("customerEmail", email).await?;
        Ok(notices
            .into_iter()
            .filter(|n| n.recipient == Recipient::Customer && !n.read)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn admin_feed(&self) -> Result<Vec<Notification>, NotificationError> {
        let mut notices = self.notifications.list_where("recipient", "admin").await?;
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notices)
    }
}

#[async_trait]
impl NotificationSink for StoreNotificationSink {
    #[instrument(skip(self, notification), fields(order_number = %notification.order_number, kind = ?notification.kind))]
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        if notification.order_number.is_empty() {
            return Err(NotificationError::Rejected("missing order number".to_string()));
        }
        self.notifications.create(&notification).await?;
        info!("Notification stored");
        Ok(())
    }
}
