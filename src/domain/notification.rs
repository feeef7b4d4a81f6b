use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{format_currency, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderPlaced,
    /// Admin removed a customer's order.
    OrderRemoved,
    OrderRefundNotification,
    OrderDeletedByCustomer,
}

/// Message handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(
        default,
        deserialize_with = "super::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub recipient: Recipient,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    fn for_order(
        order: &Order,
        recipient: Recipient,
        kind: NotificationKind,
        title: &str,
        message: String,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            order_number: order.order_number.clone(),
            customer_email: order.customer_info.email.clone(),
            customer_name: order.customer_info.full_name.clone(),
            recipient,
            kind,
            title: title.to_string(),
            message,
            amount: Some(order.total),
            reason: reason.map(str::to_string),
            created_at: now,
            read: false,
        }
    }

    pub fn order_placed(order: &Order, now: DateTime<Utc>) -> Self {
        let message = format!(
            "Dear {}, your order {} has been placed. Total: {}.",
            order.customer_info.full_name,
            order.order_number,
            format_currency(order.total)
        );
        Self::for_order(
            order,
            Recipient::Customer,
            NotificationKind::OrderPlaced,
            "Order Placed",
            message,
            None,
            now,
        )
    }

    pub fn order_removed(order: &Order, reason: &str, now: DateTime<Utc>) -> Self {
        let cause = if reason.is_empty() {
            "unforeseen circumstances"
        } else {
            reason
        };
        let message = format!(
            "Dear {}, your order {} has been cancelled due to: {}. A refund of {} will be processed within 3-5 business days.",
            order.customer_info.full_name,
            order.order_number,
            cause,
            format_currency(order.total)
        );
        Self::for_order(
            order,
            Recipient::Customer,
            NotificationKind::OrderRemoved,
            "Order Cancelled - Refund Processed",
            message,
            Some(reason),
            now,
        )
    }

    pub fn customer_refund(order: &Order, reason: &str, now: DateTime<Utc>) -> Self {
        let message = format!(
            "Dear {}, your order {} has been cancelled as requested. Reason: {}. A full refund of {} will be processed within 7 business days and credited back to your original payment method.",
            order.customer_info.full_name,
            order.order_number,
            reason,
            format_currency(order.total)
        );
        Self::for_order(
            order,
            Recipient::Customer,
            NotificationKind::OrderRefundNotification,
            "Order Cancelled - Refund Processing",
            message,
            Some(reason),
            now,
        )
    }

    pub fn cancelled_by_customer(order: &Order, reason: &str, now: DateTime<Utc>) -> Self {
        let message = format!(
            "Customer {} has deleted order {}. Reason: {}",
            order.customer_info.full_name, order.order_number, reason
        );
        Self::for_order(
            order,
            Recipient::Admin,
            NotificationKind::OrderDeletedByCustomer,
            "Order Deleted by Customer",
            message,
            Some(reason),
            now,
        )
    }
}
