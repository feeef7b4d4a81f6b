use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CartSnapshot, ProcessingLocation};

/// Flat sales tax applied to every order subtotal.
pub const TAX_RATE: f64 = 0.08;
/// Days between placing an order and its estimated delivery.
pub const DELIVERY_DAYS: i64 = 5;
/// Days an archived order is retained before the cleanup sweep deletes it.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses reachable from `self` through a forward transition.
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Processing],
            OrderStatus::Processing => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Text recorded in the tracking entry for a move into this status.
    pub fn tracking_description(self, location: Option<&ProcessingLocation>) -> String {
        match (self, location) {
            (OrderStatus::Pending, _) => "Order received and pending confirmation".to_string(),
            (OrderStatus::Confirmed, _) => "Order confirmed and payment verified".to_string(),
            (OrderStatus::Processing, Some(loc)) => {
                format!("Order is being processed at {}", loc.name)
            }
            (OrderStatus::Processing, None) => "Order is being processed".to_string(),
            (OrderStatus::Shipped, Some(loc)) => format!("Order shipped from {}", loc.name),
            (OrderStatus::Shipped, None) => "Order has been shipped".to_string(),
            (OrderStatus::Delivered, _) => "Order has been delivered to customer".to_string(),
            (OrderStatus::Cancelled, _) => "Order has been cancelled".to_string(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Who archived or cancelled an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivedBy {
    Admin,
    Customer,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn customer_info(&self) -> CustomerInfo {
        CustomerInfo {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Payment details captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentMethod {
    #[serde(rename_all = "camelCase")]
    Card {
        card_number: String,
        cardholder_name: String,
        expiry_month: String,
        expiry_year: String,
    },
    #[serde(rename_all = "camelCase")]
    Upi { upi_id: String },
    Cod,
}

impl PaymentMethod {
    pub fn is_cash_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::Cod)
    }

    /// Copy safe to persist on the order: card numbers keep their last four digits.
    pub fn masked(&self) -> Self {
        match self {
            PaymentMethod::Card {
                card_number,
                cardholder_name,
                expiry_month,
                expiry_year,
            } => {
                let digits: Vec<char> = card_number.chars().filter(char::is_ascii_digit).collect();
                let last4: String = digits[digits.len().saturating_sub(4)..].iter().collect();
                PaymentMethod::Card {
                    card_number: format!("**** **** **** {last4}"),
                    cardholder_name: cardholder_name.clone(),
                    expiry_month: expiry_month.clone(),
                    expiry_year: expiry_year.clone(),
                }
            }
            other => other.clone(),
        }
    }

    fn initial_payment_status(&self) -> PaymentStatus {
        if self.is_cash_on_delivery() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Completed
        }
    }
}

/// A cart line frozen into an order. Prices never follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(rename = "ProductID", deserialize_with = "super::id_from_string_or_number")]
    pub product_id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "UnitPrice")]
    pub unit_price: f64,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "TotalPrice")]
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub updated_by: String,
}

/// A completed purchase: an immutable snapshot plus the status/tracking
/// overlay maintained by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(
        default,
        deserialize_with = "super::optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub customer_info: CustomerInfo,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub order_date: DateTime<Utc>,
    pub estimated_delivery: NaiveDate,

    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub tracking_history: Vec<OrderTracking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<ProcessingLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<ArchivedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_to_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_to_customer: Option<bool>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<ArchivedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_delete_date: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds the order snapshot for a cart at checkout time.
    pub fn place(
        order_number: String,
        cart: &CartSnapshot,
        address: &ShippingAddress,
        payment: &PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        let items = cart
            .items
            .iter()
            .map(|item| OrderLineItem {
                product_id: item.product_id.clone(),
                title: item
                    .product
                    .as_ref()
                    .map(|p| p.title.clone())
                    .unwrap_or_default(),
                unit_price: item.unit_price(),
                quantity: item.quantity,
                total_price: item.total_price,
            })
            .collect();
        let subtotal = cart.total_price;

        Self {
            id: None,
            order_number,
            user_id: None,
            customer_info: address.customer_info(),
            shipping_address: address.clone(),
            items,
            subtotal,
            tax: subtotal * TAX_RATE,
            shipping: 0.0,
            total: subtotal * (1.0 + TAX_RATE),
            payment_method: payment.masked(),
            order_date: now,
            estimated_delivery: (now + Duration::days(DELIVERY_DAYS)).date_naive(),
            order_status: OrderStatus::Confirmed,
            payment_status: payment.initial_payment_status(),
            tracking_history: Vec::new(),
            current_location: None,
            processing_notes: None,
            last_updated: None,
            updated_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            visible_to_admin: None,
            visible_to_customer: None,
            is_archived: false,
            archived_at: None,
            archived_reason: None,
            archived_by: None,
            auto_delete_date: None,
        }
    }

    pub fn is_visible_to_admin(&self) -> bool {
        self.visible_to_admin != Some(false)
    }

    pub fn is_visible_to_customer(&self) -> bool {
        self.visible_to_customer != Some(false)
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        self.customer_info.email.eq_ignore_ascii_case(email.trim())
    }

    /// Customers may only cancel before the order ships.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self.order_status,
            OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    /// Marks the order cancelled and archived, scheduling its hard delete.
    pub fn archive(&mut self, by: ArchivedBy, reason: &str, now: DateTime<Utc>, retention: Duration) {
        self.order_status = OrderStatus::Cancelled;
        self.is_archived = true;
        self.archived_at = Some(now);
        self.archived_by = Some(by);
        self.archived_reason = Some(reason.to_string());
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(by);
        self.cancellation_reason = Some(reason.to_string());
        self.auto_delete_date = Some(now + retention);
    }

    /// Archived orders whose retention window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_archived && self.auto_delete_date.is_some_and(|date| now >= date)
    }
}

/// Listing order shared by the admin and customer views: active orders
/// newest first, cancelled orders after all of them.
pub fn sort_for_listing(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        let rank = |o: &Order| u8::from(o.order_status == OrderStatus::Cancelled);
        rank(a)
            .cmp(&rank(b))
            .then_with(|| b.order_date.cmp(&a.order_date))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStatistics {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl OrderStatistics {
    pub fn tally<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut stats = Self::default();
        for order in orders {
            stats.total += 1;
            match order.order_status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => stats.delivered += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}
