use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info, instrument, warn};

use crate::clients::{CartClient, InventoryStore, NotificationSink};
use crate::clock::Clock;
use crate::domain::{Notification, Order, PaymentMethod, ShippingAddress};
use crate::error::CheckoutError;
use crate::session::Session;
use crate::store::{Collection, DocumentStore};
use crate::workflow::Workflow;

const UPI_PROVIDERS: [&str; 3] = ["@gpay", "@phonepe", "@paytm"];

/// Everything the shopper entered on the checkout pages.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub address: ShippingAddress,
    pub payment: PaymentMethod,
}

/// Turns the current cart into a persisted order.
///
/// Stock was already reserved line by line while the cart was built, so
/// checkout only verifies it and never decrements again.
#[derive(Clone)]
pub struct CheckoutClient {
    cart: CartClient,
    inventory: Arc<dyn InventoryStore>,
    orders: Collection<Order>,
    notifications: Arc<dyn NotificationSink>,
    session: Arc<dyn Session>,
    clock: Arc<dyn Clock>,
    payment_delay: Duration,
}

impl CheckoutClient {
    pub fn new(
        cart: CartClient,
        store: Arc<dyn DocumentStore>,
        inventory: Arc<dyn InventoryStore>,
        notifications: Arc<dyn NotificationSink>,
        session: Arc<dyn Session>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cart,
            inventory,
            orders: Collection::new(store),
            notifications,
            session,
            clock,
            payment_delay: Duration::from_secs(2),
        }
    }

    /// How long the simulated payment takes.
    pub fn with_payment_delay(mut self, delay: Duration) -> Self {
        self.payment_delay = delay;
        self
    }

    #[instrument(skip(self, request), fields(owner_id = %self.cart.owner_id()))]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        info!("Processing place_order request");
        validate_payment(&request.payment)?;

        // Step 1: Load the cart
        let cart = self.cart.load_cart().await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Step 2: Every line must still fit in current stock
        for item in &cart.items {
            let product = self.inventory.product(&item.product_id).await?;
            if item.quantity > product.stock {
                warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    available = product.stock,
                    "Stock check failed"
                );
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available: product.stock,
                });
            }
        }

        // Step 3: Build the order snapshot
        let now = self.clock.now();
        let mut order = Order::place(
            generate_order_number(now),
            &cart,
            &request.address,
            &request.payment,
            now,
        );
        order.user_id = self.session.current_user().map(|user| user.id);

        // Step 4: Simulated payment
        if !self.payment_delay.is_zero() {
            info!(delay_ms = self.payment_delay.as_millis() as u64, "Processing payment");
            tokio::time::sleep(self.payment_delay).await;
        }

        // Step 5: Persist and read back
        let created = self.orders.create(&order).await.map_err(|e| {
            error!(error = %e, "Failed to save order");
            CheckoutError::PaymentFailed(e.to_string())
        })?;
        let persisted = match created.id.as_deref() {
            Some(id) => self.orders.get(id).await.ok().flatten(),
            None => None,
        };
        let Some(order) = persisted else {
            error!(order_number = %order.order_number, "Order could not be read back after write");
            return Err(CheckoutError::PersistenceVerificationFailed {
                order_number: order.order_number,
            });
        };

        // Step 6: Follow-ups never undo a placed order
        let mut workflow = Workflow::new("checkout");
        workflow.best_effort("clear_cart", self.cart.clear_after_checkout().await);
        workflow.best_effort(
            "notify_customer",
            self.notifications
                .send(Notification::order_placed(&order, self.clock.now()))
                .await,
        );
        let report = workflow.finish();

        info!(
            order_number = %order.order_number,
            total = order.total,
            clean = report.is_clean(),
            "Order placed"
        );
        Ok(order)
    }
}

/// `ORD-<epoch ms>-<0..999>`. Not checked for uniqueness.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::rng().random_range(0..1000);
    format!("ORD-{}-{}", now.timestamp_millis(), suffix)
}

fn validate_payment(payment: &PaymentMethod) -> Result<(), CheckoutError> {
    match payment {
        PaymentMethod::Card {
            card_number,
            cardholder_name,
            expiry_month,
            expiry_year,
        } => {
            if [card_number, cardholder_name, expiry_month, expiry_year]
                .iter()
                .any(|field| field.trim().is_empty())
            {
                return Err(CheckoutError::InvalidPayment(
                    "Please fill in all card details".to_string(),
                ));
            }
        }
        PaymentMethod::Upi { upi_id } => {
            if upi_id.trim().is_empty() {
                return Err(CheckoutError::InvalidPayment(
                    "Please enter your UPI ID".to_string(),
                ));
            }
            let lower = upi_id.to_lowercase();
            if !UPI_PROVIDERS.iter().any(|provider| lower.ends_with(provider)) {
                return Err(CheckoutError::InvalidPayment(
                    "UPI ID must end with @gpay, @phonepe, or @paytm".to_string(),
                ));
            }
        }
        PaymentMethod::Cod => {}
    }
    Ok(())
}
