use std::sync::Arc;

use tracing::info;

use super::{StorefrontSystem, SystemError};
use crate::clients::CheckoutRequest;
use crate::domain::{format_currency, Order, OrderStatus, PaymentMethod, Product, ShippingAddress};
use crate::session::SessionUser;
use crate::store::Collection;

pub const DEMO_PRODUCT_ID: &str = "demo-1";

fn demo_failed(e: impl std::fmt::Display) -> SystemError {
    SystemError::Demo(e.to_string())
}

/// Seeds one product and walks an order from cart to shipment.
pub async fn run_demo(system: &StorefrontSystem) -> Result<Order, SystemError> {
    let products = Collection::<Product>::new(Arc::clone(&system.store));
    let product = products
        .create(&Product::new(DEMO_PRODUCT_ID, "Desk Lamp", 24.99, 10))
        .await
        .map_err(demo_failed)?;
    info!(product_id = %product.id, stock = product.stock, "Product seeded");

    system
        .session
        .login(SessionUser::new("demo-user", "demo@example.com", "Demo Shopper"));

    let cart = system
        .cart
        .add_to_cart(&product.id, 2)
        .await
        .map_err(demo_failed)?;
    info!(items = cart.items.len(), total = %format_currency(cart.total_price), "Cart ready");

    let order = system
        .checkout
        .place_order(CheckoutRequest {
            address: ShippingAddress {
                full_name: "Demo Shopper".to_string(),
                email: "demo@example.com".to_string(),
                phone: "555-0100".to_string(),
                address_line1: "1 Main St".to_string(),
                address_line2: None,
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
            },
            payment: PaymentMethod::Cod,
        })
        .await
        .map_err(demo_failed)?;
    info!(order_number = %order.order_number, status = ?order.order_status, total = %format_currency(order.total), "Order placed");

    let order_id = order.id.clone().ok_or_else(|| demo_failed("placed order has no id"))?;
    let mut current = order;
    // Checkout leaves the order confirmed.
    for status in [OrderStatus::Processing, OrderStatus::Shipped] {
        current = system
            .lifecycle
            .advance_status(&order_id, status, None, None)
            .await
            .map_err(demo_failed)?;
        info!(status = ?current.order_status, "Order advanced");
    }

    let stats = system.lifecycle.order_statistics().await.map_err(demo_failed)?;
    info!(?stats, "Order statistics");
    Ok(current)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app_system::StorefrontConfig;

    #[tokio::test]
    async fn demo_walks_an_order_to_shipment() {
        let config = StorefrontConfig {
            payment_delay: Duration::ZERO,
            demo: true,
            ..StorefrontConfig::default()
        };
        let system = StorefrontSystem::new(&config).unwrap();

        let order = run_demo(&system).await.unwrap();

        assert_eq!(order.order_status, OrderStatus::Shipped);
        assert_eq!(order.tracking_history.len(), 2);
        assert_eq!(system.inventory.product(DEMO_PRODUCT_ID).await.unwrap().stock, 8);
        assert!(system.cart.load_cart().await.unwrap().is_empty());
        assert_eq!(system.shutdown().await, Ok(()));
    }

    #[tokio::test]
    async fn demo_failure_is_reported() {
        let config = StorefrontConfig {
            store_url: Some("http://127.0.0.1:9".to_string()),
            request_timeout: Some(Duration::from_secs(2)),
            payment_delay: Duration::ZERO,
            ..StorefrontConfig::default()
        };
        let system = StorefrontSystem::new(&config).unwrap();

        assert!(matches!(run_demo(&system).await, Err(SystemError::Demo(_))));
        assert_eq!(system.shutdown().await, Ok(()));
    }
}
