use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::clients::{InventoryStore, NotificationSink};
use crate::clock::Clock;
use crate::domain::{
    sort_for_listing, ArchivedBy, Notification, Order, OrderStatistics, OrderStatus, OrderTracking,
    PaymentStatus, ProcessingLocation, DEFAULT_RETENTION_DAYS,
};
use crate::error::LifecycleError;
use crate::impl_entity_lookup;
use crate::session::Session;
use crate::store::{Collection, DocumentStore};
use crate::workflow::{Workflow, WorkflowReport};

/// Rows per page in the admin order table.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Criteria for the admin order table. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminOrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive: orders placed any time on this day match.
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring of customer name, email or order number.
    pub customer: Option<String>,
}

impl AdminOrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| s != order.order_status) {
            return false;
        }
        if self.payment_status.is_some_and(|s| s != order.payment_status) {
            return false;
        }
        let placed = order.order_date.date_naive();
        if self.date_from.is_some_and(|from| placed < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| placed > to) {
            return false;
        }
        match self.customer.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                order.customer_info.full_name.to_lowercase().contains(&term)
                    || order.customer_info.email.to_lowercase().contains(&term)
                    || order.order_number.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// One-based pagination. A page past the end falls back to the first page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let page = if page == 0 || page > total_pages { 1 } else { page };
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        total_pages,
        total_items: items.len(),
    }
}

/// What an admin removal did to the order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalOutcome {
    /// Delivered orders are deleted outright.
    Deleted,
    /// Already cancelled orders only disappear from the admin view.
    HiddenFromAdmin,
    Archived(ArchivedOrder),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedOrder {
    pub order: Order,
    pub report: WorkflowReport,
}

/// Drives orders through their status machine and handles cancellation,
/// archival and the admin and customer order views.
#[derive(Clone)]
pub struct LifecycleClient {
    orders: Collection<Order>,
    locations: Collection<ProcessingLocation>,
    inventory: Arc<dyn InventoryStore>,
    notifications: Arc<dyn NotificationSink>,
    session: Arc<dyn Session>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl LifecycleClient {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        inventory: Arc<dyn InventoryStore>,
        notifications: Arc<dyn NotificationSink>,
        session: Arc<dyn Session>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders: Collection::new(Arc::clone(&store)),
            locations: Collection::new(store),
            inventory,
            notifications,
            session,
            clock,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }

    /// How long archived orders are kept before the cleanup sweep deletes them.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn actor_name(&self) -> String {
        self.session
            .current_user()
            .map(|user| user.name)
            .unwrap_or_else(|| "System".to_string())
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    #[instrument(skip(self, notes))]
    pub async fn advance_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        location_id: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Order, LifecycleError> {
        let mut order = self.get_order(order_id).await?;
        let from = order.order_status;
        if !from.can_transition_to(new_status) {
            return Err(LifecycleError::InvalidTransition {
                from,
                to: new_status,
                allowed: from.allowed_transitions().to_vec(),
            });
        }

        let location = match location_id {
            Some(id) => self.find_location(id).await,
            None => None,
        };
        let now = self.clock.now();
        let actor = self.actor_name();

        order.tracking_history.push(OrderTracking {
            status: new_status,
            location: location.as_ref().map(ProcessingLocation::label),
            description: new_status.tracking_description(location.as_ref()),
            timestamp: now,
            updated_by: actor.clone(),
        });
        order.order_status = new_status;
        order.current_location = location;
        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            order.processing_notes = Some(notes.to_string());
        }
        order.last_updated = Some(now);
        order.updated_by = Some(actor);

        let saved = self.orders.replace(order_id, &order).await?;
        info!(order_number = %saved.order_number, %from, to = %new_status, "Order status updated");
        Ok(saved)
    }

    async fn find_location(&self, location_id: &str) -> Option<ProcessingLocation> {
        match self.locations.list().await {
            Ok(all) => all.into_iter().find(|loc| loc.id == location_id),
            Err(e) => {
                warn!(location_id, error = %e, "Could not load processing locations");
                None
            }
        }
    }

    #[instrument(skip(self, notes))]
    pub async fn add_processing_notes(&self, order_id: &str, notes: &str) -> Result<Order, LifecycleError> {
        let mut order = self.get_order(order_id).await?;
        order.processing_notes = Some(notes.to_string());
        order.last_updated = Some(self.clock.now());
        order.updated_by = Some(self.actor_name());
        let saved = self.orders.replace(order_id, &order).await?;
        info!(order_number = %saved.order_number, "Processing notes added");
        Ok(saved)
    }

    // =========================================================================
    // Removal and cancellation
    // =========================================================================

    /// Admin removal. Delivered orders are deleted, cancelled ones hidden and
    /// anything else cancelled, restocked and archived.
    #[instrument(skip(self))]
    pub async fn remove_order(
        &self,
        order_id: &str,
        reason: &str,
        notify_customer: bool,
    ) -> Result<RemovalOutcome, LifecycleError> {
        let mut order = self.get_order(order_id).await?;
        match order.order_status {
            OrderStatus::Delivered => {
                self.orders.delete(order_id).await?;
                info!(order_number = %order.order_number, "Delivered order removed");
                return Ok(RemovalOutcome::Deleted);
            }
            OrderStatus::Cancelled => {
                self.hide_from_admin(order_id).await?;
                return Ok(RemovalOutcome::HiddenFromAdmin);
            }
            _ => {}
        }

        let now = self.clock.now();
        let mut workflow = Workflow::new("remove_order");

        // Step 1: Tell the customer before the order changes under them
        if notify_customer {
            let notice = Notification::order_removed(&order, reason, now);
            workflow.best_effort("notify_customer", self.notifications.send(notice).await);
        } else {
            workflow.skip("notify_customer");
        }

        // Step 2: Return the reserved stock
        self.restock_items(&mut workflow, &order).await;

        // Step 3: Archive
        order.archive(ArchivedBy::Admin, reason, now, self.retention);
        let saved = workflow.fatal("archive", self.orders.replace(order_id, &order).await)?;

        info!(order_number = %saved.order_number, "Order removed by admin and archived");
        Ok(RemovalOutcome::Archived(ArchivedOrder {
            order: saved,
            report: workflow.finish(),
        }))
    }

    /// Customer-initiated cancellation of one of their own orders.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str, reason: &str) -> Result<ArchivedOrder, LifecycleError> {
        let user = self
            .session
            .current_user()
            .ok_or(LifecycleError::NotAuthenticated)?;
        if reason.trim().is_empty() {
            return Err(LifecycleError::MissingReason);
        }
        let mut order = self.get_order(order_id).await?;
        if !order.belongs_to(&user.email) {
            return Err(LifecycleError::NotOrderOwner(order_id.to_string()));
        }
        if !self.can_cancel_order(&order) {
            return Err(LifecycleError::CancellationNotAllowed(order.order_status));
        }

        let now = self.clock.now();
        let mut workflow = Workflow::new("cancel_order");

        // Step 1: Return the reserved stock
        self.restock_items(&mut workflow, &order).await;

        // Step 2: Archive
        order.archive(ArchivedBy::Customer, reason, now, self.retention);
        order.visible_to_admin = Some(true);
        order.visible_to_customer = Some(true);
        let saved = workflow.fatal("archive", self.orders.replace(order_id, &order).await)?;

        // Step 3: Refund notice, unless nothing was paid yet
        if saved.payment_method.is_cash_on_delivery() {
            workflow.skip("notify_refund");
        } else {
            let notice = Notification::customer_refund(&saved, reason, now);
            workflow.best_effort("notify_refund", self.notifications.send(notice).await);
        }

        // Step 4: Tell the admins
        let notice = Notification::cancelled_by_customer(&saved, reason, now);
        workflow.best_effort("notify_admin", self.notifications.send(notice).await);

        info!(order_number = %saved.order_number, "Order cancelled by customer");
        Ok(ArchivedOrder {
            order: saved,
            report: workflow.finish(),
        })
    }

    pub fn can_cancel_order(&self, order: &Order) -> bool {
        order.can_cancel()
    }

    async fn restock_items(&self, workflow: &mut Workflow, order: &Order) {
        if order.order_status == OrderStatus::Delivered {
            return;
        }
        for item in &order.items {
            let restocked = self.inventory.restock(&item.product_id, item.quantity).await;
            if let Some(product) = workflow.best_effort("restock", restocked) {
                info!(product_id = %product.id, quantity = item.quantity, stock = product.stock, "Restocked");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn hide_from_admin(&self, order_id: &str) -> Result<Order, LifecycleError> {
        self.get_order(order_id).await?;
        let saved = self
            .orders
            .patch(order_id, json!({ "visibleToAdmin": false }))
            .await?;
        info!(order_number = %saved.order_number, "Order hidden from admin view");
        Ok(saved)
    }

    /// Removes a finished order from the current customer's history.
    #[instrument(skip(self))]
    pub async fn hide_from_customer(&self, order_id: &str) -> Result<Order, LifecycleError> {
        let user = self
            .session
            .current_user()
            .ok_or(LifecycleError::NotAuthenticated)?;
        let order = self.get_order(order_id).await?;
        if !order.belongs_to(&user.email) {
            return Err(LifecycleError::NotOrderOwner(order_id.to_string()));
        }
        let saved = self
            .orders
            .patch(order_id, json!({ "visibleToCustomer": false }))
            .await?;
        info!(order_number = %saved.order_number, "Order hidden from customer history");
        Ok(saved)
    }

    // =========================================================================
    // Views
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn admin_orders(&self, filter: &AdminOrderFilter) -> Result<Vec<Order>, LifecycleError> {
        let mut orders: Vec<Order> = self
            .orders
            .list_decodable()
            .await?
            .into_iter()
            .filter(|o| o.is_visible_to_admin() && filter.matches(o))
            .collect();
        sort_for_listing(&mut orders);
        Ok(orders)
    }

    /// Orders of the logged-in customer, matched by email.
    #[instrument(skip(self))]
    pub async fn customer_orders(&self) -> Result<Vec<Order>, LifecycleError> {
        let user = self
            .session
            .current_user()
            .ok_or(LifecycleError::NotAuthenticated)?;
        let mut orders: Vec<Order> = self
            .orders
            .list_decodable()
            .await?
            .into_iter()
            .filter(|o| o.belongs_to(&user.email) && o.is_visible_to_customer())
            .collect();
        sort_for_listing(&mut orders);
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn order_by_number(&self, order_number: &str) -> Result<Order, LifecycleError> {
        self.orders
            .list_where("orderNumber", order_number)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LifecycleError::OrderNotFound(order_number.to_string()))
    }

    pub async fn order_tracking(&self, order_id: &str) -> Result<Vec<OrderTracking>, LifecycleError> {
        Ok(self.get_order(order_id).await?.tracking_history)
    }

    pub async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, LifecycleError> {
        Ok(self
            .orders
            .list_decodable()
            .await?
            .into_iter()
            .filter(|o| o.order_status == status)
            .collect())
    }

    /// Pending and processing orders.
    pub async fn orders_needing_attention(&self) -> Result<Vec<Order>, LifecycleError> {
        Ok(self
            .orders
            .list_decodable()
            .await?
            .into_iter()
            .filter(|o| matches!(o.order_status, OrderStatus::Pending | OrderStatus::Processing))
            .collect())
    }

    pub async fn order_statistics(&self) -> Result<OrderStatistics, LifecycleError> {
        Ok(OrderStatistics::tally(&self.orders.list_decodable().await?))
    }

    pub async fn processing_locations(&self) -> Result<Vec<ProcessingLocation>, LifecycleError> {
        Ok(self.locations.list().await?)
    }
}

impl_entity_lookup!(LifecycleClient, orders, Order, LifecycleError, order, LifecycleError::OrderNotFound);
