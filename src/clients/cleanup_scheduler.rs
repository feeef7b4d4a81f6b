use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::clock::Clock;
use crate::domain::Order;
use crate::error::StoreError;
use crate::store::{Collection, DocumentStore};

/// Default time between sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    /// Ids of expired orders whose delete failed; they are retried next sweep.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(CleanupReport),
    /// Another sweep was still running.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStats {
    pub total_archived: usize,
    pub expired_count: usize,
    pub next_cleanup: DateTime<Utc>,
}

/// Hard-deletes archived orders once their retention date has passed.
#[derive(Clone)]
pub struct AutoCleanup {
    orders: Collection<Order>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AutoCleanup {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orders: Collection::new(store),
            clock,
            interval: DEFAULT_CLEANUP_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One pass over the orders collection.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepOutcome, StoreError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sweep already in progress, skipping");
            return Ok(SweepOutcome::Skipped);
        }
        let _guard = SweepGuard(&self.running);

        let now = self.clock.now();
        let expired: Vec<Order> = self
            .orders
            .list_decodable()
            .await?
            .into_iter()
            .filter(|order| order.is_expired(now))
            .collect();
        debug!(count = expired.len(), "Found orders ready for auto-deletion");

        let mut report = CleanupReport::default();
        for order in expired {
            let Some(id) = order.id.as_deref() else { continue };
            match self.orders.delete(id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(order_id = id, error = %e, "Auto-delete failed");
                    report.failed.push(id.to_string());
                }
            }
        }
        if report.deleted > 0 {
            info!(deleted = report.deleted, "Auto-cleanup deleted expired orders");
        }
        Ok(SweepOutcome::Completed(report))
    }

    /// Sweep requested from the admin panel.
    pub async fn manual_cleanup(&self) -> Result<SweepOutcome, StoreError> {
        let outcome = self.sweep().await?;
        if let SweepOutcome::Completed(report) = &outcome {
            info!(deleted = report.deleted, "Manual cleanup completed");
        }
        Ok(outcome)
    }

    pub async fn stats(&self) -> Result<CleanupStats, StoreError> {
        let now = self.clock.now();
        let orders = self.orders.list_decodable().await?;
        let archived: Vec<&Order> = orders.iter().filter(|o| o.is_archived).collect();
        let expired_count = archived.iter().filter(|o| o.is_expired(now)).count();
        let interval = chrono::Duration::from_std(self.interval).unwrap_or(chrono::Duration::MAX);
        Ok(CleanupStats {
            total_archived: archived.len(),
            expired_count,
            next_cleanup: now.checked_add_signed(interval).unwrap_or(now),
        })
    }

    /// Sweeps now and then once per interval until the handle is shut down.
    pub fn spawn(&self) -> CleanupHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let cleanup = self.clone();
        let span = tracing::info_span!("auto_cleanup");

        let handle = tokio::spawn(
            async move {
                info!(interval_secs = cleanup.interval.as_secs(), "Starting auto-cleanup");
                let mut ticker = tokio::time::interval(cleanup.interval);
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = ticker.tick() => {
                            if let Err(e) = cleanup.sweep().await {
                                error!(error = %e, "Auto-cleanup error");
                            }
                        }
                    }
                }
                info!("Auto-cleanup stopped");
            }
            .instrument(span),
        );

        CleanupHandle { shutdown, handle }
    }
}

pub struct CleanupHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CleanupHandle {
    pub async fn shutdown(self) -> Result<(), String> {
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|e| format!("Cleanup task failed: {:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::tests::sample_address;
    use crate::domain::{ArchivedBy, CartItem, CartSnapshot, PaymentMethod, Product};
    use crate::mock_framework::{create_mock_store, expect_list, fixed_clock, seed, seeded_store, test_epoch};
    use crate::store::ORDERS;

    fn archived_order(days_until_delete: i64) -> Order {
        let product = Product::new("1", "Lamp", 10.0, 5);
        let cart = CartSnapshot::from_items(vec![CartItem::new("guest", &product, 1)]);
        let mut order = Order::place("ORD-1-1".into(), &cart, &sample_address(), &PaymentMethod::Cod, test_epoch());
        let archived_at = test_epoch() - chrono::Duration::days(30) + chrono::Duration::days(days_until_delete);
        order.archive(ArchivedBy::Admin, "test", archived_at, chrono::Duration::days(30));
        order
    }

    #[tokio::test]
    async fn sweep_deletes_only_expired_archives() {
        let (store, _handle) = seeded_store(&[]).await;
        let clock = fixed_clock();
        let product = Product::new("1", "Lamp", 10.0, 5);
        let live = Order::place(
            "ORD-2-2".into(),
            &CartSnapshot::from_items(vec![CartItem::new("guest", &product, 1)]),
            &sample_address(),
            &PaymentMethod::Cod,
            test_epoch(),
        );
        seed(&store, &[archived_order(-1), archived_order(0), archived_order(2), live]).await;
        let cleanup = AutoCleanup::new(Arc::clone(&store), clock.clone());

        let stats = cleanup.stats().await.unwrap();
        assert_eq!((stats.total_archived, stats.expired_count), (3, 2));
        assert_eq!(stats.next_cleanup, test_epoch() + chrono::Duration::hours(1));

        assert_eq!(
            cleanup.sweep().await.unwrap(),
            SweepOutcome::Completed(CleanupReport { deleted: 2, failed: vec![] })
        );
        // Survives any number of sweeps before its date.
        for _ in 0..3 {
            cleanup.sweep().await.unwrap();
        }
        assert_eq!(store.list(ORDERS, None).await.unwrap().len(), 2);

        clock.advance(chrono::Duration::days(2));
        assert_eq!(
            cleanup.manual_cleanup().await.unwrap(),
            SweepOutcome::Completed(CleanupReport { deleted: 1, failed: vec![] })
        );
        assert_eq!(store.list(ORDERS, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_order_does_not_block_the_sweep() {
        let (store, _handle) = seeded_store(&[]).await;
        seed(&store, &[archived_order(-1)]).await;
        store
            .create(ORDERS, serde_json::json!({"orderNumber": "ORD-legacy", "total": 1}))
            .await
            .unwrap();
        let cleanup = AutoCleanup::new(Arc::clone(&store), fixed_clock());

        assert_eq!(cleanup.stats().await.unwrap().expired_count, 1);
        assert_eq!(
            cleanup.sweep().await.unwrap(),
            SweepOutcome::Completed(CleanupReport { deleted: 1, failed: vec![] })
        );
        let left = store.list(ORDERS, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["orderNumber"], "ORD-legacy");
    }

    #[tokio::test]
    async fn overlapping_sweep_is_skipped() {
        let (store, mut rx) = create_mock_store(4);
        let cleanup = AutoCleanup::new(store, fixed_clock());

        let first = {
            let cleanup = cleanup.clone();
            tokio::spawn(async move { cleanup.sweep().await })
        };
        let (collection, responder) = expect_list(&mut rx).await.expect("Expected orders List");
        assert_eq!(collection, ORDERS);

        assert_eq!(cleanup.sweep().await, Ok(SweepOutcome::Skipped));

        responder.send(Ok(vec![])).unwrap();
        assert_eq!(
            first.await.unwrap(),
            Ok(SweepOutcome::Completed(CleanupReport::default()))
        );
    }

    #[tokio::test]
    async fn spawned_task_sweeps_immediately_and_stops_on_shutdown() {
        let (store, _handle) = seeded_store(&[]).await;
        seed(&store, &[archived_order(-5)]).await;
        let cleanup = AutoCleanup::new(Arc::clone(&store), fixed_clock())
            .with_interval(Duration::from_millis(20));

        let handle = cleanup.spawn();
        for _ in 0..50 {
            if store.list(ORDERS, None).await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.list(ORDERS, None).await.unwrap().is_empty());
        assert_eq!(handle.shutdown().await, Ok(()));
    }
}
