use crate::domain::events::{PaymentRefundFailed, PaymentRefunded};
use crate::domain::payment::Payment;
use crate::domain::payment_id::PaymentId;
use crate::domain::ports::{PaymentEventPublisher, PaymentStore};
use crate::domain::search::{Page, PageRequest, PaymentSearch, sort_newest_first};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    payments: HashMap<PaymentId, Payment>,
    by_pg_payment_id: HashMap<String, PaymentId>,
    by_order_id: HashMap<String, PaymentId>,
}

impl Inner {
    /// Identity of the stored copy `payment` was loaded from, provided no
    /// write committed since.
    fn check_current(&self, payment: &Payment) -> Result<PaymentId> {
        let id = payment
            .id()
            .ok_or_else(|| PaymentError::PaymentNotFound("unsaved payment".to_string()))?;
        let stored = self
            .payments
            .get(id)
            .ok_or_else(|| PaymentError::PaymentNotFound(id.to_string()))?;
        if stored.version() != payment.version() {
            return Err(PaymentError::ConcurrentModification(id.to_string()));
        }
        Ok(id.clone())
    }
}

/// A thread-safe in-memory payment store.
///
/// Payments and both unique indexes live behind one `RwLock`, so the
/// uniqueness and version checks happen under the same guard as the write.
/// `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments, soft-deleted ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every stored payment, soft-deleted ones included, newest first.
    pub async fn all(&self) -> Vec<Payment> {
        let inner = self.inner.read().await;
        let mut payments: Vec<Payment> = inner.payments.values().cloned().collect();
        sort_newest_first(&mut payments);
        payments
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn save(&self, mut payment: Payment) -> Result<Payment> {
        let mut inner = self.inner.write().await;

        let id = if payment.id().is_some() {
            inner.check_current(&payment)?
        } else {
            let pg_payment_id = payment.pg_info().pg_payment_id().to_string();
            let order_id = payment.order_id().to_string();
            if inner.by_pg_payment_id.contains_key(&pg_payment_id) {
                return Err(PaymentError::DuplicatePgPayment(pg_payment_id));
            }
            if inner.by_order_id.contains_key(&order_id) {
                return Err(PaymentError::DuplicateOrder(order_id));
            }
            let id = PaymentId::generate();
            payment.assign_id(id.clone())?;
            inner.by_pg_payment_id.insert(pg_payment_id, id.clone());
            inner.by_order_id.insert(order_id, id.clone());
            id
        };

        payment.touch(Utc::now());
        inner.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .get(id)
            .filter(|payment| !payment.is_deleted())
            .cloned())
    }

    async fn find_by_id_including_deleted(&self, id: &PaymentId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.get(id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_order_id
            .get(order_id)
            .and_then(|id| inner.payments.get(id))
            .filter(|payment| !payment.is_deleted())
            .cloned())
    }

    async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_pg_payment_id
            .get(pg_payment_id)
            .and_then(|id| inner.payments.get(id))
            .filter(|payment| !payment.is_deleted())
            .cloned())
    }

    async fn exists_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.by_pg_payment_id.contains_key(pg_payment_id))
    }

    async fn exists_by_order_id(&self, order_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.by_order_id.contains_key(order_id))
    }

    async fn delete(&self, mut payment: Payment, deleted_by: &str) -> Result<Payment> {
        let mut inner = self.inner.write().await;
        let id = inner.check_current(&payment)?;

        let now = Utc::now();
        payment.mark_deleted(deleted_by, now);
        payment.touch(now);
        inner.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn search(&self, criteria: &PaymentSearch, page: PageRequest) -> Result<Page<Payment>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Payment> = inner
            .payments
            .values()
            .filter(|payment| criteria.matches(payment))
            .cloned()
            .collect();
        sort_newest_first(&mut matches);
        Ok(Page::from_sorted(matches, page))
    }
}

/// An event captured by [`InMemoryEventPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedEvent {
    Refunded(PaymentRefunded),
    RefundFailed(PaymentRefundFailed),
}

/// Publisher that keeps every event in memory, in publication order.
#[derive(Default, Clone)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<PublishedEvent>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PublishedEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl PaymentEventPublisher for InMemoryEventPublisher {
    async fn publish_refunded(&self, event: PaymentRefunded) -> Result<()> {
        self.events.write().await.push(PublishedEvent::Refunded(event));
        Ok(())
    }

    async fn publish_refund_failed(&self, event: PaymentRefundFailed) -> Result<()> {
        self.events
            .write()
            .await
            .push(PublishedEvent::RefundFailed(event));
        Ok(())
    }
}
