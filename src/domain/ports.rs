use super::events::{PaymentRefundFailed, PaymentRefunded};
use super::gateway::{PgCancelRequest, PgCancelResponse, PgPaymentResponse};
use super::payment::Payment;
use super::payment_id::PaymentId;
use super::search::{DeletedFilter, Page, PageRequest, PaymentSearch};
use super::status::PaymentStatus;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;

/// Persistence for the payment aggregate.
///
/// Implementations must treat each `save` as one atomic write covering the
/// payment and its lookup indexes.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts or updates a payment and returns the stored copy.
    ///
    /// A payment without identity is an insert: the store mints its
    /// `PaymentId` and rejects it with `DuplicatePgPayment` or
    /// `DuplicateOrder` when another payment (deleted or not) already holds
    /// the same PG payment id or order id. A payment with identity is an
    /// update: it fails with `PaymentNotFound` when that identity is unknown
    /// and with `ConcurrentModification` when its version is behind the
    /// stored one. Every committed write bumps the version.
    async fn save(&self, payment: Payment) -> Result<Payment>;

    /// Live payment by identity. Soft-deleted payments are invisible.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>>;

    async fn find_by_id_including_deleted(&self, id: &PaymentId) -> Result<Option<Payment>>;

    /// Live payment of the order. Order ids are unique per payment.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;

    async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>>;

    /// Includes soft-deleted payments, so a PG payment id is never reused.
    async fn exists_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<bool>;

    /// Includes soft-deleted payments, so an order is never registered twice.
    async fn exists_by_order_id(&self, order_id: &str) -> Result<bool>;

    /// Soft delete, version-checked like an update. Returns the stored copy
    /// carrying the deletion mark.
    async fn delete(&self, payment: Payment, deleted_by: &str) -> Result<Payment>;

    /// Payments matching `criteria`, newest first.
    async fn search(&self, criteria: &PaymentSearch, page: PageRequest) -> Result<Page<Payment>>;

    async fn find_by_payer_company_id(&self, company_id: &str) -> Result<Vec<Payment>> {
        let criteria = PaymentSearch::by_payer_company(company_id);
        let page = self.search(&criteria, PageRequest::unpaged()).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|payment| payment.payer_info().company_id == company_id)
            .collect())
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        let page = self
            .search(&PaymentSearch::by_status(status), PageRequest::unpaged())
            .await?;
        Ok(page.items)
    }

    async fn find_verification_failed(&self) -> Result<Vec<Payment>> {
        self.find_by_status(PaymentStatus::VerificationFailed).await
    }

    /// Refundable payments where `company_id` is the payer.
    async fn find_refundable(&self, company_id: &str) -> Result<Vec<Payment>> {
        let criteria = PaymentSearch {
            deleted: DeletedFilter::Exclude,
            ..PaymentSearch::by_payer_company(company_id)
        };
        let page = self.search(&criteria, PageRequest::unpaged()).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|payment| payment.payer_info().company_id == company_id)
            .filter(Payment::is_refundable)
            .collect())
    }
}

/// Remote payment gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    async fn get_payment(
        &self,
        payment_key: &str,
    ) -> std::result::Result<PgPaymentResponse, GatewayError>;

    async fn cancel_payment(
        &self,
        payment_key: &str,
        request: PgCancelRequest,
    ) -> std::result::Result<PgCancelResponse, GatewayError>;
}

/// Outbound refund notifications. Delivery is at least once.
#[async_trait]
pub trait PaymentEventPublisher: Send + Sync {
    async fn publish_refunded(&self, event: PaymentRefunded) -> Result<()>;
    async fn publish_refund_failed(&self, event: PaymentRefundFailed) -> Result<()>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGatewayClient>;
pub type EventPublisherBox = Box<dyn PaymentEventPublisher>;
