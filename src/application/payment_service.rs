use super::commands::VerifyPaymentCommand;
use crate::domain::events::{PaymentRefundFailed, PaymentRefunded};
use crate::domain::gateway::{PgCancelRequest, PgPaymentResponse};
use crate::domain::parties::{PayeeInfo, PayerInfo};
use crate::domain::payment::Payment;
use crate::domain::payment_id::PaymentId;
use crate::domain::pg_info::PgInfo;
use crate::domain::ports::{EventPublisherBox, PaymentGatewayBox, PaymentStoreBox};
use crate::domain::search::{Page, PageRequest, PaymentSearch};
use crate::error::{GatewayError, PaymentError, Result};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

/// Orchestrates payment verification and refund compensation.
///
/// Every operation works on a single payment aggregate: load or create it,
/// drive it through its state machine, persist it, and for refunds announce
/// the outcome. Failures after the aggregate exists are written back to the
/// store before they are returned, so no failed attempt goes unrecorded.
pub struct PaymentService {
    store: PaymentStoreBox,
    gateway: PaymentGatewayBox,
    publisher: EventPublisherBox,
}

impl PaymentService {
    pub fn new(
        store: PaymentStoreBox,
        gateway: PaymentGatewayBox,
        publisher: EventPublisherBox,
    ) -> Self {
        Self {
            store,
            gateway,
            publisher,
        }
    }

    /// Verifies a PG transaction against the expected amount and registers it.
    ///
    /// Registration is idempotent per PG payment id: a second call returns the
    /// payment stored by the first one without contacting the gateway.
    pub async fn verify_and_register(&self, command: VerifyPaymentCommand) -> Result<Payment> {
        info!(
            order_id = %command.order_id,
            pg_provider = %command.pg_provider,
            pg_payment_id = %command.pg_payment_id,
            "payment verification started"
        );

        if let Some(existing) = self
            .store
            .find_by_pg_payment_id(&command.pg_payment_id)
            .await?
        {
            info!(
                payment_id = %existing.id_value(),
                pg_payment_id = %command.pg_payment_id,
                "payment already registered"
            );
            return Ok(existing);
        }
        if self
            .store
            .exists_by_pg_payment_id(&command.pg_payment_id)
            .await?
        {
            return Err(PaymentError::DuplicatePgPayment(command.pg_payment_id));
        }
        if self.store.exists_by_order_id(&command.order_id).await? {
            warn!(
                order_id = %command.order_id,
                pg_payment_id = %command.pg_payment_id,
                "order already has a payment under another PG payment id"
            );
            return Err(PaymentError::DuplicateOrder(command.order_id));
        }

        let response = self.fetch_approved_payment(&command.pg_payment_key).await?;

        let pg_info = PgInfo::new(
            command.pg_provider,
            command.pg_payment_id,
            Some(command.pg_payment_key),
            response.transaction_key,
            response.approved_at,
        )?;
        let payer_info = PayerInfo::new(
            command.payer_company_id,
            command.payer_name,
            command.payer_email,
            command.payer_phone,
        )?;
        let payee_info = PayeeInfo::new(command.payee_company_id, command.payee_name)?;

        let mut payment = Payment::create(
            command.order_id,
            response.total_amount,
            pg_info,
            payer_info,
            payee_info,
        )?;
        payment.start_verification()?;

        let outcome = match payment.validate_amount(command.expected_amount) {
            Ok(()) => payment.verify_success(),
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            warn!(
                order_id = %payment.order_id(),
                pg_payment_id = %payment.pg_info().pg_payment_id(),
                error = %err,
                "payment verification failed"
            );
            return Err(self.record_verification_failure(payment, err).await);
        }

        let saved = self.insert_verified(payment).await?;
        info!(
            payment_id = %saved.id_value(),
            order_id = %saved.order_id(),
            amount = %saved.amount(),
            "payment verified"
        );
        Ok(saved)
    }

    /// Refunds the whole remaining balance of a payment as saga compensation.
    ///
    /// `REFUNDING` is persisted before the gateway is called, so of two
    /// overlapping deliveries only one reaches the gateway: the other fails
    /// on the state guard or with `ConcurrentModification`. The outcome is
    /// persisted and published either way. A gateway failure leaves the
    /// payment in `REFUND_FAILED` and is returned as `RefundProcessingFailed`.
    pub async fn cancel_payment(
        &self,
        payment_id: &str,
        order_id: &str,
        reason: &str,
    ) -> Result<Payment> {
        info!(payment_id, order_id, reason, "payment cancellation started");

        let mut payment = self.find_by_id(payment_id).await?;
        if payment.order_id() != order_id {
            return Err(PaymentError::OrderMismatch {
                payment_id: payment_id.to_string(),
                order_id: order_id.to_string(),
            });
        }

        let refund_amount = payment.refundable_amount();
        payment.start_refund(refund_amount, reason)?;
        let mut payment = self.store.save(payment).await.inspect_err(|err| {
            warn!(payment_id, error = %err, "refund claim rejected");
        })?;
        debug!(
            payment_id,
            status = %payment.status(),
            status_description = payment.status().description(),
            "refund claimed"
        );

        match self.execute_refund(&mut payment, refund_amount, reason).await {
            Ok(()) => {
                let saved = self.store.save(payment).await?;
                info!(
                    payment_id = %saved.id_value(),
                    refund_amount = %refund_amount,
                    status = %saved.status(),
                    "payment cancelled"
                );

                let event = PaymentRefunded::from(&saved, refund_amount, reason);
                if let Err(err) = self.publisher.publish_refunded(event).await {
                    error!(payment_id = %saved.id_value(), error = %err, "failed to publish refund event");
                }
                Ok(saved)
            }
            Err(cause) => {
                let message = cause.to_string();
                payment.fail_refund(message.as_str())?;
                let saved = self.store.save(payment).await?;
                error!(
                    payment_id = %saved.id_value(),
                    error = %message,
                    "payment cancellation failed"
                );

                let event = PaymentRefundFailed::from(&saved, refund_amount, message);
                if let Err(err) = self.publisher.publish_refund_failed(event).await {
                    error!(payment_id = %saved.id_value(), error = %err, "failed to publish refund failure event");
                }
                Err(PaymentError::RefundProcessingFailed {
                    source: Box::new(cause),
                })
            }
        }
    }

    /// Soft-deletes a payment. It stays in the store but lookups stop
    /// returning it.
    pub async fn delete_payment(&self, payment_id: &str, deleted_by: &str) -> Result<Payment> {
        let payment = self.find_by_id(payment_id).await?;
        let deleted = self.store.delete(payment, deleted_by).await?;
        info!(payment_id, deleted_by, "payment deleted");
        Ok(deleted)
    }

    pub async fn search_payments(
        &self,
        criteria: &PaymentSearch,
        page: PageRequest,
    ) -> Result<Page<Payment>> {
        self.store.search(criteria, page).await
    }

    pub async fn find_by_id(&self, payment_id: &str) -> Result<Payment> {
        let id = PaymentId::parse(payment_id)?;
        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<Payment> {
        self.store
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(format!("order {order_id}")))
    }

    pub async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>> {
        self.store.find_by_pg_payment_id(pg_payment_id).await
    }

    pub async fn is_verified(&self, payment_id: &str) -> Result<bool> {
        Ok(self.find_by_id(payment_id).await?.is_verified())
    }

    pub async fn is_refundable(&self, payment_id: &str) -> Result<bool> {
        Ok(self.find_by_id(payment_id).await?.is_refundable())
    }

    async fn fetch_approved_payment(&self, payment_key: &str) -> Result<PgPaymentResponse> {
        let response = self.gateway.get_payment(payment_key).await.map_err(|err| {
            error!(pg_payment_key = payment_key, error = %err, "PG payment lookup failed");
            PaymentError::PgConnectionFailed(err)
        })?;
        check_pg_status(&response)?;
        debug!(
            pg_payment_key = payment_key,
            total_amount = %response.total_amount,
            "PG payment approved"
        );
        Ok(response)
    }

    async fn record_verification_failure(
        &self,
        mut payment: Payment,
        cause: PaymentError,
    ) -> PaymentError {
        if let Err(err) = payment.verify_failed(cause.to_string()) {
            error!(error = %err, "could not mark payment as verification failed");
            return cause;
        }
        match self.store.save(payment).await {
            Ok(saved) => info!(
                payment_id = %saved.id_value(),
                status = %saved.status(),
                "verification failure recorded"
            ),
            Err(err) => error!(error = %err, "failed to record verification failure"),
        }
        cause
    }

    /// First save of a freshly verified payment. Losing the insert race to a
    /// concurrent registration of the same PG payment returns the winner.
    async fn insert_verified(&self, payment: Payment) -> Result<Payment> {
        match self.store.save(payment).await {
            Err(PaymentError::DuplicatePgPayment(pg_payment_id)) => {
                warn!(pg_payment_id = %pg_payment_id, "concurrent registration detected, returning stored payment");
                self.store
                    .find_by_pg_payment_id(&pg_payment_id)
                    .await?
                    .ok_or(PaymentError::DuplicatePgPayment(pg_payment_id))
            }
            other => other,
        }
    }

    async fn execute_refund(
        &self,
        payment: &mut Payment,
        refund_amount: Decimal,
        reason: &str,
    ) -> Result<()> {
        let payment_key = payment
            .pg_info()
            .pg_payment_key()
            .ok_or(PaymentError::InvalidValue {
                field: "pg_payment_key",
            })?
            .to_string();

        let response = self
            .gateway
            .cancel_payment(&payment_key, PgCancelRequest::full_cancel(reason))
            .await?;
        let refund_id = response
            .latest_refund_id()
            .ok_or_else(|| {
                GatewayError::MalformedResponse("cancel response has no cancel entries".into())
            })?
            .to_string();

        payment.complete_refund(refund_amount, refund_id)
    }
}

/// Only `DONE` payments can be registered.
fn check_pg_status(response: &PgPaymentResponse) -> Result<()> {
    let status = response.status;
    if status.is_done() {
        Ok(())
    } else if status.is_canceled() {
        Err(PaymentError::PaymentAlreadyProcessed)
    } else if status.is_failed() {
        Err(PaymentError::PaymentVerificationFailed(format!(
            "PG payment ended in {} status",
            status.as_str()
        )))
    } else {
        Err(PaymentError::PgPaymentNotApproved(status.as_str().to_string()))
    }
}
