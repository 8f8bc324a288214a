use crate::application::commands::RefundRequested;
use crate::application::payment_service::PaymentService;
use crate::domain::payment::Payment;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{error, info};

/// A message as handed over by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub partition: i32,
    pub offset: i64,
    pub payload: T,
}

/// Manual acknowledgment of a delivery. Unacknowledged deliveries are
/// redelivered by the transport.
pub trait Acknowledgment: Send + Sync {
    fn acknowledge(&self, partition: i32, offset: i64);
}

/// Tracks the last committed offset of a single partition.
#[derive(Debug)]
pub struct CommittedOffsets {
    last: AtomicI64,
}

impl CommittedOffsets {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(-1),
        }
    }

    pub fn last_committed(&self) -> Option<i64> {
        match self.last.load(Ordering::SeqCst) {
            -1 => None,
            offset => Some(offset),
        }
    }
}

impl Default for CommittedOffsets {
    fn default() -> Self {
        Self::new()
    }
}

impl Acknowledgment for CommittedOffsets {
    fn acknowledge(&self, _partition: i32, offset: i64) {
        self.last.fetch_max(offset, Ordering::SeqCst);
    }
}

/// Runs refund compensation for `RefundRequested` messages.
///
/// A delivery is acknowledged only after the refund went through, including
/// persistence and event publication. On any error it is left unacknowledged
/// so the transport redelivers it; a payment that already reached a final
/// status then fails fast on its state guard instead of being refunded twice.
pub struct RefundRequestedConsumer {
    service: Arc<PaymentService>,
}

impl RefundRequestedConsumer {
    pub fn new(service: Arc<PaymentService>) -> Self {
        Self { service }
    }

    pub async fn handle(
        &self,
        delivery: Delivery<RefundRequested>,
        ack: &dyn Acknowledgment,
    ) -> Result<Payment> {
        let event = &delivery.payload;
        info!(
            partition = delivery.partition,
            offset = delivery.offset,
            payment_id = %event.payment_id,
            order_id = %event.order_id,
            "refund requested"
        );

        match self
            .service
            .cancel_payment(&event.payment_id, &event.order_id, &event.refund_reason)
            .await
        {
            Ok(payment) => {
                ack.acknowledge(delivery.partition, delivery.offset);
                info!(
                    payment_id = %payment.id_value(),
                    status = %payment.status(),
                    "refund request handled"
                );
                Ok(payment)
            }
            Err(err) => {
                error!(
                    payment_id = %event.payment_id,
                    offset = delivery.offset,
                    code = err.code(),
                    error = %err,
                    "refund request failed, leaving it unacknowledged"
                );
                Err(err)
            }
        }
    }
}
