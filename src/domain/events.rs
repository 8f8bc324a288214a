//! Refund outcome events announced to downstream services.

use super::payment::Payment;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRefunded {
    pub payment_id: String,
    pub order_id: String,
    pub refund_amount: Decimal,
    pub total_refunded_amount: Decimal,
    pub reason: String,
    pub pg_refund_id: Option<String>,
    pub full_refund: bool,
    pub refunded_at: DateTime<Utc>,
}

impl PaymentRefunded {
    /// Builds the event from a payment that just completed a refund of
    /// `refund_amount`.
    pub fn from(payment: &Payment, refund_amount: Decimal, reason: impl Into<String>) -> Self {
        Self {
            payment_id: payment.id_value().to_string(),
            order_id: payment.order_id().to_string(),
            refund_amount,
            total_refunded_amount: payment.refunded_amount(),
            reason: reason.into(),
            pg_refund_id: payment.pg_info().pg_refund_id().map(str::to_string),
            full_refund: payment.amount_info().is_fully_refunded(),
            refunded_at: payment.refunded_at().unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRefundFailed {
    pub payment_id: String,
    pub order_id: String,
    pub requested_amount: Decimal,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
}

impl PaymentRefundFailed {
    pub fn from(payment: &Payment, requested_amount: Decimal, error_message: impl Into<String>) -> Self {
        Self {
            payment_id: payment.id_value().to_string(),
            order_id: payment.order_id().to_string(),
            requested_amount,
            error_message: error_message.into(),
            failed_at: Utc::now(),
        }
    }
}
