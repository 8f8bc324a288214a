use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Input of the verify-and-register use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentCommand {
    pub order_id: String,
    pub pg_provider: String,
    pub pg_payment_id: String,
    pub pg_payment_key: String,
    pub expected_amount: Decimal,
    pub payer_company_id: String,
    pub payer_name: String,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payer_phone: Option<String>,
    pub payee_company_id: String,
    pub payee_name: String,
}

/// Compensation request sent by the order saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequested {
    pub payment_id: String,
    pub order_id: String,
    pub refund_reason: String,
    #[serde(default)]
    pub requested_at: Option<NaiveDateTime>,
}

/// One line of the inbound command stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundCommand {
    VerifyPayment(VerifyPaymentCommand),
    RefundRequested(RefundRequested),
}
