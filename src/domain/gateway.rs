//! Wire types exchanged with the Toss Payments API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgPaymentStatus {
    Ready,
    InProgress,
    WaitingForDeposit,
    Done,
    Canceled,
    PartialCanceled,
    Aborted,
    Expired,
    #[serde(other)]
    Unknown,
}

impl PgPaymentStatus {
    pub fn is_done(self) -> bool {
        self == Self::Done
    }

    pub fn is_canceled(self) -> bool {
        matches!(self, Self::Canceled | Self::PartialCanceled)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Aborted | Self::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::InProgress => "IN_PROGRESS",
            Self::WaitingForDeposit => "WAITING_FOR_DEPOSIT",
            Self::Done => "DONE",
            Self::Canceled => "CANCELED",
            Self::PartialCanceled => "PARTIAL_CANCELED",
            Self::Aborted => "ABORTED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgFailure {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Payment lookup response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgPaymentResponse {
    pub payment_key: String,
    pub order_id: String,
    pub status: PgPaymentStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub balance_amount: Option<Decimal>,
    #[serde(default)]
    pub supplied_amount: Option<Decimal>,
    #[serde(default)]
    pub vat: Option<Decimal>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transaction_key: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub failure: Option<PgFailure>,
}

/// Cancel request body. Leaving `cancel_amount` out cancels the whole balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgCancelRequest {
    pub cancel_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_amount: Option<Decimal>,
}

impl PgCancelRequest {
    pub fn full_cancel(reason: impl Into<String>) -> Self {
        Self {
            cancel_reason: reason.into(),
            cancel_amount: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelDetail {
    pub cancel_amount: Decimal,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    pub transaction_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgCancelResponse {
    pub payment_key: String,
    pub order_id: String,
    pub status: PgPaymentStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub balance_amount: Option<Decimal>,
    #[serde(default)]
    pub cancels: Vec<CancelDetail>,
}

impl PgCancelResponse {
    /// Transaction key of the most recent cancel entry.
    pub fn latest_refund_id(&self) -> Option<&str> {
        self.cancels
            .last()
            .map(|cancel| cancel.transaction_key.as_str())
    }
}
