use super::require_text;
use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How long a PG approval stays acceptable for verification.
pub const APPROVAL_VALIDITY_SECS: i64 = 60 * 60;

/// Identifiers the payment gateway assigned to a transaction.
///
/// Provider and PG payment id are mandatory. The refund id and refund time
/// are always attached together through [`PgInfo::with_refund`]; a later
/// partial refund replaces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgInfo {
    pg_provider: String,
    pg_payment_id: String,
    pg_payment_key: Option<String>,
    pg_transaction_id: Option<String>,
    pg_approved_at: Option<DateTime<Utc>>,
    pg_refund_id: Option<String>,
    pg_refunded_at: Option<DateTime<Utc>>,
}

impl PgInfo {
    pub fn new(
        pg_provider: impl Into<String>,
        pg_payment_id: impl Into<String>,
        pg_payment_key: Option<String>,
        pg_transaction_id: Option<String>,
        pg_approved_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        Ok(Self {
            pg_provider: require_text(pg_provider.into(), "pg_provider")?,
            pg_payment_id: require_text(pg_payment_id.into(), "pg_payment_id")?,
            pg_payment_key,
            pg_transaction_id,
            pg_approved_at,
            pg_refund_id: None,
            pg_refunded_at: None,
        })
    }

    pub fn with_refund(&self, pg_refund_id: impl Into<String>, refunded_at: DateTime<Utc>) -> Self {
        Self {
            pg_refund_id: Some(pg_refund_id.into()),
            pg_refunded_at: Some(refunded_at),
            ..self.clone()
        }
    }

    pub fn is_refunded(&self) -> bool {
        self.pg_refund_id.is_some() && self.pg_refunded_at.is_some()
    }

    /// An approval is valid for one hour; a missing approval time is never valid.
    pub fn is_approval_time_valid(&self) -> bool {
        self.is_approval_time_valid_at(Utc::now())
    }

    pub fn is_approval_time_valid_at(&self, now: DateTime<Utc>) -> bool {
        let earliest = now - TimeDelta::seconds(APPROVAL_VALIDITY_SECS);
        self.pg_approved_at
            .is_some_and(|approved_at| approved_at > earliest)
    }

    pub fn pg_provider(&self) -> &str {
        &self.pg_provider
    }

    pub fn pg_payment_id(&self) -> &str {
        &self.pg_payment_id
    }

    pub fn pg_payment_key(&self) -> Option<&str> {
        self.pg_payment_key.as_deref()
    }

    pub fn pg_transaction_id(&self) -> Option<&str> {
        self.pg_transaction_id.as_deref()
    }

    pub fn pg_approved_at(&self) -> Option<DateTime<Utc>> {
        self.pg_approved_at
    }

    pub fn pg_refund_id(&self) -> Option<&str> {
        self.pg_refund_id.as_deref()
    }

    pub fn pg_refunded_at(&self) -> Option<DateTime<Utc>> {
        self.pg_refunded_at
    }
}
