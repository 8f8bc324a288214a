use super::amount::PaymentAmountInfo;
use super::parties::{PayeeInfo, PayerInfo};
use super::payment_id::PaymentId;
use super::pg_info::PgInfo;
use super::require_text;
use super::status::{PaymentStatus, VerificationStatus};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Soft-delete marker. Deleted payments stay in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub deleted_by: String,
    pub deleted_at: DateTime<Utc>,
}

/// The payment aggregate.
///
/// All state changes go through the transition methods below; each one checks
/// its source status before touching any field, so a rejected call leaves the
/// payment exactly as it was. The identity stays `None` until the store
/// persists the payment for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: Option<PaymentId>,
    order_id: String,
    amount_info: PaymentAmountInfo,
    pg_info: PgInfo,
    payer_info: PayerInfo,
    payee_info: PayeeInfo,
    status: PaymentStatus,
    verification_status: VerificationStatus,
    failure_reason: Option<String>,
    refund_reason: Option<String>,
    created_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    deletion: Option<Deletion>,
    #[serde(default)]
    version: u64,
}

impl Payment {
    /// Creates an unpersisted payment in `PENDING` status.
    pub fn create(
        order_id: impl Into<String>,
        amount: Decimal,
        pg_info: PgInfo,
        payer_info: PayerInfo,
        payee_info: PayeeInfo,
    ) -> Result<Self> {
        Ok(Self {
            id: None,
            order_id: require_text(order_id.into(), "order_id")?,
            amount_info: PaymentAmountInfo::of(amount)?,
            pg_info,
            payer_info,
            payee_info,
            status: PaymentStatus::Pending,
            verification_status: VerificationStatus::Pending,
            failure_reason: None,
            refund_reason: None,
            created_at: Utc::now(),
            verified_at: None,
            refunded_at: None,
            updated_at: None,
            deletion: None,
            version: 0,
        })
    }

    // Verification

    pub fn start_verification(&mut self) -> Result<()> {
        self.require_status(PaymentStatus::Pending, "start verification")?;
        self.status = PaymentStatus::Verifying;
        Ok(())
    }

    /// Marks the payment verified. Fails with `PaymentExpired` when the PG
    /// approval is older than one hour.
    pub fn verify_success(&mut self) -> Result<()> {
        self.require_status(PaymentStatus::Verifying, "complete verification")?;
        if !self.pg_info.is_approval_time_valid() {
            return Err(PaymentError::PaymentExpired {
                approved_at: self.pg_info.pg_approved_at(),
            });
        }

        self.status = PaymentStatus::Verified;
        self.verification_status = VerificationStatus::Success;
        self.verified_at = Some(Utc::now());
        Ok(())
    }

    pub fn verify_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        self.require_status(PaymentStatus::Verifying, "fail verification")?;
        self.status = PaymentStatus::VerificationFailed;
        self.verification_status = VerificationStatus::Failed;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Checks the PG amount against what the caller expected. Never mutates.
    pub fn validate_amount(&self, expected: Decimal) -> Result<()> {
        if self.amount_info.matches_amount(expected) {
            Ok(())
        } else {
            Err(PaymentError::AmountMismatch {
                actual: self.amount_info.amount(),
                expected,
            })
        }
    }

    // Refunds

    pub fn start_refund(&mut self, amount: Decimal, reason: impl Into<String>) -> Result<()> {
        if !self.status.is_refundable() {
            return Err(PaymentError::RefundNotAllowed(self.status));
        }
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidRefundAmount(format!(
                "refund amount must be positive, got {amount}"
            )));
        }
        let refundable = self.amount_info.refundable_amount();
        if amount > refundable {
            return Err(PaymentError::RefundAmountExceedsPayment {
                requested: amount,
                refundable,
            });
        }

        self.status = PaymentStatus::Refunding;
        self.refund_reason = Some(reason.into());
        Ok(())
    }

    /// Applies a refund the PG confirmed. Ends in `REFUNDED` once nothing is
    /// left to refund, `PARTIALLY_REFUNDED` otherwise.
    pub fn complete_refund(&mut self, amount: Decimal, pg_refund_id: impl Into<String>) -> Result<()> {
        self.require_status(PaymentStatus::Refunding, "complete refund")?;
        let amount_info = self.amount_info.with_refund(amount)?;

        let now = Utc::now();
        self.pg_info = self.pg_info.with_refund(pg_refund_id, now);
        self.status = if amount_info.is_fully_refunded() {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.amount_info = amount_info;
        self.refunded_at = Some(now);
        Ok(())
    }

    pub fn fail_refund(&mut self, reason: impl Into<String>) -> Result<()> {
        self.require_status(PaymentStatus::Refunding, "fail refund")?;
        self.status = PaymentStatus::RefundFailed;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.status.is_final_state() {
            return Err(PaymentError::CannotCancel(self.status));
        }
        self.status = PaymentStatus::Cancelled;
        self.refund_reason = Some(reason.into());
        Ok(())
    }

    fn require_status(&self, required: PaymentStatus, operation: &'static str) -> Result<()> {
        if self.status == required {
            Ok(())
        } else {
            Err(PaymentError::InvalidStatus {
                operation,
                required,
                actual: self.status,
            })
        }
    }

    // Persistence hooks

    /// Binds the identity minted by the store. A payment is given an identity
    /// exactly once.
    pub fn assign_id(&mut self, id: PaymentId) -> Result<()> {
        if self.id.is_some() {
            return Err(PaymentError::IdentityAlreadyAssigned);
        }
        self.id = Some(id);
        Ok(())
    }

    /// Stamps a committed write. The store compares `version` with its own
    /// copy before every update and rejects a stale one.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = Some(at);
    }

    pub fn mark_deleted(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        self.deletion = Some(Deletion {
            deleted_by: deleted_by.into(),
            deleted_at: at,
        });
        self.updated_at = Some(at);
    }

    // Queries

    pub fn id(&self) -> Option<&PaymentId> {
        self.id.as_ref()
    }

    /// String form of the identity, empty while unpersisted.
    pub fn id_value(&self) -> &str {
        self.id.as_ref().map(PaymentId::as_str).unwrap_or_default()
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn amount_info(&self) -> &PaymentAmountInfo {
        &self.amount_info
    }

    pub fn pg_info(&self) -> &PgInfo {
        &self.pg_info
    }

    pub fn payer_info(&self) -> &PayerInfo {
        &self.payer_info
    }

    pub fn payee_info(&self) -> &PayeeInfo {
        &self.payee_info
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn verification_status(&self) -> VerificationStatus {
        self.verification_status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn refund_reason(&self) -> Option<&str> {
        self.refund_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Number of committed writes, zero while unpersisted.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn deletion(&self) -> Option<&Deletion> {
        self.deletion.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion.is_some()
    }

    pub fn is_verified(&self) -> bool {
        self.status.is_verified()
    }

    pub fn is_refundable(&self) -> bool {
        self.status.is_refundable() && self.amount_info.is_refundable()
    }

    pub fn is_fully_refunded(&self) -> bool {
        self.status == PaymentStatus::Refunded
    }

    pub fn is_partially_refunded(&self) -> bool {
        self.status == PaymentStatus::PartiallyRefunded
    }

    pub fn amount(&self) -> Decimal {
        self.amount_info.amount()
    }

    pub fn refunded_amount(&self) -> Decimal {
        self.amount_info.refunded_amount()
    }

    pub fn refundable_amount(&self) -> Decimal {
        self.amount_info.refundable_amount()
    }
}
