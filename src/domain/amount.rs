use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "KRW";

/// Immutable ledger of a payment's money: the approved amount and how much of
/// it has been refunded so far.
///
/// Refunds never mutate a ledger in place; [`PaymentAmountInfo::with_refund`]
/// returns the next ledger. All comparisons are exact decimal comparisons, so
/// `10000` and `10000.00` are the same amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAmountInfo")]
pub struct PaymentAmountInfo {
    amount: Decimal,
    refunded_amount: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct RawAmountInfo {
    amount: Decimal,
    #[serde(default)]
    refunded_amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
}

impl TryFrom<RawAmountInfo> for PaymentAmountInfo {
    type Error = PaymentError;

    fn try_from(raw: RawAmountInfo) -> Result<Self> {
        let currency = raw.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
        let ledger = Self::with_currency(raw.amount, currency)?;
        if raw.refunded_amount.is_zero() {
            Ok(ledger)
        } else {
            ledger.with_refund(raw.refunded_amount)
        }
    }
}

impl PaymentAmountInfo {
    /// Creates a ledger in the home currency with nothing refunded.
    pub fn of(amount: Decimal) -> Result<Self> {
        Self::with_currency(amount, DEFAULT_CURRENCY)
    }

    pub fn with_currency(amount: Decimal, currency: &str) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        let currency = currency.trim();
        Ok(Self {
            amount,
            refunded_amount: Decimal::ZERO,
            currency: if currency.is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                currency.to_string()
            },
        })
    }

    /// Returns the ledger after refunding `refund`.
    pub fn with_refund(&self, refund: Decimal) -> Result<Self> {
        if refund <= Decimal::ZERO {
            return Err(PaymentError::InvalidRefundAmount(format!(
                "refund amount must be positive, got {refund}"
            )));
        }

        let refunded_amount = self.refunded_amount + refund;
        if refunded_amount > self.amount {
            return Err(PaymentError::RefundExceedsPayment {
                amount: self.amount,
                refunded: self.refunded_amount,
                requested: refund,
            });
        }

        Ok(Self {
            amount: self.amount,
            refunded_amount,
            currency: self.currency.clone(),
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn refunded_amount(&self) -> Decimal {
        self.refunded_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn refundable_amount(&self) -> Decimal {
        self.amount - self.refunded_amount
    }

    pub fn is_fully_refunded(&self) -> bool {
        self.refunded_amount == self.amount
    }

    pub fn is_partially_refunded(&self) -> bool {
        self.refunded_amount > Decimal::ZERO && self.refunded_amount < self.amount
    }

    pub fn is_refundable(&self) -> bool {
        self.refunded_amount < self.amount
    }

    pub fn matches_amount(&self, other: Decimal) -> bool {
        self.amount == other
    }
}
