use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle status of a payment.
///
/// `PENDING -> VERIFYING -> {VERIFIED | VERIFICATION_FAILED}`,
/// `VERIFIED | PARTIALLY_REFUNDED -> REFUNDING -> {REFUNDED | PARTIALLY_REFUNDED | REFUND_FAILED}`,
/// and any non-final status may move to `CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Verifying,
    Verified,
    VerificationFailed,
    Refunding,
    PartiallyRefunded,
    Refunded,
    RefundFailed,
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 9] = [
        PaymentStatus::Pending,
        PaymentStatus::Verifying,
        PaymentStatus::Verified,
        PaymentStatus::VerificationFailed,
        PaymentStatus::Refunding,
        PaymentStatus::PartiallyRefunded,
        PaymentStatus::Refunded,
        PaymentStatus::RefundFailed,
        PaymentStatus::Cancelled,
    ];

    pub fn is_refundable(self) -> bool {
        matches!(self, Self::Verified | Self::PartiallyRefunded)
    }

    /// Final statuses accept no further transition.
    pub fn is_final_state(self) -> bool {
        matches!(
            self,
            Self::VerificationFailed | Self::Refunded | Self::RefundFailed | Self::Cancelled
        )
    }

    pub fn is_verified(self) -> bool {
        self == Self::Verified
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verifying => "VERIFYING",
            Self::Verified => "VERIFIED",
            Self::VerificationFailed => "VERIFICATION_FAILED",
            Self::Refunding => "REFUNDING",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
            Self::Refunded => "REFUNDED",
            Self::RefundFailed => "REFUND_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Human-readable label for logs.
    pub fn description(self) -> &'static str {
        match self {
            Self::Pending => "awaiting verification",
            Self::Verifying => "verification in progress",
            Self::Verified => "verified",
            Self::VerificationFailed => "verification failed",
            Self::Refunding => "refund in progress",
            Self::PartiallyRefunded => "partially refunded",
            Self::Refunded => "fully refunded",
            Self::RefundFailed => "refund failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the PG verification step, tracked next to the main status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refundable_statuses() {
        let refundable: Vec<_> = PaymentStatus::ALL
            .into_iter()
            .filter(|s| s.is_refundable())
            .collect();
        assert_eq!(
            refundable,
            vec![PaymentStatus::Verified, PaymentStatus::PartiallyRefunded]
        );
    }

    #[test]
    fn test_final_statuses() {
        let finals: Vec<_> = PaymentStatus::ALL
            .into_iter()
            .filter(|s| s.is_final_state())
            .collect();
        assert_eq!(
            finals,
            vec![
                PaymentStatus::VerificationFailed,
                PaymentStatus::Refunded,
                PaymentStatus::RefundFailed,
                PaymentStatus::Cancelled,
            ]
        );
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let descriptions: std::collections::HashSet<_> =
            PaymentStatus::ALL.into_iter().map(PaymentStatus::description).collect();
        assert_eq!(descriptions.len(), PaymentStatus::ALL.len());
        assert_eq!(PaymentStatus::Refunding.description(), "refund in progress");
    }

    #[test]
    fn test_wire_names_match_display() {
        for status in PaymentStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }
}
