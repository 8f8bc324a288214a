use crate::domain::status::PaymentStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Coarse classification of failures, used by callers that only need to know
/// which side of the boundary went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    ValidationFailure,
    GatewayFailure,
    ProcessingFailure,
    Internal,
}

/// Failures reported by the payment gateway client, classified by the
/// HTTP status the gateway answered with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid payment key")]
    InvalidPaymentKey,
    #[error("payment gateway authentication failed")]
    AuthenticationFailed,
    #[error("payment not found at the payment gateway")]
    PaymentNotFound,
    #[error("payment gateway system error")]
    SystemError,
    #[error("payment gateway verification failed (HTTP {0})")]
    VerificationFailed(u16),
    #[error("invalid cancel request")]
    InvalidCancelRequest,
    #[error("payment cannot be cancelled in its current gateway state")]
    NotCancellable,
    #[error("payment gateway cancel failed (HTTP {0})")]
    CancelFailed(u16),
    #[error("payment gateway transport error: {0}")]
    Transport(String),
    #[error("malformed payment gateway response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Classifies an error status returned by the payment lookup endpoint.
    pub fn from_get_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidPaymentKey,
            401 => Self::AuthenticationFailed,
            404 => Self::PaymentNotFound,
            500 => Self::SystemError,
            other => Self::VerificationFailed(other),
        }
    }

    /// Classifies an error status returned by the cancel endpoint.
    pub fn from_cancel_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidCancelRequest,
            401 => Self::AuthenticationFailed,
            404 => Self::PaymentNotFound,
            409 => Self::NotCancellable,
            500 => Self::SystemError,
            other => Self::CancelFailed(other),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPaymentKey => "PG_102",
            Self::AuthenticationFailed => "PG_108",
            Self::PaymentNotFound => "PAYMENT_001",
            Self::SystemError | Self::Transport(_) => "PG_101",
            Self::VerificationFailed(_) => "PG_104",
            Self::InvalidCancelRequest => "REFUND_202",
            Self::NotCancellable => "REFUND_204",
            Self::CancelFailed(_) => "PG_105",
            Self::MalformedResponse(_) => "PG_103",
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),
    #[error("invalid refund amount: {0}")]
    InvalidRefundAmount(String),
    #[error("refund of {requested} would exceed the payment amount {amount} (already refunded {refunded})")]
    RefundExceedsPayment {
        amount: Decimal,
        refunded: Decimal,
        requested: Decimal,
    },
    #[error("{field} must not be blank")]
    InvalidValue { field: &'static str },

    #[error("{operation} is only allowed in {required} status (current: {actual})")]
    InvalidStatus {
        operation: &'static str,
        required: PaymentStatus,
        actual: PaymentStatus,
    },
    #[error("refund is not allowed in {0} status")]
    RefundNotAllowed(PaymentStatus),
    #[error("refund amount {requested} exceeds the refundable amount {refundable}")]
    RefundAmountExceedsPayment {
        requested: Decimal,
        refundable: Decimal,
    },
    #[error("payment in final status {0} cannot be cancelled")]
    CannotCancel(PaymentStatus),
    #[error("payment identity is already assigned")]
    IdentityAlreadyAssigned,

    #[error("PG approval is older than one hour (approved at {approved_at:?})")]
    PaymentExpired { approved_at: Option<DateTime<Utc>> },
    #[error("payment amount mismatch: PG amount {actual}, expected {expected}")]
    AmountMismatch { actual: Decimal, expected: Decimal },
    #[error("PG payment is not approved (status: {0})")]
    PgPaymentNotApproved(String),
    #[error("payment was already cancelled at the PG")]
    PaymentAlreadyProcessed,
    #[error("payment verification failed: {0}")]
    PaymentVerificationFailed(String),
    #[error("a payment for PG payment id {0} is already registered")]
    DuplicatePgPayment(String),
    #[error("a payment for order {0} is already registered")]
    DuplicateOrder(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(String),
    #[error("payment {payment_id} does not belong to order {order_id}")]
    OrderMismatch { payment_id: String, order_id: String },
    #[error("payment {0} was modified concurrently")]
    ConcurrentModification(String),

    #[error("failed to communicate with the payment gateway: {0}")]
    PgConnectionFailed(#[source] GatewayError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("refund processing failed: {source}")]
    RefundProcessingFailed {
        #[source]
        source: Box<PaymentError>,
    },

    #[error("configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

impl PaymentError {
    /// Stable, machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "PAYMENT_005",
            Self::InvalidRefundAmount(_) => "REFUND_202",
            Self::RefundExceedsPayment { .. } | Self::RefundAmountExceedsPayment { .. } => {
                "REFUND_203"
            }
            Self::InvalidValue { .. } => "VERIFICATION_304",
            Self::InvalidStatus { .. } => "PAYMENT_003",
            Self::RefundNotAllowed(_) => "REFUND_204",
            Self::CannotCancel(_) => "PAYMENT_006",
            Self::IdentityAlreadyAssigned => "PAYMENT_002",
            Self::PaymentExpired { .. } => "VERIFICATION_303",
            Self::AmountMismatch { .. } => "VERIFICATION_302",
            Self::PgPaymentNotApproved(_) => "VERIFICATION_306",
            Self::PaymentAlreadyProcessed => "PAYMENT_004",
            Self::PaymentVerificationFailed(_) => "VERIFICATION_301",
            Self::DuplicatePgPayment(_) | Self::DuplicateOrder(_) => "VERIFICATION_308",
            Self::ConcurrentModification(_) => "PAYMENT_004",
            Self::PaymentNotFound(_) | Self::OrderMismatch { .. } => "PAYMENT_001",
            Self::PgConnectionFailed(_) => "PG_101",
            Self::Gateway(err) => err.code(),
            Self::RefundProcessingFailed { .. } => "REFUND_207",
            Self::Config(_)
            | Self::CsvError(_)
            | Self::JsonError(_)
            | Self::IoError(_)
            | Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PaymentNotFound(_) | Self::OrderMismatch { .. } => ErrorKind::NotFound,
            Self::InvalidStatus { .. }
            | Self::RefundNotAllowed(_)
            | Self::CannotCancel(_)
            | Self::IdentityAlreadyAssigned
            | Self::ConcurrentModification(_) => ErrorKind::InvalidState,
            Self::InvalidAmount(_)
            | Self::InvalidRefundAmount(_)
            | Self::RefundExceedsPayment { .. }
            | Self::RefundAmountExceedsPayment { .. }
            | Self::InvalidValue { .. }
            | Self::PaymentExpired { .. }
            | Self::AmountMismatch { .. }
            | Self::PgPaymentNotApproved(_)
            | Self::PaymentAlreadyProcessed
            | Self::PaymentVerificationFailed(_)
            | Self::DuplicatePgPayment(_)
            | Self::DuplicateOrder(_) => ErrorKind::ValidationFailure,
            Self::PgConnectionFailed(_) | Self::Gateway(_) => ErrorKind::GatewayFailure,
            Self::RefundProcessingFailed { .. } => ErrorKind::ProcessingFailure,
            Self::Config(_)
            | Self::CsvError(_)
            | Self::JsonError(_)
            | Self::IoError(_)
            | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}
