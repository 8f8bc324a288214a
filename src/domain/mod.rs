//! Domain layer: the payment aggregate, its value objects and the ports the
//! application layer drives.

pub mod amount;
pub mod events;
pub mod gateway;
pub mod parties;
pub mod payment;
pub mod payment_id;
pub mod pg_info;
pub mod ports;
pub mod search;
pub mod status;

use crate::error::{PaymentError, Result};

/// Rejects blank mandatory strings. The value is kept as given.
pub(crate) fn require_text(value: String, field: &'static str) -> Result<String> {
    if value.trim().is_empty() {
        Err(PaymentError::InvalidValue { field })
    } else {
        Ok(value)
    }
}
