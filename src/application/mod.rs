//! Application layer: the payment use cases.
//!
//! `PaymentService` sequences gateway calls, aggregate transitions,
//! persistence and event publication. It owns idempotency and the
//! compensating writes that record a failure before it is reported.

pub mod commands;
pub mod payment_service;
