//! Adapters between the outside world and the payment service: the inbound
//! command stream, the refund-request consumer and the CSV report.

pub mod consumer;
pub mod csv;
pub mod jsonl;
