use crate::domain::payment::Payment;
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PaymentRow<'a> {
    payment_id: &'a str,
    order_id: &'a str,
    status: &'a str,
    amount: Decimal,
    refunded_amount: Decimal,
    currency: &'a str,
    pg_provider: &'a str,
    pg_payment_id: &'a str,
    verified_at: Option<String>,
    refunded_at: Option<String>,
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Writes a CSV summary of payments, one row per payment.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<'a, I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        for payment in payments {
            self.writer.serialize(PaymentRow {
                payment_id: payment.id_value(),
                order_id: payment.order_id(),
                status: payment.status().as_str(),
                amount: payment.amount().normalize(),
                refunded_amount: payment.refunded_amount().normalize(),
                currency: payment.amount_info().currency(),
                pg_provider: payment.pg_info().pg_provider(),
                pg_payment_id: payment.pg_info().pg_payment_id(),
                verified_at: timestamp(payment.verified_at()),
                refunded_at: timestamp(payment.refunded_at()),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
