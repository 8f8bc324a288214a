use crate::config::EventTopics;
use crate::domain::events::{PaymentRefundFailed, PaymentRefunded};
use crate::domain::ports::PaymentEventPublisher;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PaymentRefunded,
    PaymentRefundFailed,
}

/// One record on an outbound topic. `key` is the order id, so all events of
/// an order land in the same partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub topic: String,
    pub key: String,
    pub event_id: String,
    pub event_type: EventType,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Fire-and-forget publisher writing one JSON line per event.
///
/// `publish_*` only enqueues the envelope; a relay task spawned by
/// [`JsonLinesEventPublisher::spawn`] does the writing and logs each
/// completion. The relay finishes once every publisher clone is dropped.
#[derive(Clone)]
pub struct JsonLinesEventPublisher {
    sender: mpsc::UnboundedSender<EventEnvelope>,
    topics: EventTopics,
}

impl JsonLinesEventPublisher {
    /// Starts the relay. The handle resolves to the number of events written.
    pub fn spawn<W>(writer: W, topics: EventTopics) -> (Self, JoinHandle<Result<usize>>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let relay = tokio::spawn(relay(receiver, writer));
        (Self { sender, topics }, relay)
    }

    fn enqueue<T: Serialize>(
        &self,
        topic: &str,
        event_type: EventType,
        key: &str,
        payload: &T,
    ) -> Result<()> {
        let envelope = EventEnvelope {
            topic: topic.to_string(),
            key: key.to_string(),
            event_id: Uuid::new_v4().to_string(),
            event_type,
            source: self.topics.source.clone(),
            occurred_at: Utc::now(),
            payload: serde_json::to_value(payload)?,
        };
        self.sender
            .send(envelope)
            .map_err(|_| PaymentError::internal("event relay has stopped"))
    }
}

#[async_trait]
impl PaymentEventPublisher for JsonLinesEventPublisher {
    async fn publish_refunded(&self, event: PaymentRefunded) -> Result<()> {
        self.enqueue(
            &self.topics.payment_refunded,
            EventType::PaymentRefunded,
            &event.order_id,
            &event,
        )
    }

    async fn publish_refund_failed(&self, event: PaymentRefundFailed) -> Result<()> {
        self.enqueue(
            &self.topics.payment_refund_failed,
            EventType::PaymentRefundFailed,
            &event.order_id,
            &event,
        )
    }
}

async fn relay<W>(
    mut receiver: mpsc::UnboundedReceiver<EventEnvelope>,
    mut writer: W,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(envelope) = receiver.recv().await {
        match write_line(&mut writer, &envelope).await {
            Ok(()) => {
                written += 1;
                debug!(
                    topic = %envelope.topic,
                    key = %envelope.key,
                    event_id = %envelope.event_id,
                    "event published"
                );
            }
            Err(err) => error!(
                topic = %envelope.topic,
                key = %envelope.key,
                error = %err,
                "failed to publish event"
            ),
        }
    }
    writer.flush().await?;
    Ok(written)
}

async fn write_line<W>(writer: &mut W, envelope: &EventEnvelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(envelope)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parties::{PayeeInfo, PayerInfo};
    use crate::domain::payment::Payment;
    use crate::domain::pg_info::PgInfo;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::create(
            "ORDER-001",
            dec!(10000),
            PgInfo::new("TOSS", "pg-1", Some("pg-key-123".into()), None, Some(Utc::now()))
                .unwrap(),
            PayerInfo::new("payer-co", "Payer", None, None).unwrap(),
            PayeeInfo::new("payee-co", "Payee").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_relay_writes_one_line_per_event() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let (publisher, relay) = JsonLinesEventPublisher::spawn(client, EventTopics::default());

        publisher
            .publish_refunded(PaymentRefunded::from(&payment(), dec!(10000), "order failed"))
            .await
            .unwrap();
        publisher
            .publish_refund_failed(PaymentRefundFailed::from(&payment(), dec!(10000), "timeout"))
            .await
            .unwrap();
        drop(publisher);

        assert_eq!(relay.await.unwrap().unwrap(), 2);

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut server, &mut output)
            .await
            .unwrap();
        let envelopes: Vec<EventEnvelope> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].topic, "payment-refunded");
        assert_eq!(envelopes[0].event_type, EventType::PaymentRefunded);
        assert_eq!(envelopes[0].key, "ORDER-001");
        assert_eq!(envelopes[0].source, "payment-service");
        assert_eq!(envelopes[0].payload["fullRefund"], serde_json::json!(false));
        assert_eq!(envelopes[1].topic, "payment-refund-failed");
        assert_eq!(envelopes[1].payload["errorMessage"], "timeout");
        assert_ne!(envelopes[0].event_id, envelopes[1].event_id);
    }

    #[tokio::test]
    async fn test_publish_after_relay_stopped_fails() {
        let (client, server) = tokio::io::duplex(1024);
        let (publisher, relay) = JsonLinesEventPublisher::spawn(client, EventTopics::default());
        relay.abort();
        let _ = relay.await;
        drop(server);

        let result = publisher
            .publish_refund_failed(PaymentRefundFailed::from(&payment(), dec!(1), "boom"))
            .await;
        assert!(matches!(result, Err(PaymentError::InternalError(_))));
    }
}
