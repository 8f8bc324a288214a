#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pg_settle::application::commands::VerifyPaymentCommand;
use pg_settle::application::payment_service::PaymentService;
use pg_settle::domain::events::{PaymentRefundFailed, PaymentRefunded};
use pg_settle::domain::gateway::{
    CancelDetail, PgCancelRequest, PgCancelResponse, PgPaymentResponse, PgPaymentStatus,
};
use pg_settle::domain::payment::Payment;
use pg_settle::domain::payment_id::PaymentId;
use pg_settle::domain::ports::{PaymentEventPublisher, PaymentGatewayClient, PaymentStore};
use pg_settle::domain::search::{Page, PageRequest, PaymentSearch};
use pg_settle::error::{GatewayError, PaymentError, Result};
use pg_settle::infrastructure::in_memory::{InMemoryEventPublisher, InMemoryPaymentStore};
use pg_settle::interfaces::consumer::Acknowledgment;
use rust_decimal::Decimal;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PG_KEY: &str = "pg-key-123";

pub fn approved_response(amount: Decimal, approved_at: DateTime<Utc>) -> PgPaymentResponse {
    PgPaymentResponse {
        payment_key: PG_KEY.to_string(),
        order_id: "ORDER-001".to_string(),
        status: PgPaymentStatus::Done,
        total_amount: amount,
        balance_amount: Some(amount),
        supplied_amount: None,
        vat: None,
        approved_at: Some(approved_at),
        requested_at: None,
        transaction_key: Some("tx-approve-1".to_string()),
        method: Some("CARD".to_string()),
        failure: None,
    }
}

pub fn cancel_response(amount: Decimal, refund_id: &str) -> PgCancelResponse {
    PgCancelResponse {
        payment_key: PG_KEY.to_string(),
        order_id: "ORDER-001".to_string(),
        status: PgPaymentStatus::Canceled,
        total_amount: amount,
        balance_amount: Some(Decimal::ZERO),
        cancels: vec![CancelDetail {
            cancel_amount: amount,
            cancel_reason: Some("order failed".to_string()),
            canceled_at: Some(Utc::now()),
            transaction_key: refund_id.to_string(),
        }],
    }
}

pub fn verify_command(order_id: &str, pg_payment_id: &str, expected: Decimal) -> VerifyPaymentCommand {
    VerifyPaymentCommand {
        order_id: order_id.to_string(),
        pg_provider: "TOSS".to_string(),
        pg_payment_id: pg_payment_id.to_string(),
        pg_payment_key: PG_KEY.to_string(),
        expected_amount: expected,
        payer_company_id: "payer-co".to_string(),
        payer_name: "Payer Inc.".to_string(),
        payer_email: Some("billing@payer.example".to_string()),
        payer_phone: None,
        payee_company_id: "payee-co".to_string(),
        payee_name: "Payee Ltd.".to_string(),
    }
}

type GatewayResult<T> = std::result::Result<T, GatewayError>;

struct StubState {
    payment: GatewayResult<PgPaymentResponse>,
    cancel: GatewayResult<PgCancelResponse>,
    cancel_requests: Vec<(String, PgCancelRequest)>,
    cancel_delay: Duration,
}

/// Scripted PG gateway that counts its calls. Clones share the script.
#[derive(Clone)]
pub struct StubGateway {
    state: Arc<Mutex<StubState>>,
    get_calls: Arc<AtomicUsize>,
    cancel_calls: Arc<AtomicUsize>,
}

impl StubGateway {
    /// Answers lookups with a `DONE` payment approved just now and cancels
    /// with a full refund.
    pub fn approved(amount: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState {
                payment: Ok(approved_response(amount, Utc::now())),
                cancel: Ok(cancel_response(amount, "refund-tx-1")),
                cancel_requests: Vec::new(),
                cancel_delay: Duration::ZERO,
            })),
            get_calls: Arc::new(AtomicUsize::new(0)),
            cancel_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_payment(self, payment: GatewayResult<PgPaymentResponse>) -> Self {
        self.state.lock().unwrap().payment = payment;
        self
    }

    pub fn with_cancel(self, cancel: GatewayResult<PgCancelResponse>) -> Self {
        self.state.lock().unwrap().cancel = cancel;
        self
    }

    /// Holds every cancel answer back for `delay`.
    pub fn with_cancel_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().cancel_delay = delay;
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_requests(&self) -> Vec<(String, PgCancelRequest)> {
        self.state.lock().unwrap().cancel_requests.clone()
    }
}

#[async_trait]
impl PaymentGatewayClient for StubGateway {
    async fn get_payment(&self, _payment_key: &str) -> GatewayResult<PgPaymentResponse> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().payment.clone()
    }

    async fn cancel_payment(
        &self,
        payment_key: &str,
        request: PgCancelRequest,
    ) -> GatewayResult<PgCancelResponse> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        let (response, delay) = {
            let mut state = self.state.lock().unwrap();
            state.cancel_requests.push((payment_key.to_string(), request));
            (state.cancel.clone(), state.cancel_delay)
        };
        tokio::time::sleep(delay).await;
        response
    }
}

/// Records every acknowledged (partition, offset).
#[derive(Default)]
pub struct RecordingAck {
    acked: Mutex<Vec<(i32, i64)>>,
}

impl RecordingAck {
    pub fn acked(&self) -> Vec<(i32, i64)> {
        self.acked.lock().unwrap().clone()
    }
}

impl Acknowledgment for RecordingAck {
    fn acknowledge(&self, partition: i32, offset: i64) {
        self.acked.lock().unwrap().push((partition, offset));
    }
}

/// Publisher whose every call fails.
pub struct FailingPublisher;

#[async_trait]
impl PaymentEventPublisher for FailingPublisher {
    async fn publish_refunded(&self, _event: PaymentRefunded) -> Result<()> {
        Err(PaymentError::Config("broker unavailable".to_string()))
    }

    async fn publish_refund_failed(&self, _event: PaymentRefundFailed) -> Result<()> {
        Err(PaymentError::Config("broker unavailable".to_string()))
    }
}

/// Store wrapper whose first PG payment id and order id lookups miss, as if
/// a concurrent registration had not committed yet when they ran.
#[derive(Clone)]
pub struct StaleReadStore {
    inner: InMemoryPaymentStore,
    stale_finds: Arc<AtomicUsize>,
    stale_exists: Arc<AtomicUsize>,
    stale_orders: Arc<AtomicUsize>,
}

impl StaleReadStore {
    pub fn new(inner: InMemoryPaymentStore, stale_reads: usize) -> Self {
        Self {
            inner,
            stale_finds: Arc::new(AtomicUsize::new(stale_reads)),
            stale_exists: Arc::new(AtomicUsize::new(stale_reads)),
            stale_orders: Arc::new(AtomicUsize::new(stale_reads)),
        }
    }

    fn take_stale(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PaymentStore for StaleReadStore {
    async fn save(&self, payment: Payment) -> Result<Payment> {
        self.inner.save(payment).await
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_including_deleted(&self, id: &PaymentId) -> Result<Option<Payment>> {
        self.inner.find_by_id_including_deleted(id).await
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        self.inner.find_by_order_id(order_id).await
    }

    async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>> {
        if Self::take_stale(&self.stale_finds) {
            return Ok(None);
        }
        self.inner.find_by_pg_payment_id(pg_payment_id).await
    }

    async fn exists_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<bool> {
        if Self::take_stale(&self.stale_exists) {
            return Ok(false);
        }
        self.inner.exists_by_pg_payment_id(pg_payment_id).await
    }

    async fn exists_by_order_id(&self, order_id: &str) -> Result<bool> {
        if Self::take_stale(&self.stale_orders) {
            return Ok(false);
        }
        self.inner.exists_by_order_id(order_id).await
    }

    async fn delete(&self, payment: Payment, deleted_by: &str) -> Result<Payment> {
        self.inner.delete(payment, deleted_by).await
    }

    async fn search(&self, criteria: &PaymentSearch, page: PageRequest) -> Result<Page<Payment>> {
        self.inner.search(criteria, page).await
    }
}

/// Store wrapper that answers identity lookups of one payment with a fixed
/// snapshot, as if the read ran before a concurrent write committed.
pub struct SnapshotStore {
    inner: InMemoryPaymentStore,
    snapshot: Payment,
}

impl SnapshotStore {
    pub fn new(inner: InMemoryPaymentStore, snapshot: Payment) -> Self {
        Self { inner, snapshot }
    }
}

#[async_trait]
impl PaymentStore for SnapshotStore {
    async fn save(&self, payment: Payment) -> Result<Payment> {
        self.inner.save(payment).await
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>> {
        if self.snapshot.id() == Some(id) {
            return Ok(Some(self.snapshot.clone()));
        }
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_including_deleted(&self, id: &PaymentId) -> Result<Option<Payment>> {
        self.inner.find_by_id_including_deleted(id).await
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        self.inner.find_by_order_id(order_id).await
    }

    async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>> {
        self.inner.find_by_pg_payment_id(pg_payment_id).await
    }

    async fn exists_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<bool> {
        self.inner.exists_by_pg_payment_id(pg_payment_id).await
    }

    async fn exists_by_order_id(&self, order_id: &str) -> Result<bool> {
        self.inner.exists_by_order_id(order_id).await
    }

    async fn delete(&self, payment: Payment, deleted_by: &str) -> Result<Payment> {
        self.inner.delete(payment, deleted_by).await
    }

    async fn search(&self, criteria: &PaymentSearch, page: PageRequest) -> Result<Page<Payment>> {
        self.inner.search(criteria, page).await
    }
}

/// Service over an in-memory store and a recording publisher.
pub fn service_with(
    gateway: StubGateway,
) -> (Arc<PaymentService>, InMemoryPaymentStore, InMemoryEventPublisher) {
    let store = InMemoryPaymentStore::new();
    let publisher = InMemoryEventPublisher::new();
    let service = PaymentService::new(
        Box::new(store.clone()),
        Box::new(gateway),
        Box::new(publisher.clone()),
    );
    (Arc::new(service), store, publisher)
}

/// Minimal Toss Payments HTTP stand-in for CLI runs: every lookup answers a
/// `DONE` payment of 10000 approved just now, every cancel succeeds.
pub fn spawn_toss_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let request = read_request(&mut stream);
            let body = if request.starts_with("POST") && request.contains("/cancel") {
                format!(
                    r#"{{"paymentKey":"{PG_KEY}","orderId":"ORDER-001","status":"CANCELED","totalAmount":10000,"balanceAmount":0,"cancels":[{{"cancelAmount":10000,"transactionKey":"refund-tx-1"}}]}}"#
                )
            } else {
                format!(
                    r#"{{"paymentKey":"{PG_KEY}","orderId":"ORDER-001","status":"DONE","totalAmount":10000,"approvedAt":"{}","transactionKey":"tx-approve-1"}}"#,
                    Utc::now().to_rfc3339()
                )
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

fn read_request(stream: &mut std::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
