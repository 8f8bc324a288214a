use crate::domain::payment::Payment;
use crate::domain::payment_id::PaymentId;
use crate::domain::ports::PaymentStore;
use crate::domain::search::{Page, PageRequest, PaymentSearch, sort_newest_first};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding payment snapshots keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping PG payment ids to payment ids.
pub const CF_PG_INDEX: &str = "payments_by_pg_id";
/// Column Family mapping order ids to payment ids.
pub const CF_ORDER_INDEX: &str = "payments_by_order";

/// A persistent payment store on RocksDB.
///
/// Each save writes the snapshot and both indexes in one `WriteBatch`.
/// Writers are serialized by an async mutex so the uniqueness and version
/// checks and the batch they guard cannot interleave. `Clone` shares the
/// underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBPaymentStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBPaymentStore {
    /// Opens or creates the database at `path` with all column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_PAYMENTS, CF_PG_INDEX, CF_ORDER_INDEX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("column family {name} not found")))
    }

    fn load(&self, id: &str) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_pinned_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn index_lookup(&self, cf_name: &str, key: &str) -> Result<Option<String>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| PaymentError::internal(format!("corrupt {cf_name} entry: {e}"))),
            None => Ok(None),
        }
    }

    /// Identity of the stored copy `payment` was loaded from, provided no
    /// write committed since. Callers hold the write lock.
    fn check_current(&self, payment: &Payment) -> Result<PaymentId> {
        let id = payment
            .id()
            .ok_or_else(|| PaymentError::PaymentNotFound("unsaved payment".to_string()))?;
        let stored = self
            .load(id.as_str())?
            .ok_or_else(|| PaymentError::PaymentNotFound(id.to_string()))?;
        if stored.version() != payment.version() {
            return Err(PaymentError::ConcurrentModification(id.to_string()));
        }
        Ok(id.clone())
    }

    fn scan_payments(&self) -> Result<Vec<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut payments = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            payments.push(serde_json::from_slice(&value)?);
        }
        Ok(payments)
    }

    fn write(&self, payment: &Payment, id: &PaymentId) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            id.as_str().as_bytes(),
            serde_json::to_vec(payment)?,
        );
        batch.put_cf(
            self.cf(CF_PG_INDEX)?,
            payment.pg_info().pg_payment_id().as_bytes(),
            id.as_str().as_bytes(),
        );
        batch.put_cf(
            self.cf(CF_ORDER_INDEX)?,
            payment.order_id().as_bytes(),
            id.as_str().as_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBPaymentStore {
    async fn save(&self, mut payment: Payment) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;

        let id = if payment.id().is_some() {
            self.check_current(&payment)?
        } else {
            let pg_payment_id = payment.pg_info().pg_payment_id();
            if self.index_lookup(CF_PG_INDEX, pg_payment_id)?.is_some() {
                return Err(PaymentError::DuplicatePgPayment(pg_payment_id.to_string()));
            }
            let order_id = payment.order_id();
            if self.index_lookup(CF_ORDER_INDEX, order_id)?.is_some() {
                return Err(PaymentError::DuplicateOrder(order_id.to_string()));
            }
            let id = PaymentId::generate();
            payment.assign_id(id.clone())?;
            id
        };

        payment.touch(Utc::now());
        self.write(&payment, &id)?;
        Ok(payment)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>> {
        Ok(self.load(id.as_str())?.filter(|payment| !payment.is_deleted()))
    }

    async fn find_by_id_including_deleted(&self, id: &PaymentId) -> Result<Option<Payment>> {
        self.load(id.as_str())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let Some(id) = self.index_lookup(CF_ORDER_INDEX, order_id)? else {
            return Ok(None);
        };
        Ok(self.load(&id)?.filter(|payment| !payment.is_deleted()))
    }

    async fn find_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<Option<Payment>> {
        let Some(id) = self.index_lookup(CF_PG_INDEX, pg_payment_id)? else {
            return Ok(None);
        };
        Ok(self.load(&id)?.filter(|payment| !payment.is_deleted()))
    }

    async fn exists_by_pg_payment_id(&self, pg_payment_id: &str) -> Result<bool> {
        Ok(self.index_lookup(CF_PG_INDEX, pg_payment_id)?.is_some())
    }

    async fn exists_by_order_id(&self, order_id: &str) -> Result<bool> {
        Ok(self.index_lookup(CF_ORDER_INDEX, order_id)?.is_some())
    }

    async fn delete(&self, mut payment: Payment, deleted_by: &str) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let id = self.check_current(&payment)?;

        let now = Utc::now();
        payment.mark_deleted(deleted_by, now);
        payment.touch(now);
        self.write(&payment, &id)?;
        Ok(payment)
    }

    async fn search(&self, criteria: &PaymentSearch, page: PageRequest) -> Result<Page<Payment>> {
        let mut matches: Vec<Payment> = self
            .scan_payments()?
            .into_iter()
            .filter(|payment| criteria.matches(payment))
            .collect();
        sort_newest_first(&mut matches);
        Ok(Page::from_sorted(matches, page))
    }
}
