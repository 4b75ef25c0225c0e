use crate::domain::order::{Order, OrderId};
use crate::domain::payment::{PaymentId, PaymentIntent};
use crate::domain::ports::{BatchStore, ChangeSet, OrderStore, PaymentStore};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing payment intents.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for bookkeeping such as the payment id sequence.
pub const CF_META: &str = "meta";

const PAYMENT_SEQUENCE_KEY: &[u8] = b"payment_sequence";

/// A persistent store implementation using RocksDB.
///
/// Orders and payment intents live in separate Column Families, keyed by
/// their big-endian id so iteration follows id order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    sequence_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "orders", "payments" and "meta" column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_ORDERS, CF_PAYMENTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            sequence_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn put<T: Serialize>(&self, family: &str, key: u64, value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        self.db
            .put_cf(&cf, key.to_be_bytes(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, family: &str, key: u64) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_cf(&cf, key.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn store(&self, order: Order) -> Result<()> {
        self.put(CF_ORDERS, order.id, &order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id)
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn next_id(&self) -> Result<PaymentId> {
        let _guard = self.sequence_lock.lock().await;
        let cf = self.cf(CF_META)?;

        let next = match self.db.get_cf(&cf, PAYMENT_SEQUENCE_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    CheckoutError::InternalError(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Corrupt payment sequence",
                    )))
                })?;
                u64::from_be_bytes(bytes)
            }
            None => 1,
        };
        self.db
            .put_cf(&cf, PAYMENT_SEQUENCE_KEY, (next + 1).to_be_bytes())?;
        Ok(next)
    }

    async fn store(&self, payment: PaymentIntent) -> Result<()> {
        self.put(CF_PAYMENTS, payment.id, &payment)
    }

    async fn get(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>> {
        self.read(CF_PAYMENTS, payment_id)
    }

    async fn delete(&self, payment_id: PaymentId) -> Result<()> {
        let cf = self.cf(CF_PAYMENTS)?;
        self.db.delete_cf(&cf, payment_id.to_be_bytes())?;
        Ok(())
    }

    async fn for_order(&self, order_id: OrderId) -> Result<Vec<PaymentIntent>> {
        let payments: Vec<PaymentIntent> = self.scan(CF_PAYMENTS)?;
        Ok(payments
            .into_iter()
            .filter(|payment| payment.order_id == order_id)
            .collect())
    }
}

#[async_trait]
impl BatchStore for RocksDBStore {
    /// Writes the whole change set in one `WriteBatch` spanning both column
    /// families.
    async fn apply(&self, changes: ChangeSet) -> Result<()> {
        let orders_cf = self.cf(CF_ORDERS)?;
        let payments_cf = self.cf(CF_PAYMENTS)?;

        let mut batch = WriteBatch::default();
        for order in &changes.orders {
            batch.put_cf(orders_cf, order.id.to_be_bytes(), serde_json::to_vec(order)?);
        }
        for payment in &changes.payments {
            batch.put_cf(payments_cf, payment.id.to_be_bytes(), serde_json::to_vec(payment)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}
