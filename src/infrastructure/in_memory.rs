use crate::domain::order::{Order, OrderId};
use crate::domain::payment::{PaymentId, PaymentIntent, ReconcileJob};
use crate::domain::ports::{BatchStore, ChangeSet, JobQueue, OrderStore, PaymentStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory store for orders.
///
/// Uses `Arc<RwLock<BTreeMap<OrderId, Order>>>` so listings come back in id
/// order. Ideal for testing or a single process run.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn store(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for payment intents.
#[derive(Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, PaymentIntent>>>,
    sequence: Arc<AtomicU64>,
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self {
            payments: Arc::default(),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn next_id(&self) -> Result<PaymentId> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    async fn store(&self, payment: PaymentIntent) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&payment_id).cloned())
    }

    async fn delete(&self, payment_id: PaymentId) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.remove(&payment_id);
        Ok(())
    }

    async fn for_order(&self, order_id: OrderId) -> Result<Vec<PaymentIntent>> {
        let payments = self.payments.read().await;
        let mut found: Vec<PaymentIntent> = payments
            .values()
            .filter(|payment| payment.order_id == order_id)
            .cloned()
            .collect();
        found.sort_by_key(|payment| payment.id);
        Ok(found)
    }
}

/// Commits change sets onto a pair of in-memory stores.
///
/// Shares the maps of the stores it was built from. Both write locks are
/// held while a change set is applied, orders first.
#[derive(Clone)]
pub struct InMemoryBatchStore {
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
    payments: Arc<RwLock<HashMap<PaymentId, PaymentIntent>>>,
}

impl InMemoryBatchStore {
    pub fn new(orders: &InMemoryOrderStore, payments: &InMemoryPaymentStore) -> Self {
        Self {
            orders: orders.orders.clone(),
            payments: payments.payments.clone(),
        }
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn apply(&self, changes: ChangeSet) -> Result<()> {
        let mut orders = self.orders.write().await;
        let mut payments = self.payments.write().await;
        for order in changes.orders {
            orders.insert(order.id, order);
        }
        for payment in changes.payments {
            payments.insert(payment.id, payment);
        }
        Ok(())
    }
}

/// A job queue that only remembers what it was given.
#[derive(Default, Clone)]
pub struct RecordingJobQueue {
    jobs: Arc<Mutex<Vec<ReconcileJob>>>,
}

impl RecordingJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<ReconcileJob> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn enqueue(&self, job: ReconcileJob) -> Result<()> {
        self.jobs.lock().await.push(job);
        Ok(())
    }
}
