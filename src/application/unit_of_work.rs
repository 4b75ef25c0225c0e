use crate::domain::order::{Order, OrderId};
use crate::domain::payment::{PaymentId, PaymentIntent, ReconcileJob};
use crate::domain::ports::{ChangeSet, SharedBatchStore, SharedOrderStore, SharedPaymentStore};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Single owner of order and payment writes.
///
/// Confirmations and the reconciliation worker both go through
/// [`Ledger::begin`]; only one unit of work is open at a time, so every
/// read-modify-write sees the previous commit.
#[derive(Clone)]
pub struct Ledger {
    orders: SharedOrderStore,
    payments: SharedPaymentStore,
    batches: SharedBatchStore,
    writer: Arc<Mutex<()>>,
}

impl Ledger {
    /// Creates a ledger over the given stores.
    ///
    /// # Arguments
    ///
    /// * `orders` - The store for orders.
    /// * `payments` - The store for payment intents.
    /// * `batches` - Commits changes to both stores atomically.
    pub fn new(
        orders: SharedOrderStore,
        payments: SharedPaymentStore,
        batches: SharedBatchStore,
    ) -> Self {
        Self {
            orders,
            payments,
            batches,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn orders(&self) -> &SharedOrderStore {
        &self.orders
    }

    pub fn payments(&self) -> &SharedPaymentStore {
        &self.payments
    }

    /// Opens a unit of work, waiting for the one currently open to finish.
    pub async fn begin(&self) -> UnitOfWork {
        let guard = self.writer.clone().lock_owned().await;
        UnitOfWork {
            orders: self.orders.clone(),
            payments: self.payments.clone(),
            batches: self.batches.clone(),
            staged_orders: HashMap::new(),
            staged_payments: HashMap::new(),
            deferred: Vec::new(),
            _guard: guard,
        }
    }
}

/// Stages order and payment writes so they land together or not at all.
///
/// Reads see staged values first. Nothing reaches the stores before
/// [`UnitOfWork::commit`]; dropping the unit of work discards every staged
/// write and every deferred job and releases the ledger.
pub struct UnitOfWork {
    orders: SharedOrderStore,
    payments: SharedPaymentStore,
    batches: SharedBatchStore,
    staged_orders: HashMap<OrderId, Order>,
    staged_payments: HashMap<PaymentId, PaymentIntent>,
    deferred: Vec<ReconcileJob>,
    _guard: OwnedMutexGuard<()>,
}

impl UnitOfWork {
    pub async fn order(&self, order_id: OrderId) -> Result<Option<Order>> {
        match self.staged_orders.get(&order_id) {
            Some(order) => Ok(Some(order.clone())),
            None => self.orders.get(order_id).await,
        }
    }

    pub fn stage_order(&mut self, order: Order) {
        self.staged_orders.insert(order.id, order);
    }

    pub async fn payment(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>> {
        match self.staged_payments.get(&payment_id) {
            Some(payment) => Ok(Some(payment.clone())),
            None => self.payments.get(payment_id).await,
        }
    }

    pub fn stage_payment(&mut self, payment: PaymentIntent) {
        self.staged_payments.insert(payment.id, payment);
    }

    /// Queues a job to be handed out once the unit of work commits.
    pub fn defer(&mut self, job: ReconcileJob) {
        self.deferred.push(job);
    }

    /// Applies every staged value in one batch and returns the deferred jobs.
    pub async fn commit(self) -> Result<Vec<ReconcileJob>> {
        let changes = ChangeSet {
            orders: self.staged_orders.into_values().collect(),
            payments: self.staged_payments.into_values().collect(),
        };
        debug!(
            orders = changes.orders.len(),
            payments = changes.payments.len(),
            jobs = self.deferred.len(),
            "Committing unit of work"
        );
        if !changes.is_empty() {
            self.batches.apply(changes).await?;
        }
        Ok(self.deferred)
    }
}
