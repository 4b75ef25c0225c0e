use super::unit_of_work::UnitOfWork;
use crate::config::ReconcileMode;
use crate::domain::money::Money;
use crate::domain::order::OrderId;
use crate::domain::payment::{
    ChildPayment, ChildPaymentState, PaymentId, PaymentIntent, PaymentIntentState, PaymentSpec,
    ReconcileJob,
};
use crate::domain::ports::SharedJobQueue;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Sum of every allocation, used to detect over-payment.
pub fn amount_sum(specs: &[PaymentSpec]) -> Money {
    specs.iter().map(|spec| spec.amount).sum()
}

/// The sibling allocations followed by the new payment for `order_id`.
pub fn payment_specs(order_id: OrderId, amount: Money, siblings: &[PaymentSpec]) -> Vec<PaymentSpec> {
    let mut specs = siblings.to_vec();
    specs.push(PaymentSpec { order_id, amount });
    specs
}

/// How child payments get processed.
#[async_trait]
pub trait ReconcileStrategy: Send + Sync {
    async fn process(
        &self,
        uow: &mut UnitOfWork,
        intent: PaymentIntent,
        specs: &[PaymentSpec],
    ) -> Result<()>;
}

pub type ReconcileStrategyBox = Box<dyn ReconcileStrategy>;

/// Applies every allocation in-line.
pub struct ProcessNow;

#[async_trait]
impl ReconcileStrategy for ProcessNow {
    async fn process(
        &self,
        uow: &mut UnitOfWork,
        mut intent: PaymentIntent,
        specs: &[PaymentSpec],
    ) -> Result<()> {
        for spec in specs {
            if intent.has_child_payment_for(spec.order_id) {
                continue;
            }
            let mut order = uow
                .order(spec.order_id)
                .await?
                .ok_or(CheckoutError::OrderNotFound(spec.order_id))?;
            order.apply_payment(spec.amount);
            uow.stage_order(order);
            intent.child_payments.push(ChildPayment {
                order_id: spec.order_id,
                amount: spec.amount,
                state: ChildPaymentState::Completed,
            });
        }
        intent.complete_if_settled();
        uow.stage_payment(intent);
        Ok(())
    }
}

/// Holds the allocations as pending and leaves settling to the job queue.
pub struct ProcessDeferred;

#[async_trait]
impl ReconcileStrategy for ProcessDeferred {
    async fn process(
        &self,
        uow: &mut UnitOfWork,
        mut intent: PaymentIntent,
        specs: &[PaymentSpec],
    ) -> Result<()> {
        for spec in specs {
            if intent.has_child_payment_for(spec.order_id) {
                continue;
            }
            let mut order = uow
                .order(spec.order_id)
                .await?
                .ok_or(CheckoutError::OrderNotFound(spec.order_id))?;
            order.hold_pending_payment(spec.amount);
            uow.stage_order(order);
            intent.child_payments.push(ChildPayment {
                order_id: spec.order_id,
                amount: spec.amount,
                state: ChildPaymentState::Pending,
            });
        }
        // A captured intent stays completed; only the allocations wait.
        if !intent.is_completed() {
            intent.state = PaymentIntentState::Pending;
        }
        uow.defer(ReconcileJob {
            intent_id: intent.id,
            specs: specs.to_vec(),
        });
        uow.stage_payment(intent);
        Ok(())
    }
}

pub struct PaymentReconciler {
    strategy: ReconcileStrategyBox,
    queue: SharedJobQueue,
}

impl PaymentReconciler {
    pub fn new(strategy: ReconcileStrategyBox, queue: SharedJobQueue) -> Self {
        Self { strategy, queue }
    }

    pub fn for_mode(mode: ReconcileMode, queue: SharedJobQueue) -> Self {
        let strategy: ReconcileStrategyBox = match mode {
            ReconcileMode::Immediate => Box::new(ProcessNow),
            ReconcileMode::Deferred => Box::new(ProcessDeferred),
        };
        Self::new(strategy, queue)
    }

    /// Splits the payment across `specs`.
    ///
    /// Does nothing without specs or when the intent cannot be found. The
    /// intent is re-read through the unit of work so earlier staged changes
    /// (such as a capture) are kept.
    pub async fn add_payments(
        &self,
        uow: &mut UnitOfWork,
        intent_id: PaymentId,
        specs: &[PaymentSpec],
    ) -> Result<()> {
        if specs.is_empty() {
            return Ok(());
        }
        let Some(intent) = uow.payment(intent_id).await? else {
            warn!(intent_id, "Payment intent vanished before reconciliation");
            return Ok(());
        };
        self.strategy.process(uow, intent, specs).await
    }

    /// Hands committed jobs to the queue without waiting for them.
    pub async fn dispatch(&self, jobs: Vec<ReconcileJob>) -> Result<()> {
        for job in jobs {
            info!(intent_id = job.intent_id, allocations = job.specs.len(), "Deferring reconciliation");
            self.queue.enqueue(job).await?;
        }
        Ok(())
    }
}

/// Completes the pending allocations of a deferred job.
///
/// Returns how many allocations were settled; running a job twice settles
/// nothing the second time.
pub async fn settle(uow: &mut UnitOfWork, job: &ReconcileJob) -> Result<usize> {
    let Some(mut intent) = uow.payment(job.intent_id).await? else {
        warn!(intent_id = job.intent_id, "Skipping reconciliation of a removed payment");
        return Ok(0);
    };

    let mut settled = 0;
    for child in intent.child_payments.iter_mut() {
        let scheduled = job.specs.iter().any(|spec| spec.order_id == child.order_id);
        if child.state != ChildPaymentState::Pending || !scheduled {
            continue;
        }
        let Some(mut order) = uow.order(child.order_id).await? else {
            warn!(order_id = child.order_id, "Skipping allocation to a missing order");
            continue;
        };
        order.settle_pending_payment(child.amount);
        uow.stage_order(order);
        child.state = ChildPaymentState::Completed;
        settled += 1;
    }

    if settled > 0 {
        intent.complete_if_settled();
        uow.stage_payment(intent);
    }
    Ok(settled)
}
