use crate::application::reconciler::settle;
use crate::application::unit_of_work::Ledger;
use crate::domain::payment::ReconcileJob;
use crate::domain::ports::JobQueue;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Background reconciliation over a tokio channel.
///
/// Jobs are settled one at a time by a single worker task, in the order
/// they were enqueued. Enqueueing never waits for the worker. The worker
/// writes through the same [`Ledger`] as confirmations.
pub struct TokioJobQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<ReconcileJob>>>,
}

/// Handle on the task draining a [`TokioJobQueue`].
pub struct ReconcileWorker {
    handle: JoinHandle<usize>,
}

impl TokioJobQueue {
    /// Starts the worker and returns the queue feeding it.
    pub fn spawn(ledger: Ledger) -> (Arc<Self>, ReconcileWorker) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ReconcileJob>();

        let handle = tokio::spawn(async move {
            let mut settled = 0;
            while let Some(job) = receiver.recv().await {
                match settle_job(&ledger, &job).await {
                    Ok(count) => settled += count,
                    Err(e) => error!(intent_id = job.intent_id, error = %e, "Reconciliation failed"),
                }
            }
            settled
        });

        let queue = Arc::new(Self {
            sender: Mutex::new(Some(sender)),
        });
        (queue, ReconcileWorker { handle })
    }

    /// Stops accepting jobs; the worker finishes the ones already queued.
    pub async fn close(&self) {
        self.sender.lock().await.take();
    }
}

async fn settle_job(ledger: &Ledger, job: &ReconcileJob) -> Result<usize> {
    let mut uow = ledger.begin().await;
    let settled = settle(&mut uow, job).await?;
    uow.commit().await?;
    info!(intent_id = job.intent_id, settled, "Reconciliation settled");
    Ok(settled)
}

impl ReconcileWorker {
    /// Waits for the worker to drain; returns how many allocations it settled.
    pub async fn join(self) -> Result<usize> {
        self.handle
            .await
            .map_err(|e| CheckoutError::InternalError(Box::new(e)))
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    async fn enqueue(&self, job: ReconcileJob) -> Result<()> {
        let sender = self.sender.lock().await;
        let sender = sender.as_ref().ok_or_else(|| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(
                "Reconciliation queue is closed",
            )))
        })?;
        sender.send(job).map_err(|e| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(format!(
                "Reconciliation worker stopped: {}",
                e
            ))))
        })
    }
}
