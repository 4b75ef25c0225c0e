use super::gateway::{
    CaptureResponse, DoExpressCheckoutPaymentRequest, GatewayError, SetExpressCheckoutRequest,
    SetExpressCheckoutResponse, UserAction,
};
use super::order::{Order, OrderId};
use super::payment::{PaymentId, PaymentIntent, ReconcileJob};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn store(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn get_all(&self) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn next_id(&self) -> Result<PaymentId>;
    async fn store(&self, payment: PaymentIntent) -> Result<()>;
    async fn get(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>>;
    async fn delete(&self, payment_id: PaymentId) -> Result<()>;
    async fn for_order(&self, order_id: OrderId) -> Result<Vec<PaymentIntent>>;
}

/// Every write a unit of work commits together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub orders: Vec<Order>,
    pub payments: Vec<PaymentIntent>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.payments.is_empty()
    }
}

/// Applies a [`ChangeSet`] atomically: either every write lands or none does.
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn apply(&self, changes: ChangeSet) -> Result<()>;
}

/// The express checkout gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn set_express_checkout(
        &self,
        request: &SetExpressCheckoutRequest,
    ) -> std::result::Result<SetExpressCheckoutResponse, GatewayError>;

    /// Where the buyer approves the checkout started by `response`.
    fn approval_url(&self, response: &SetExpressCheckoutResponse, action: UserAction)
    -> Result<Url>;

    async fn do_express_checkout_payment(
        &self,
        request: &DoExpressCheckoutPaymentRequest,
    ) -> std::result::Result<CaptureResponse, GatewayError>;
}

/// Out-of-band processing of reconciliation jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ReconcileJob) -> Result<()>;
}

pub type SharedOrderStore = Arc<dyn OrderStore>;
pub type SharedPaymentStore = Arc<dyn PaymentStore>;
pub type SharedBatchStore = Arc<dyn BatchStore>;
pub type SharedGateway = Arc<dyn GatewayClient>;
pub type SharedJobQueue = Arc<dyn JobQueue>;
