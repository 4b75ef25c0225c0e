#![allow(dead_code)]

use express_checkout::application::confirmation::{ConfirmParams, ConfirmationHandler};
use express_checkout::application::initiator::{CheckoutInitiator, InitiateParams};
use express_checkout::application::reconciler::PaymentReconciler;
use express_checkout::application::unit_of_work::Ledger;
use express_checkout::config::{CheckoutConfig, SUBMIT_ORDER_LABEL};
use express_checkout::domain::money::Money;
use express_checkout::domain::order::{Address, LineItem, Order, OrderState};
use express_checkout::domain::ports::{OrderStore, SharedJobQueue};
use express_checkout::domain::user::CurrentUser;
use express_checkout::infrastructure::in_memory::{
    InMemoryBatchStore, InMemoryOrderStore, InMemoryPaymentStore, RecordingJobQueue,
};
use express_checkout::infrastructure::sandbox::{SandboxGateway, SandboxScript};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const COMPANY: u64 = 7;

pub fn user() -> CurrentUser {
    CurrentUser {
        id: 3,
        company_id: COMPANY,
        current_sign_in_ip: Some("10.0.0.1".parse().unwrap()),
    }
}

pub fn order(id: u64, total: Decimal) -> Order {
    Order {
        id,
        number: format!("R{}", id * 100),
        company_id: COMPANY,
        email: Some("buyer@example.com".to_string()),
        currency: "USD".to_string(),
        total: Money::new(total),
        additional_tax_total: Money::ZERO,
        state: OrderState::Cart,
        line_items: vec![LineItem {
            product_name: "Widget".to_string(),
            sku: format!("W-{}", id),
            quantity: 1,
            price: Money::new(total),
            currency: "USD".to_string(),
        }],
        adjustments: Vec::new(),
        bill_address: Some(Address {
            first_name: "Ada".to_string(),
            last_name: "Buyer".to_string(),
            address1: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            country_iso: "US".to_string(),
            zipcode: "12345".to_string(),
            ..Default::default()
        }),
        account_id: 11,
        customer_id: 12,
        vendor_id: 13,
        user_id: None,
        channel: None,
        requires_approval: false,
        payment_total: Money::ZERO,
        pending_payment_total: Money::ZERO,
    }
}

pub fn confirm_params(order_id: u64, amount: Decimal) -> ConfirmParams {
    ConfirmParams {
        order_id,
        token: "EC-123".to_string(),
        payer_id: "PAYER-1".to_string(),
        amount: Money::new(amount),
        payment_method_id: 1,
        commit: Some(SUBMIT_ORDER_LABEL.to_string()),
        siblings: Vec::new(),
    }
}

pub fn initiate_params(order_id: u64, amount: Decimal) -> InitiateParams {
    InitiateParams {
        order_id,
        payment_method_id: 1,
        amount: Money::new(amount),
        commit: Some(SUBMIT_ORDER_LABEL.to_string()),
    }
}

/// The checkout flow wired to in-memory stores and a sandbox gateway.
pub struct Harness {
    pub orders: Arc<InMemoryOrderStore>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub gateway: Arc<SandboxGateway>,
    pub queue: Arc<RecordingJobQueue>,
    pub initiator: CheckoutInitiator,
    pub confirmation: ConfirmationHandler,
}

pub async fn seeded(orders: Vec<Order>) -> Arc<InMemoryOrderStore> {
    let store = Arc::new(InMemoryOrderStore::new());
    for order in orders {
        store.store(order).await.unwrap();
    }
    store
}

pub fn ledger(orders: &Arc<InMemoryOrderStore>, payments: &Arc<InMemoryPaymentStore>) -> Ledger {
    Ledger::new(
        orders.clone(),
        payments.clone(),
        Arc::new(InMemoryBatchStore::new(orders, payments)),
    )
}

impl Harness {
    pub async fn new(orders: Vec<Order>, script: SandboxScript, config: CheckoutConfig) -> Self {
        let orders = seeded(orders).await;
        let payments = Arc::new(InMemoryPaymentStore::new());
        let ledger = ledger(&orders, &payments);
        let recorder = Arc::new(RecordingJobQueue::new());
        Self::assemble(orders, payments, ledger, script, config, recorder.clone(), recorder)
    }

    /// Wires the flow onto existing stores; jobs go to `queue`.
    pub fn assemble(
        orders: Arc<InMemoryOrderStore>,
        payments: Arc<InMemoryPaymentStore>,
        ledger: Ledger,
        script: SandboxScript,
        config: CheckoutConfig,
        recorder: Arc<RecordingJobQueue>,
        queue: SharedJobQueue,
    ) -> Self {
        let gateway = Arc::new(SandboxGateway::new(&config.gateway_url, script).unwrap());
        let config = Arc::new(config);

        let initiator = CheckoutInitiator::new(
            orders.clone(),
            payments.clone(),
            gateway.clone(),
            config.clone(),
        );
        let confirmation = ConfirmationHandler::new(
            ledger,
            gateway.clone(),
            PaymentReconciler::for_mode(config.reconciliation, queue),
            config,
        );

        Self {
            orders,
            payments,
            gateway,
            queue: recorder,
            initiator,
            confirmation,
        }
    }

    pub async fn order(&self, id: u64) -> Order {
        self.orders.get(id).await.unwrap().unwrap()
    }
}

pub fn write_fixture(path: &Path, json: &str) -> Result<(), Error> {
    std::fs::write(path, json)
}

pub fn write_events(path: &Path, rows: &[&[&str]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);

    wtr.write_record([
        "type",
        "order",
        "payment_method",
        "amount",
        "token",
        "payer_id",
        "commit",
        "format",
        "siblings",
    ])?;
    for row in rows {
        wtr.write_record(*row)?;
    }

    wtr.flush()?;
    Ok(())
}
