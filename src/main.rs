use clap::Parser;
use express_checkout::application::confirmation::ConfirmationHandler;
use express_checkout::application::initiator::CheckoutInitiator;
use express_checkout::application::reconciler::PaymentReconciler;
use express_checkout::application::unit_of_work::Ledger;
use express_checkout::config::CheckoutConfig;
use express_checkout::domain::ports::{
    SharedBatchStore, SharedGateway, SharedOrderStore, SharedPaymentStore,
};
use express_checkout::domain::user::CurrentUser;
use express_checkout::infrastructure::in_memory::{
    InMemoryBatchStore, InMemoryOrderStore, InMemoryPaymentStore,
};
use express_checkout::infrastructure::job_queue::TokioJobQueue;
use express_checkout::infrastructure::sandbox::SandboxGateway;
use express_checkout::interfaces::controller::{ExpressCheckoutController, Response};
use express_checkout::interfaces::csv::event_reader::{CheckoutEvent, EventReader};
use express_checkout::interfaces::csv::order_writer::OrderWriter;
use express_checkout::interfaces::fixtures::Fixture;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON fixture with the signed-in user and their orders
    fixture: PathBuf,

    /// Checkout events CSV file
    events: PathBuf,

    /// JSON configuration file (optional); defaults apply otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<Ledger> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        use express_checkout::infrastructure::rocksdb::RocksDBStore;

        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        let orders: SharedOrderStore = Arc::new(store.clone());
        let payments: SharedPaymentStore = Arc::new(store.clone());
        let batches: SharedBatchStore = Arc::new(store);
        return Ok(Ledger::new(orders, payments, batches));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    let orders = InMemoryOrderStore::new();
    let payments = InMemoryPaymentStore::new();
    let batches: SharedBatchStore = Arc::new(InMemoryBatchStore::new(&orders, &payments));
    let orders: SharedOrderStore = Arc::new(orders);
    let payments: SharedPaymentStore = Arc::new(payments);
    Ok(Ledger::new(orders, payments, batches))
}

async fn replay(
    controller: &ExpressCheckoutController,
    user: &CurrentUser,
    event: CheckoutEvent,
) -> express_checkout::error::Result<Response> {
    match event {
        CheckoutEvent::Initiate { params, format } => {
            controller.express(user, params, format).await
        }
        CheckoutEvent::Confirm { params, format } => {
            controller.confirm(user, params, format).await
        }
        CheckoutEvent::Cancel {
            order_id,
            token,
            format,
        } => {
            controller
                .cancel(user, order_id, token.as_deref(), format)
                .await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Arc::new(match &cli.config {
        Some(path) => CheckoutConfig::from_path(path).into_diagnostic()?,
        None => CheckoutConfig::default(),
    });
    let fixture = Fixture::from_path(&cli.fixture).into_diagnostic()?;
    let ledger = open_ledger(cli.db_path)?;
    let orders = ledger.orders().clone();

    // Orders already in a persistent store keep their recorded state.
    for order in fixture.orders {
        if orders.get(order.id).await.into_diagnostic()?.is_none() {
            orders.store(order).await.into_diagnostic()?;
        }
    }

    let gateway: SharedGateway = Arc::new(
        SandboxGateway::new(&config.gateway_url, fixture.gateway).into_diagnostic()?,
    );
    let (queue, worker) = TokioJobQueue::spawn(ledger.clone());
    let reconciler = PaymentReconciler::for_mode(config.reconciliation, queue.clone());

    let controller = ExpressCheckoutController::new(
        CheckoutInitiator::new(
            orders.clone(),
            ledger.payments().clone(),
            gateway.clone(),
            config.clone(),
        ),
        ConfirmationHandler::new(ledger, gateway, reconciler, config),
    );

    let file = File::open(cli.events).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => match replay(&controller, &fixture.user, event).await {
                Ok(response) => info!(%response, "Response"),
                Err(e) => eprintln!("Error processing event: {}", e),
            },
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    queue.close().await;
    let settled = worker.join().await.into_diagnostic()?;
    info!(settled, "Reconciliation drained");

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer
        .write_orders(orders.get_all().await.into_diagnostic()?)
        .into_diagnostic()?;

    Ok(())
}
