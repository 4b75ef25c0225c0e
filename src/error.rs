use crate::domain::gateway::GatewayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Order not found: {0}")]
    OrderNotFound(u64),
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(u64),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}
