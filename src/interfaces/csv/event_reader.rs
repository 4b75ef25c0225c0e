use crate::application::confirmation::ConfirmParams;
use crate::application::initiator::InitiateParams;
use crate::domain::money::Money;
use crate::domain::order::OrderId;
use crate::domain::payment::PaymentSpec;
use crate::error::{CheckoutError, Result};
use crate::interfaces::controller::Format;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    Initiate,
    Confirm,
    Cancel,
}

/// One row of the events file.
#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "type")]
    kind: EventKind,
    order: OrderId,
    #[serde(default)]
    payment_method: Option<u64>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    payer_id: Option<String>,
    #[serde(default)]
    commit: Option<String>,
    #[serde(default)]
    format: Option<Format>,
    /// Allocations to other orders as `order:amount` pairs separated by `;`.
    #[serde(default)]
    siblings: Option<String>,
}

/// A request replayed against the checkout endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    Initiate {
        params: InitiateParams,
        format: Format,
    },
    Confirm {
        params: ConfirmParams,
        format: Format,
    },
    Cancel {
        order_id: OrderId,
        token: Option<String>,
        format: Format,
    },
}

impl TryFrom<EventRecord> for CheckoutEvent {
    type Error = CheckoutError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let format = record.format.unwrap_or_default();
        let commit = record.commit.filter(|commit| !commit.is_empty());

        match record.kind {
            EventKind::Initiate => Ok(CheckoutEvent::Initiate {
                params: InitiateParams {
                    order_id: record.order,
                    payment_method_id: required(record.payment_method, "payment_method")?,
                    amount: Money::new(required(record.amount, "amount")?),
                    commit,
                },
                format,
            }),
            EventKind::Confirm => Ok(CheckoutEvent::Confirm {
                params: ConfirmParams {
                    order_id: record.order,
                    token: record.token.unwrap_or_default(),
                    payer_id: record.payer_id.unwrap_or_default(),
                    amount: Money::new(required(record.amount, "amount")?),
                    payment_method_id: required(record.payment_method, "payment_method")?,
                    commit,
                    siblings: parse_siblings(record.siblings.as_deref().unwrap_or(""))?,
                },
                format,
            }),
            EventKind::Cancel => Ok(CheckoutEvent::Cancel {
                order_id: record.order,
                token: record.token.filter(|token| !token.is_empty()),
                format,
            }),
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| CheckoutError::ValidationError(format!("missing {}", field)))
}

fn parse_siblings(raw: &str) -> Result<Vec<PaymentSpec>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let invalid = || CheckoutError::ValidationError(format!("invalid sibling '{}'", pair));
            let (order, amount) = pair.split_once(':').ok_or_else(invalid)?;
            let amount = Money::new(Decimal::from_str(amount.trim()).map_err(|_| invalid())?);
            if !amount.is_positive() {
                return Err(invalid());
            }
            Ok(PaymentSpec {
                order_id: order.trim().parse().map_err(|_| invalid())?,
                amount,
            })
        })
        .collect()
}

/// Reads checkout events from a CSV source.
///
/// Whitespace is trimmed and trailing optional columns may be left out.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads the events; a bad row yields an error and reading goes on.
    pub fn events(self) -> impl Iterator<Item = Result<CheckoutEvent>> {
        self.reader.into_deserialize().map(|result| {
            let record: EventRecord = result?;
            CheckoutEvent::try_from(record)
        })
    }
}
