//! Typed request and response schema of the express checkout gateway.
//!
//! Field names follow the gateway's wire names through `serde` renames;
//! optional parts of the payload are `Option`s skipped when absent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    #[serde(rename = "currencyID")]
    pub currency_id: String,
    pub value: Decimal,
}

impl CurrencyAmount {
    pub fn new(currency: &str, value: Decimal) -> Self {
        Self {
            currency_id: currency.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Physical,
    Digital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentAction {
    Sale,
    Authorization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentDetailsItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub quantity: u32,
    pub amount: CurrencyAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_category: Option<ItemCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipToAddress {
    pub name: String,
    pub street1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    pub city_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_or_province: Option<String>,
    pub country: String,
    pub postal_code: String,
}

/// Money breakdown of the checkout.
///
/// Only `order_total` is mandatory; the gateway refuses a zero item total,
/// in which case every other field stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentDetails {
    pub order_total: CurrencyAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_total: Option<CurrencyAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_total: Option<CurrencyAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_total: Option<CurrencyAmount>,
    #[serde(
        rename = "PaymentDetailsItem",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub items: Vec<PaymentDetailsItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_to_address: Option<ShipToAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_action: Option<PaymentAction>,
}

impl PaymentDetails {
    pub fn order_total_only(order_total: CurrencyAmount) -> Self {
        Self {
            order_total,
            item_total: None,
            shipping_total: None,
            tax_total: None,
            items: Vec::new(),
            ship_to_address: None,
            shipping_method: None,
            payment_action: None,
        }
    }

    pub fn has_breakdown(&self) -> bool {
        self.item_total.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetExpressCheckoutRequestDetails {
    #[serde(rename = "InvoiceID")]
    pub invoice_id: String,
    #[serde(rename = "BuyerEmail", skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(rename = "ReturnURL")]
    pub return_url: String,
    #[serde(rename = "CancelURL")]
    pub cancel_url: String,
    #[serde(rename = "SolutionType")]
    pub solution_type: String,
    #[serde(rename = "LandingPage")]
    pub landing_page: String,
    #[serde(rename = "cppheaderimage")]
    pub header_image: String,
    #[serde(rename = "NoShipping")]
    pub no_shipping: u8,
    #[serde(rename = "PaymentDetails")]
    pub payment_details: Vec<PaymentDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetExpressCheckoutRequest {
    #[serde(rename = "SetExpressCheckoutRequestDetails")]
    pub details: SetExpressCheckoutRequestDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    Success,
    SuccessWithWarning,
    Failure,
    FailureWithWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDetail {
    pub error_code: String,
    pub short_message: String,
    pub long_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetExpressCheckoutResponse {
    pub ack: Ack,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

impl SetExpressCheckoutResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.ack, Ack::Success | Ack::SuccessWithWarning)
    }

    pub fn long_messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .map(|error| error.long_message.as_str())
            .collect()
    }
}

/// What the buyer is shown on the gateway's approval page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Continue,
    /// "Pay now": the buyer will not review the order again afterwards.
    Commit,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Continue => "continue",
            UserAction::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DoExpressCheckoutPaymentRequest {
    pub token: String,
    #[serde(rename = "PayerID")]
    pub payer_id: String,
    #[serde(rename = "InvoiceID")]
    pub invoice_id: String,
    pub order_total: CurrencyAmount,
    pub payment_action: PaymentAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureResponse {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
}

/// Failure modes of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway answered and refused the request.
    #[error("{}", .0.join(" "))]
    Declined(Vec<String>),
    /// The gateway could not be reached.
    #[error("connection failed: {0}")]
    Transport(String),
    /// The gateway failed while processing an already approved payment.
    #[error("{0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_total_only_serializes_single_key() {
        let details = PaymentDetails::order_total_only(CurrencyAmount::new("USD", dec!(12.50)));
        let json = serde_json::to_value(&details).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "OrderTotal": { "currencyID": "USD", "value": "12.50" } })
        );
        assert!(!details.has_breakdown());
    }

    #[test]
    fn test_response_success_flags() {
        let response = SetExpressCheckoutResponse {
            ack: Ack::SuccessWithWarning,
            token: Some("EC-1".to_string()),
            errors: Vec::new(),
        };
        assert!(response.is_success());

        let failed = SetExpressCheckoutResponse {
            ack: Ack::Failure,
            token: None,
            errors: vec![ErrorDetail {
                error_code: "10413".to_string(),
                short_message: "Invalid data".to_string(),
                long_message: "The totals of the cart item amounts do not match order amounts."
                    .to_string(),
            }],
        };
        assert!(!failed.is_success());
        assert_eq!(failed.long_messages().len(), 1);
    }

    #[test]
    fn test_declined_error_joins_reasons() {
        let error = GatewayError::Declined(vec!["First.".to_string(), "Second.".to_string()]);
        assert_eq!(error.to_string(), "First. Second.");
    }
}
