//! Runtime configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! (or no file at all) yields a working sandbox setup.

use crate::domain::money::Money;
use crate::domain::order::{Order, OrderId, OrderState};
use crate::domain::payment_method::{PaymentMethod, Preferences};
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use url::{Position, Url};

pub const SUBMIT_ORDER_LABEL: &str = "Submit Order";
pub const B2B_PORTAL_CHANNEL: &str = "b2b_portal";
pub const SHIPPING_METHOD_LABEL: &str = "Shipping Method Name Goes Here";
pub const SANDBOX_APPROVAL_URL: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";

/// How child payments are processed once a payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// In-line, inside the confirmation's unit of work.
    Immediate,
    /// Handed to the background queue after the unit of work commits.
    #[default]
    Deferred,
}

/// Storefront routes the flow redirects to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub base_url: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Routes {
    fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?.join(path)?)
    }

    pub fn edit_order(&self, order: &Order) -> String {
        format!("/orders/{}/edit", order.number)
    }

    pub fn success_order(&self, order: &Order) -> String {
        format!("/orders/{}/success", order.number)
    }

    pub fn checkout_state(&self, state: OrderState, cancel_token: Option<&str>) -> Result<String> {
        let mut url = self.url(&format!("/checkout/{state}"))?;
        if let Some(token) = cancel_token {
            url.query_pairs_mut()
                .append_pair("paypal_cancel_token", token);
        }
        Ok(url[Position::BeforePath..].to_string())
    }

    /// Where the gateway sends the buyer back after approval.
    pub fn confirm_url(
        &self,
        order_id: OrderId,
        payment_method_id: u64,
        amount: Money,
        commit: Option<&str>,
    ) -> Result<Url> {
        let mut url = self.url("/paypal/confirm")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("payment_method_id", &payment_method_id.to_string())
                .append_pair("utm_nooverride", "1")
                .append_pair("order_id", &order_id.to_string())
                .append_pair("amount", &amount.to_string());
            if let Some(commit) = commit {
                query.append_pair("commit", commit);
            }
        }
        Ok(url)
    }

    pub fn cancel_url(&self, order_id: OrderId) -> Result<Url> {
        let mut url = self.url("/paypal/cancel")?;
        url.query_pairs_mut()
            .append_pair("order_id", &order_id.to_string());
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub routes: Routes,
    /// Commit value that marks the final submission of an order.
    pub submit_order_label: String,
    /// Channel stamped on orders confirmed straight from the cart.
    pub channel: String,
    pub reconciliation: ReconcileMode,
    /// Reconcile child payments even when the order stopped short of complete.
    pub reconcile_incomplete_orders: bool,
    pub shipping_method: String,
    pub gateway_url: String,
    pub payment_methods: Vec<PaymentMethod>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            routes: Routes::default(),
            submit_order_label: SUBMIT_ORDER_LABEL.to_string(),
            channel: B2B_PORTAL_CHANNEL.to_string(),
            reconciliation: ReconcileMode::default(),
            reconcile_incomplete_orders: true,
            shipping_method: SHIPPING_METHOD_LABEL.to_string(),
            gateway_url: SANDBOX_APPROVAL_URL.to_string(),
            payment_methods: vec![PaymentMethod {
                id: 1,
                name: "PayPal Express".to_string(),
                preferences: Preferences::default(),
            }],
        }
    }
}

impl CheckoutConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn payment_method(&self, id: u64) -> Result<&PaymentMethod> {
        self.payment_methods
            .iter()
            .find(|method| method.id == id)
            .ok_or(CheckoutError::PaymentMethodNotFound(id))
    }

    pub fn is_final_submit(&self, commit: Option<&str>) -> bool {
        commit == Some(self.submit_order_label.as_str())
    }
}
