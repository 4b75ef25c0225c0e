use super::money::Money;
use super::order::OrderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

pub type PaymentId = u64;

/// Things that can be done to a captured express checkout payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceAction {
    Credit,
}

/// The gateway session a buyer approved: the checkout token plus the payer.
///
/// Created once per confirmation attempt and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressCheckoutSession {
    token: String,
    payer_id: String,
}

impl ExpressCheckoutSession {
    pub fn new(token: impl Into<String>, payer_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            payer_id: payer_id.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn payer_id(&self) -> &str {
        &self.payer_id
    }

    pub fn actions(&self) -> &'static [SourceAction] {
        &[SourceAction::Credit]
    }

    /// Gateways generally only credit settled payments.
    pub fn can_credit(&self, payment: &PaymentIntent) -> bool {
        payment.is_completed() && payment.credit_allowed().is_positive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntentState {
    #[default]
    Checkout,
    /// Allocations are held on the orders until the background worker
    /// settles them.
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildPaymentState {
    Pending,
    Completed,
}

/// One allocation of an account payment to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSpec {
    pub order_id: OrderId,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub state: ChildPaymentState,
}

/// Reconciliation work handed to the background queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileJob {
    pub intent_id: PaymentId,
    pub specs: Vec<PaymentSpec>,
}

/// Everything needed to open a new payment intent.
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub order_id: OrderId,
    pub source: ExpressCheckoutSession,
    pub amount: Money,
    pub account_id: u64,
    pub customer_id: u64,
    pub vendor_id: u64,
    pub last_ip_address: Option<IpAddr>,
    pub payment_method_id: u64,
    pub orders_amount_sum: Money,
}

/// An account payment made through express checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub source: ExpressCheckoutSession,
    pub amount: Money,
    pub account_id: u64,
    pub customer_id: u64,
    pub vendor_id: u64,
    pub last_ip_address: Option<IpAddr>,
    pub payment_method_id: u64,
    /// Sum of every allocation this payment is split into.
    pub orders_amount_sum: Money,
    pub state: PaymentIntentState,
    #[serde(default)]
    pub child_payments: Vec<ChildPayment>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub refunded_total: Money,
}

impl PaymentIntent {
    pub fn new(id: PaymentId, new: NewPaymentIntent) -> Self {
        Self {
            id,
            order_id: new.order_id,
            source: new.source,
            amount: new.amount,
            account_id: new.account_id,
            customer_id: new.customer_id,
            vendor_id: new.vendor_id,
            last_ip_address: new.last_ip_address,
            payment_method_id: new.payment_method_id,
            orders_amount_sum: new.orders_amount_sum,
            state: PaymentIntentState::Checkout,
            child_payments: Vec::new(),
            transaction_id: None,
            refunded_total: Money::ZERO,
        }
    }

    /// Validates the intent and its allocations.
    ///
    /// `outstanding` holds the outstanding balance of every order named in
    /// `specs`. Each order may be allocated once, every allocation must be
    /// positive and fit its own order's balance, and the sum must fit the
    /// combined balance.
    pub fn validate(
        &self,
        specs: &[PaymentSpec],
        outstanding: &BTreeMap<OrderId, Money>,
    ) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.amount.is_positive() {
            errors.push("Amount must be greater than 0".to_string());
        }
        if self.source.token().trim().is_empty() {
            errors.push("Source token can't be blank".to_string());
        }
        if self.source.payer_id().trim().is_empty() {
            errors.push("Payer can't be blank".to_string());
        }

        let mut seen = BTreeSet::new();
        for spec in specs {
            if !seen.insert(spec.order_id) {
                errors.push(format!("Order {} is allocated more than once", spec.order_id));
                continue;
            }
            // The main allocation is the intent amount, checked above.
            if spec.order_id != self.order_id && !spec.amount.is_positive() {
                errors.push(format!("Amount for order {} must be greater than 0", spec.order_id));
            }
            let balance = outstanding.get(&spec.order_id).copied().unwrap_or(Money::ZERO);
            if spec.amount > balance {
                errors.push(format!(
                    "Amount {} for order {} exceeds its outstanding balance of {}",
                    spec.amount, spec.order_id, balance
                ));
            }
        }

        let total_outstanding: Money = outstanding.values().copied().sum();
        if self.orders_amount_sum > total_outstanding {
            errors.push(format!(
                "Amount {} exceeds the outstanding balance of {}",
                self.orders_amount_sum, total_outstanding
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn is_checkout(&self) -> bool {
        self.state == PaymentIntentState::Checkout
    }

    pub fn is_completed(&self) -> bool {
        self.state == PaymentIntentState::Completed
    }

    pub fn credit_allowed(&self) -> Money {
        if self.is_completed() {
            (self.amount - self.refunded_total).non_negative()
        } else {
            Money::ZERO
        }
    }

    pub fn capture(&mut self, transaction_id: impl Into<String>) {
        self.transaction_id = Some(transaction_id.into());
        self.state = PaymentIntentState::Completed;
    }

    pub fn is_pending(&self) -> bool {
        self.state == PaymentIntentState::Pending
    }

    /// Completes the intent once no child payment is left pending.
    pub fn complete_if_settled(&mut self) -> bool {
        let settled = self
            .child_payments
            .iter()
            .all(|child| child.state == ChildPaymentState::Completed);
        if settled {
            self.state = PaymentIntentState::Completed;
        }
        settled
    }

    pub fn has_child_payment_for(&self, order_id: OrderId) -> bool {
        self.child_payments
            .iter()
            .any(|child| child.order_id == order_id)
    }
}
