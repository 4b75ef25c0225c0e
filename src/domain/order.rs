use super::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type OrderId = u64;

/// Checkout states in the order they are walked through.
///
/// The derived `Ord` is the state machine's total order: an order only ever
/// moves to a greater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    #[default]
    Cart,
    Address,
    Delivery,
    Payment,
    Confirm,
    Complete,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Cart => "cart",
            OrderState::Address => "address",
            OrderState::Delivery => "delivery",
            OrderState::Payment => "payment",
            OrderState::Confirm => "confirm",
            OrderState::Complete => "complete",
        }
    }

    /// The state following this one, `None` once complete.
    pub fn successor(&self) -> Option<Self> {
        match self {
            OrderState::Cart => Some(OrderState::Address),
            OrderState::Address => Some(OrderState::Delivery),
            OrderState::Delivery => Some(OrderState::Payment),
            OrderState::Payment => Some(OrderState::Confirm),
            OrderState::Confirm => Some(OrderState::Complete),
            OrderState::Complete => None,
        }
    }

    pub fn precedes(&self, other: OrderState) -> bool {
        *self < other
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition that declined to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionHalt {
    pub from: OrderState,
    pub reason: String,
}

impl fmt::Display for TransitionHalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order halted in {}: {}", self.from, self.reason)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Tax,
    Shipping,
    Promotion,
    Other,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Adjustment {
    pub label: String,
    pub amount: Decimal,
    pub kind: AdjustmentKind,
    #[serde(default = "default_true")]
    pub eligible: bool,
    /// Added on top of the item total rather than included in it.
    #[serde(default = "default_true")]
    pub additional: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LineItem {
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub price: Money,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub state_name: Option<String>,
    pub country_iso: String,
    pub zipcode: String,
}

impl Address {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    BalanceDue,
    Pending,
    Paid,
}

/// A purchase order as seen by the checkout flow.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub number: String,
    pub company_id: u64,
    #[serde(default)]
    pub email: Option<String>,
    pub currency: String,
    pub total: Money,
    #[serde(default)]
    pub additional_tax_total: Money,
    #[serde(default)]
    pub state: OrderState,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default)]
    pub bill_address: Option<Address>,
    pub account_id: u64,
    pub customer_id: u64,
    pub vendor_id: u64,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub channel: Option<String>,
    /// Orders awaiting approval stop at `confirm`.
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub payment_total: Money,
    #[serde(default)]
    pub pending_payment_total: Money,
}

impl Order {
    pub fn is_completed(&self) -> bool {
        self.state == OrderState::Complete
    }

    pub fn is_paid(&self) -> bool {
        self.payment_total.is_positive() && self.payment_total >= self.total
    }

    /// Pending payments already cover whatever is left to pay.
    pub fn final_payments_pending(&self) -> bool {
        self.pending_payment_total.is_positive()
            && self.payment_total + self.pending_payment_total >= self.total
    }

    pub fn payment_state(&self) -> PaymentState {
        if self.is_paid() {
            PaymentState::Paid
        } else if self.pending_payment_total.is_positive() {
            PaymentState::Pending
        } else {
            PaymentState::BalanceDue
        }
    }

    pub fn outstanding_balance(&self) -> Money {
        (self.total - self.payment_total - self.pending_payment_total).non_negative()
    }

    /// Additional adjustments that currently apply to the order.
    pub fn eligible_additional_adjustments(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustments
            .iter()
            .filter(|adjustment| adjustment.additional && adjustment.eligible)
    }

    /// Moves the order one state forward.
    ///
    /// Each transition checks its own guard and returns a [`TransitionHalt`]
    /// when the order cannot leave its current state yet.
    pub fn advance(&mut self) -> Result<OrderState, TransitionHalt> {
        let Some(next) = self.state.successor() else {
            return Err(self.halt("order is already complete"));
        };

        match self.state {
            OrderState::Cart if self.line_items.is_empty() => {
                return Err(self.halt("order has no line items"));
            }
            OrderState::Address if self.bill_address.is_none() => {
                return Err(self.halt("billing address is missing"));
            }
            OrderState::Confirm if self.requires_approval => {
                return Err(self.halt("order is awaiting approval"));
            }
            _ => {}
        }

        self.state = next;
        Ok(next)
    }

    fn halt(&self, reason: &str) -> TransitionHalt {
        TransitionHalt {
            from: self.state,
            reason: reason.to_string(),
        }
    }

    /// Checks whether a customer may submit the order.
    ///
    /// `skip_payment` leaves out the payment coverage check, used while the
    /// payment for this very submission is still being created.
    pub fn validate_for_customer_submit(&self, skip_payment: bool) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.line_items.is_empty() {
            errors.push("Order must contain at least one line item".to_string());
        }
        for item in &self.line_items {
            if item.quantity == 0 {
                errors.push(format!("{}: quantity must be greater than 0", item.sku));
            }
        }
        if self.email.as_deref().is_none_or(|email| email.trim().is_empty()) {
            errors.push("Email can't be blank".to_string());
        }
        if self.bill_address.is_none() {
            errors.push("Bill address can't be blank".to_string());
        }
        if !skip_payment && self.payment_total + self.pending_payment_total < self.total {
            errors.push("Payment is required".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn apply_payment(&mut self, amount: Money) {
        self.payment_total += amount;
    }

    pub fn hold_pending_payment(&mut self, amount: Money) {
        self.pending_payment_total += amount;
    }

    /// Moves a previously held amount into the paid total.
    pub fn settle_pending_payment(&mut self, amount: Money) {
        self.pending_payment_total = (self.pending_payment_total - amount).non_negative();
        self.payment_total += amount;
    }
}
