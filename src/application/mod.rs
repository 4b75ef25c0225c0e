//! Application layer orchestrating the express checkout flow.
//!
//! `CheckoutInitiator` starts a gateway session, `ConfirmationHandler` turns
//! the buyer's approval into a payment and drives the order to completion, and
//! `PaymentReconciler` allocates the payment to orders. All of them return a
//! [`directive::Directive`] describing where the buyer goes next; gateway and
//! validation failures are directives too, never errors.
//!
//! Order and payment writes go through a single [`unit_of_work::Ledger`]
//! shared with the background reconciliation worker, which admits one unit
//! of work at a time.

pub mod confirmation;
pub mod directive;
pub mod initiator;
pub mod reconciler;
pub mod request_builder;
pub mod unit_of_work;

use crate::domain::order::{Order, OrderId};
use crate::domain::ports::OrderStore;
use crate::domain::user::CurrentUser;
use crate::error::{CheckoutError, Result};

/// Loads an order the user's company owns; other companies' orders are
/// reported as missing.
pub(crate) async fn find_order(
    store: &dyn OrderStore,
    user: &CurrentUser,
    order_id: OrderId,
) -> Result<Order> {
    store
        .get(order_id)
        .await?
        .filter(|order| order.company_id == user.company_id)
        .ok_or(CheckoutError::OrderNotFound(order_id))
}
