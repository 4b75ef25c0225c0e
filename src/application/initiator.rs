use super::directive::{self, Directive, Flash};
use super::find_order;
use super::request_builder::{CheckoutParams, build_set_express_checkout};
use crate::config::CheckoutConfig;
use crate::domain::gateway::{GatewayError, UserAction};
use crate::domain::money::Money;
use crate::domain::order::OrderId;
use crate::domain::ports::{SharedGateway, SharedOrderStore, SharedPaymentStore};
use crate::domain::user::CurrentUser;
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct InitiateParams {
    pub order_id: OrderId,
    pub payment_method_id: u64,
    pub amount: Money,
    pub commit: Option<String>,
}

/// Starts express checkout sessions and handles buyers coming back from a
/// cancelled one.
pub struct CheckoutInitiator {
    orders: SharedOrderStore,
    payments: SharedPaymentStore,
    gateway: SharedGateway,
    config: Arc<CheckoutConfig>,
}

impl CheckoutInitiator {
    /// Creates a new `CheckoutInitiator`.
    ///
    /// # Arguments
    ///
    /// * `orders` - The store the buyer's orders are looked up in.
    /// * `payments` - Counts earlier attempts to number the invoice.
    /// * `gateway` - Opens express checkout sessions.
    /// * `config` - Routes, labels and payment methods.
    pub fn new(
        orders: SharedOrderStore,
        payments: SharedPaymentStore,
        gateway: SharedGateway,
        config: Arc<CheckoutConfig>,
    ) -> Self {
        Self {
            orders,
            payments,
            gateway,
            config,
        }
    }

    /// Opens a gateway session and points the buyer at its approval page.
    ///
    /// Declines and connection failures send the buyer back to the order with
    /// an error; nothing is retried and no payment is recorded either way.
    #[instrument(skip(self, user, params), fields(order_id = params.order_id, amount = %params.amount))]
    pub async fn initiate(&self, user: &CurrentUser, params: InitiateParams) -> Result<Directive> {
        let order = find_order(&*self.orders, user, params.order_id).await?;
        let payment_method = self.config.payment_method(params.payment_method_id)?;
        let attempt = self.payments.for_order(order.id).await?.len() + 1;

        let request = build_set_express_checkout(
            &order,
            &CheckoutParams {
                amount: params.amount,
                attempt,
                commit: params.commit.as_deref(),
                payment_method,
                routes: &self.config.routes,
                shipping_method: &self.config.shipping_method,
            },
        )?;
        let edit_order = self.config.routes.edit_order(&order);

        match self.gateway.set_express_checkout(&request).await {
            Ok(response) if response.is_success() => {
                let approval = self.gateway.approval_url(&response, UserAction::Commit)?;
                info!(invoice = %request.details.invoice_id, "Express checkout session opened");
                Ok(Directive::redirect(approval.as_str(), None))
            }
            Ok(response) => {
                let reasons = response.long_messages();
                warn!(reasons = ?reasons, "Gateway refused express checkout");
                Ok(Directive::redirect(
                    edit_order,
                    Some(Flash::errors(vec![directive::generic_error(&reasons)])),
                ))
            }
            Err(GatewayError::Transport(cause)) => {
                warn!(%cause, "Gateway unreachable");
                Ok(Directive::redirect(
                    edit_order,
                    Some(Flash::errors(vec![directive::CONNECTION_FAILED.to_string()])),
                ))
            }
            Err(GatewayError::Declined(reasons)) => {
                warn!(reasons = ?reasons, "Gateway declined express checkout");
                let reasons: Vec<&str> = reasons.iter().map(String::as_str).collect();
                Ok(Directive::redirect(
                    edit_order,
                    Some(Flash::errors(vec![directive::generic_error(&reasons)])),
                ))
            }
            Err(GatewayError::Processing(message)) => {
                warn!(%message, "Gateway failed to open express checkout");
                Ok(Directive::redirect(
                    edit_order,
                    Some(Flash::errors(vec![directive::generic_error(&[&message])])),
                ))
            }
        }
    }

    /// The buyer backed out on the gateway's page.
    #[instrument(skip(self, user))]
    pub async fn cancel(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        token: Option<&str>,
    ) -> Result<Directive> {
        let order = find_order(&*self.orders, user, order_id).await?;
        let location = self.config.routes.checkout_state(order.state, token)?;
        info!(state = %order.state, "Express checkout cancelled");
        Ok(Directive::redirect(
            location,
            Some(Flash::notice(directive::CANCELLED)),
        ))
    }
}
