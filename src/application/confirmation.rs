use super::directive::{self, Directive, Flash};
use super::find_order;
use super::reconciler::{PaymentReconciler, amount_sum, payment_specs};
use super::request_builder::invoice_id;
use super::unit_of_work::{Ledger, UnitOfWork};
use crate::config::CheckoutConfig;
use crate::domain::gateway::{CurrencyAmount, DoExpressCheckoutPaymentRequest, PaymentAction};
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderId, OrderState, TransitionHalt};
use crate::domain::payment::{ExpressCheckoutSession, NewPaymentIntent, PaymentIntent, PaymentSpec};
use crate::domain::ports::SharedGateway;
use crate::domain::user::CurrentUser;
use crate::error::{CheckoutError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Parameters the gateway hands back when the buyer approves.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmParams {
    pub order_id: OrderId,
    pub token: String,
    pub payer_id: String,
    pub amount: Money,
    pub payment_method_id: u64,
    pub commit: Option<String>,
    /// Allocations of the same payment to other orders.
    pub siblings: Vec<PaymentSpec>,
}

/// How far the order got while being driven to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Completed,
    Halted(TransitionHalt),
}

/// Advances the order until it is complete or a transition declines.
pub fn drive_to_completion(order: &mut Order) -> Completion {
    while order.state.precedes(OrderState::Complete) {
        if let Err(halt) = order.advance() {
            return Completion::Halted(halt);
        }
    }
    Completion::Completed
}

/// Turns an approved gateway session into a payment and completes the order.
pub struct ConfirmationHandler {
    ledger: Ledger,
    gateway: SharedGateway,
    reconciler: PaymentReconciler,
    config: Arc<CheckoutConfig>,
}

impl ConfirmationHandler {
    /// Creates a new `ConfirmationHandler`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Owner of order and payment writes, shared with the
    ///   reconciliation worker.
    /// * `gateway` - Captures approved payments.
    /// * `reconciler` - Allocates the payment to orders.
    /// * `config` - Routes, labels and payment methods.
    pub fn new(
        ledger: Ledger,
        gateway: SharedGateway,
        reconciler: PaymentReconciler,
        config: Arc<CheckoutConfig>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            reconciler,
            config,
        }
    }

    /// Records the approved payment and drives the order to completion.
    ///
    /// The ledger stays held from the first read to the commit, so the
    /// balances checked here are the ones the payment is applied to.
    #[instrument(skip(self, user, params), fields(order_id = params.order_id, amount = %params.amount))]
    pub async fn confirm(&self, user: &CurrentUser, params: ConfirmParams) -> Result<Directive> {
        let uow = self.ledger.begin().await;
        let orders = self.ledger.orders();
        let payments = self.ledger.payments();

        let order = find_order(&**orders, user, params.order_id).await?;
        self.config.payment_method(params.payment_method_id)?;

        if order.final_payments_pending() {
            warn!("Final payment already pending");
            return Ok(Directive::render_errors(vec![
                directive::PAYMENTS_PENDING.to_string(),
            ]));
        }
        if order.is_paid() {
            warn!("Order already paid");
            return Ok(Directive::render_errors(vec![
                directive::ALREADY_PAID.to_string(),
            ]));
        }

        let specs = payment_specs(order.id, params.amount, &params.siblings);
        let outstanding = self.outstanding_balances(user, &order, &specs).await?;
        let attempt = payments.for_order(order.id).await?.len() + 1;
        let intent = PaymentIntent::new(
            payments.next_id().await?,
            NewPaymentIntent {
                order_id: order.id,
                source: ExpressCheckoutSession::new(&params.token, &params.payer_id),
                amount: params.amount,
                account_id: order.account_id,
                customer_id: order.customer_id,
                vendor_id: order.vendor_id,
                last_ip_address: user.current_sign_in_ip,
                payment_method_id: params.payment_method_id,
                orders_amount_sum: amount_sum(&specs),
            },
        );

        let mut errors = Vec::new();
        if let Err(intent_errors) = intent.validate(&specs, &outstanding) {
            errors.extend(intent_errors);
        }
        if let Err(order_errors) = order.validate_for_customer_submit(true) {
            errors.extend(order_errors);
        }
        if !errors.is_empty() {
            warn!(?errors, "Confirmation rejected");
            return Ok(Directive::render_errors(errors));
        }

        payments.store(intent.clone()).await?;
        let intent_id = intent.id;
        let invoice = invoice_id(&order, attempt);

        let order = match self.complete(uow, user, order, intent, &specs, &invoice).await {
            Ok((Completion::Completed, order)) => {
                info!(intent_id, "Order completed");
                order
            }
            Ok((Completion::Halted(halt), order)) => {
                warn!(intent_id, %halt, "Order stopped short of complete");
                order
            }
            Err(failure) => {
                payments.delete(intent_id).await?;
                return match failure {
                    CheckoutError::Gateway(gateway_error) => {
                        let message = directive::friendly_message(&gateway_error.to_string());
                        warn!(intent_id, %gateway_error, "Gateway failed during confirmation, payment removed");
                        Ok(Directive::render_errors(vec![message]))
                    }
                    other => Err(other),
                };
            }
        };

        let flash = Some(Flash::success(directive::PAYMENT_CREATED));
        if self.config.is_final_submit(params.commit.as_deref()) {
            Ok(Directive::redirect(self.config.routes.success_order(&order), flash))
        } else {
            Ok(Directive::Reload {
                location: self.config.routes.edit_order(&order),
                flash,
            })
        }
    }

    /// Everything that must happen together: channel tagging, state
    /// advancement, capture, reconciliation and the owning user backfill.
    async fn complete(
        &self,
        mut uow: UnitOfWork,
        user: &CurrentUser,
        mut order: Order,
        mut intent: PaymentIntent,
        specs: &[PaymentSpec],
        invoice: &str,
    ) -> Result<(Completion, Order)> {
        if order.state == OrderState::Cart {
            order.channel = Some(self.config.channel.clone());
        }
        let completion = drive_to_completion(&mut order);

        if order.is_completed() && intent.is_checkout() {
            let capture = self
                .gateway
                .do_express_checkout_payment(&capture_request(&order, &intent, invoice))
                .await?;
            intent.capture(capture.transaction_id);
        }

        let order_id = order.id;
        let intent_id = intent.id;
        uow.stage_order(order);
        uow.stage_payment(intent);

        if completion == Completion::Completed || self.config.reconcile_incomplete_orders {
            self.reconciler.add_payments(&mut uow, intent_id, specs).await?;
        } else {
            warn!(intent_id, "Skipping reconciliation of an incomplete order");
        }

        let mut order = uow
            .order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        if order.user_id.is_none() {
            order.user_id = Some(user.id);
            uow.stage_order(order.clone());
        }

        let jobs = uow.commit().await?;
        if let Err(dispatch_error) = self.reconciler.dispatch(jobs).await {
            error!(intent_id, %dispatch_error, "Could not hand reconciliation to the queue");
        }
        Ok((completion, order))
    }

    /// Outstanding balance of every order the payment is allocated to.
    async fn outstanding_balances(
        &self,
        user: &CurrentUser,
        order: &Order,
        specs: &[PaymentSpec],
    ) -> Result<BTreeMap<OrderId, Money>> {
        let mut outstanding = BTreeMap::new();
        for spec in specs {
            if outstanding.contains_key(&spec.order_id) {
                continue;
            }
            let balance = if spec.order_id == order.id {
                order.outstanding_balance()
            } else {
                find_order(&**self.ledger.orders(), user, spec.order_id)
                    .await?
                    .outstanding_balance()
            };
            outstanding.insert(spec.order_id, balance);
        }
        Ok(outstanding)
    }
}

fn capture_request(
    order: &Order,
    intent: &PaymentIntent,
    invoice: &str,
) -> DoExpressCheckoutPaymentRequest {
    DoExpressCheckoutPaymentRequest {
        token: intent.source.token().to_string(),
        payer_id: intent.source.payer_id().to_string(),
        invoice_id: invoice.to_string(),
        order_total: CurrencyAmount::new(&order.currency, intent.amount.value()),
        payment_action: PaymentAction::Sale,
    }
}
