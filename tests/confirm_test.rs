mod common;

use common::{Harness, confirm_params, order, user};
use express_checkout::application::directive::{self, Directive, Flash, FlashKind, View};
use express_checkout::config::{B2B_PORTAL_CHANNEL, CheckoutConfig, ReconcileMode};
use express_checkout::domain::gateway::PaymentAction;
use express_checkout::domain::money::Money;
use express_checkout::domain::order::OrderState;
use express_checkout::domain::payment::{ChildPaymentState, PaymentIntentState, PaymentSpec};
use express_checkout::domain::ports::PaymentStore;
use express_checkout::error::CheckoutError;
use express_checkout::infrastructure::sandbox::{CaptureOutcome, SandboxScript};
use rust_decimal_macros::dec;

fn immediate() -> CheckoutConfig {
    CheckoutConfig {
        reconciliation: ReconcileMode::Immediate,
        ..Default::default()
    }
}

fn failing_capture(outcome: CaptureOutcome) -> SandboxScript {
    SandboxScript {
        capture: outcome,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cart_order_completes_with_captured_payment() {
    let harness = Harness::new(vec![order(1, dec!(25.00))], SandboxScript::default(), immediate()).await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    assert_eq!(
        directive,
        Directive::redirect(
            "/orders/R100/success",
            Some(Flash::success(directive::PAYMENT_CREATED))
        )
    );

    let order = harness.order(1).await;
    assert_eq!(order.state, OrderState::Complete);
    assert_eq!(order.channel.as_deref(), Some(B2B_PORTAL_CHANNEL));
    assert_eq!(order.user_id, Some(3));
    assert!(order.is_paid());

    let intents = harness.payments.for_order(1).await.unwrap();
    assert_eq!(intents.len(), 1);
    let intent = &intents[0];
    assert_eq!(intent.amount, Money::new(dec!(25.00)));
    assert_eq!(intent.state, PaymentIntentState::Completed);
    assert_eq!(intent.transaction_id.as_deref(), Some("TXN-EC-123"));
    assert_eq!(intent.last_ip_address, Some("10.0.0.1".parse().unwrap()));
    assert_eq!(intent.child_payments[0].state, ChildPaymentState::Completed);

    let captures = harness.gateway.captures().await;
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].invoice_id, "R100-1");
    assert_eq!(captures[0].payer_id, "PAYER-1");
    assert_eq!(captures[0].order_total.value, dec!(25.00));
    assert_eq!(captures[0].payment_action, PaymentAction::Sale);
}

#[tokio::test]
async fn test_deferred_reconciliation_is_queued_after_commit() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00))],
        SandboxScript::default(),
        CheckoutConfig::default(),
    )
    .await;

    harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    let order = harness.order(1).await;
    assert_eq!(order.state, OrderState::Complete);
    assert!(order.final_payments_pending());
    assert_eq!(order.payment_total, Money::ZERO);

    let jobs = harness.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].specs,
        vec![PaymentSpec {
            order_id: 1,
            amount: Money::new(dec!(25.00)),
        }]
    );
}

#[tokio::test]
async fn test_non_final_commit_reloads_edit_view() {
    let mut at_payment = order(1, dec!(25.00));
    at_payment.state = OrderState::Payment;
    let harness = Harness::new(vec![at_payment], SandboxScript::default(), immediate()).await;

    let mut params = confirm_params(1, dec!(10.00));
    params.commit = Some("Save".to_string());
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();

    assert_eq!(
        directive,
        Directive::Reload {
            location: "/orders/R100/edit".to_string(),
            flash: Some(Flash::success(directive::PAYMENT_CREATED)),
        }
    );
    let order = harness.order(1).await;
    assert_eq!(order.state, OrderState::Complete);
    assert_eq!(order.channel, None);
    assert_eq!(order.payment_total, Money::new(dec!(10.00)));
}

#[tokio::test]
async fn test_pending_final_payment_blocks_confirmation() {
    let mut pending = order(1, dec!(25.00));
    pending.pending_payment_total = Money::new(dec!(25.00));
    let harness = Harness::new(vec![pending.clone()], SandboxScript::default(), immediate()).await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    assert_eq!(
        directive,
        Directive::render_errors(vec![directive::PAYMENTS_PENDING.to_string()])
    );
    assert_eq!(harness.order(1).await, pending);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
    assert!(harness.gateway.captures().await.is_empty());
}

#[tokio::test]
async fn test_paid_order_blocks_confirmation() {
    let mut paid = order(1, dec!(25.00));
    paid.payment_total = Money::new(dec!(25.00));
    let harness = Harness::new(vec![paid.clone()], SandboxScript::default(), immediate()).await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    assert_eq!(directive.errors(), &[directive::ALREADY_PAID.to_string()]);
    assert_eq!(harness.order(1).await, paid);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_payment_and_order_errors_are_combined() {
    let mut incomplete = order(1, dec!(25.00));
    incomplete.email = None;
    let harness = Harness::new(vec![incomplete.clone()], SandboxScript::default(), immediate()).await;

    let mut params = confirm_params(1, dec!(0));
    params.token = String::new();
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();

    assert!(matches!(directive, Directive::Render { view: View::New, .. }));
    assert_eq!(
        directive.errors(),
        &[
            "Amount must be greater than 0".to_string(),
            "Source token can't be blank".to_string(),
            "Email can't be blank".to_string(),
        ]
    );
    assert_eq!(harness.order(1).await, incomplete);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_over_payment_is_rejected() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00)), order(2, dec!(10.00))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let mut params = confirm_params(1, dec!(25.00));
    params.siblings = vec![PaymentSpec {
        order_id: 2,
        amount: Money::new(dec!(12.00)),
    }];
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();

    assert_eq!(
        directive.errors(),
        &[
            "Amount 12.00 for order 2 exceeds its outstanding balance of 10.00".to_string(),
            "Amount 37.00 exceeds the outstanding balance of 35.00".to_string(),
        ]
    );
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_one_order_cannot_use_another_orders_balance() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00)), order(2, dec!(40.00))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let mut params = confirm_params(1, dec!(30.00));
    params.siblings = vec![PaymentSpec {
        order_id: 2,
        amount: Money::new(dec!(5.00)),
    }];
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();

    assert_eq!(
        directive.errors(),
        &["Amount 30.00 for order 1 exceeds its outstanding balance of 25.00".to_string()]
    );
    assert_eq!(harness.order(1).await.payment_total, Money::ZERO);
    assert_eq!(harness.order(2).await.payment_total, Money::ZERO);
    assert!(harness.gateway.captures().await.is_empty());
}

#[tokio::test]
async fn test_negative_sibling_is_rejected() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00)), order(2, dec!(40.00))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let mut params = confirm_params(1, dec!(30.00));
    params.siblings = vec![PaymentSpec {
        order_id: 2,
        amount: Money::new(dec!(-5.00)),
    }];
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();

    assert_eq!(
        directive.errors(),
        &[
            "Amount for order 2 must be greater than 0".to_string(),
            "Amount 30.00 for order 1 exceeds its outstanding balance of 25.00".to_string(),
        ]
    );
    assert_eq!(harness.order(2).await.payment_total, Money::ZERO);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_allocations_are_rejected() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00)), order(2, dec!(25.00))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let mut params = confirm_params(1, dec!(5.00));
    params.siblings = vec![
        PaymentSpec {
            order_id: 2,
            amount: Money::new(dec!(5.00)),
        },
        PaymentSpec {
            order_id: 2,
            amount: Money::new(dec!(5.00)),
        },
    ];
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();
    assert_eq!(
        directive.errors(),
        &["Order 2 is allocated more than once".to_string()]
    );

    let mut params = confirm_params(1, dec!(5.00));
    params.siblings = vec![PaymentSpec {
        order_id: 1,
        amount: Money::new(dec!(5.00)),
    }];
    let directive = harness.confirmation.confirm(&user(), params).await.unwrap();
    assert_eq!(
        directive.errors(),
        &["Order 1 is allocated more than once".to_string()]
    );

    assert_eq!(harness.order(2).await.payment_total, Money::ZERO);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_capture_failure_rolls_back_everything() {
    let original = order(1, dec!(25.00));
    let harness = Harness::new(
        vec![original.clone()],
        failing_capture(CaptureOutcome::Fail("Your card number is incorrect.".to_string())),
        CheckoutConfig::default(),
    )
    .await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    assert_eq!(
        directive,
        Directive::render_errors(vec!["Card number is invalid".to_string()])
    );
    assert_eq!(harness.order(1).await, original);
    assert!(harness.payments.get(1).await.unwrap().is_none());
    assert!(harness.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_capture_surfaces_message() {
    let harness = Harness::new(
        vec![order(1, dec!(25.00))],
        failing_capture(CaptureOutcome::Unreachable),
        immediate(),
    )
    .await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    let flash = directive.flash().unwrap();
    assert_eq!(flash.kind, FlashKind::Errors);
    assert_eq!(flash.messages, vec!["connection failed: sandbox is offline".to_string()]);
    assert_eq!(harness.order(1).await.state, OrderState::Cart);
    assert!(harness.payments.for_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_halted_order_is_reconciled_by_default() {
    let mut awaiting = order(1, dec!(25.00));
    awaiting.requires_approval = true;
    let harness = Harness::new(vec![awaiting], SandboxScript::default(), immediate()).await;

    let directive = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();
    assert_eq!(directive.flash(), Some(&Flash::success(directive::PAYMENT_CREATED)));

    let order = harness.order(1).await;
    assert_eq!(order.state, OrderState::Confirm);
    assert!(order.is_paid());
    assert!(harness.gateway.captures().await.is_empty());

    let intent = harness.payments.get(1).await.unwrap().unwrap();
    assert!(intent.transaction_id.is_none());
    assert_eq!(intent.child_payments.len(), 1);
}

#[tokio::test]
async fn test_halted_order_skips_reconciliation_when_disabled() {
    let mut awaiting = order(1, dec!(25.00));
    awaiting.requires_approval = true;
    let config = CheckoutConfig {
        reconcile_incomplete_orders: false,
        ..immediate()
    };
    let harness = Harness::new(vec![awaiting], SandboxScript::default(), config).await;

    harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await
        .unwrap();

    let order = harness.order(1).await;
    assert_eq!(order.state, OrderState::Confirm);
    assert_eq!(order.payment_total, Money::ZERO);

    let intent = harness.payments.get(1).await.unwrap().unwrap();
    assert!(intent.is_checkout());
    assert!(intent.child_payments.is_empty());
}

#[tokio::test]
async fn test_sibling_allocations_are_applied() {
    let harness = Harness::new(
        vec![order(1, dec!(2.25)), order(2, dec!(10.00)), order(3, dec!(5.50))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let mut params = confirm_params(1, dec!(2.25));
    params.siblings = vec![
        PaymentSpec {
            order_id: 2,
            amount: Money::new(dec!(10.00)),
        },
        PaymentSpec {
            order_id: 3,
            amount: Money::new(dec!(5.50)),
        },
    ];
    harness.confirmation.confirm(&user(), params).await.unwrap();

    let intent = harness.payments.get(1).await.unwrap().unwrap();
    assert_eq!(intent.orders_amount_sum, Money::new(dec!(17.75)));
    assert_eq!(intent.child_payments.len(), 3);
    for id in 1..=3 {
        assert!(harness.order(id).await.is_paid());
    }
    assert_eq!(harness.order(2).await.state, OrderState::Cart);
}

#[tokio::test]
async fn test_foreign_order_and_unknown_method_are_errors() {
    let mut foreign = order(1, dec!(25.00));
    foreign.company_id = 99;
    let harness = Harness::new(
        vec![foreign, order(2, dec!(25.00))],
        SandboxScript::default(),
        immediate(),
    )
    .await;

    let result = harness
        .confirmation
        .confirm(&user(), confirm_params(1, dec!(25.00)))
        .await;
    assert!(matches!(result, Err(CheckoutError::OrderNotFound(1))));

    let mut params = confirm_params(2, dec!(25.00));
    params.payment_method_id = 42;
    let result = harness.confirmation.confirm(&user(), params).await;
    assert!(matches!(result, Err(CheckoutError::PaymentMethodNotFound(42))));
    assert!(harness.payments.for_order(2).await.unwrap().is_empty());
}
