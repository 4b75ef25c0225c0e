//! Maps an order onto the gateway's `SetExpressCheckout` request.

use crate::config::Routes;
use crate::domain::gateway::{
    CurrencyAmount, ItemCategory, PaymentAction, PaymentDetails, PaymentDetailsItem,
    SetExpressCheckoutRequest, SetExpressCheckoutRequestDetails, ShipToAddress,
};
use crate::domain::money::Money;
use crate::domain::order::{AdjustmentKind, Order};
use crate::domain::payment_method::PaymentMethod;
use crate::error::Result;
use rust_decimal::Decimal;

/// Per-request inputs that do not come from the order itself.
#[derive(Debug, Clone)]
pub struct CheckoutParams<'a> {
    pub amount: Money,
    /// 1-based count of checkout attempts for the order.
    pub attempt: usize,
    pub commit: Option<&'a str>,
    pub payment_method: &'a PaymentMethod,
    pub routes: &'a Routes,
    pub shipping_method: &'a str,
}

/// The invoice the gateway files both the session and its capture under.
pub fn invoice_id(order: &Order, attempt: usize) -> String {
    format!("{}-{}", order.number, attempt)
}

pub fn build_set_express_checkout(
    order: &Order,
    params: &CheckoutParams<'_>,
) -> Result<SetExpressCheckoutRequest> {
    let method = params.payment_method;
    let return_url =
        params
            .routes
            .confirm_url(order.id, method.id, params.amount, params.commit)?;
    let cancel_url = params.routes.cancel_url(order.id)?;

    Ok(SetExpressCheckoutRequest {
        details: SetExpressCheckoutRequestDetails {
            invoice_id: invoice_id(order, params.attempt),
            buyer_email: order.email.clone(),
            return_url: return_url.to_string(),
            cancel_url: cancel_url.to_string(),
            solution_type: method.solution().to_string(),
            landing_page: method.landing_page().to_string(),
            header_image: method.logo_url().to_string(),
            no_shipping: 1,
            payment_details: vec![payment_details(order, params)],
        },
    })
}

/// Line items plus the additional adjustments that are neither tax nor
/// shipping, without zero amounts: the gateway rejects zero-value items.
pub fn checkout_items(order: &Order) -> Vec<PaymentDetailsItem> {
    let line_items = order.line_items.iter().map(|item| PaymentDetailsItem {
        name: item.product_name.clone(),
        number: Some(item.sku.clone()),
        quantity: item.quantity,
        amount: CurrencyAmount::new(&order.currency, item.price.value()),
        item_category: Some(ItemCategory::Physical),
    });

    let adjustments = order
        .eligible_additional_adjustments()
        .filter(|adjustment| {
            !matches!(
                adjustment.kind,
                AdjustmentKind::Tax | AdjustmentKind::Shipping
            )
        })
        .map(|adjustment| PaymentDetailsItem {
            name: adjustment.label.clone(),
            number: None,
            quantity: 1,
            amount: CurrencyAmount::new(&order.currency, adjustment.amount),
            item_category: None,
        });

    line_items
        .chain(adjustments)
        .filter(|item| !item.amount.value.is_zero())
        .collect()
}

/// What the items should cost: the order total without shipping and
/// additional tax.
pub fn item_sum(order: &Order) -> Money {
    let shipment_sum = Money::ZERO;
    order.total - shipment_sum - order.additional_tax_total
}

pub fn payment_details(order: &Order, params: &CheckoutParams<'_>) -> PaymentDetails {
    let amount = |value: Decimal| CurrencyAmount::new(&order.currency, value);
    let order_total = amount(params.amount.value());

    // A zero item total is refused outright; the buyer then only sees the
    // order total with a generic description.
    if item_sum(order).is_zero() {
        return PaymentDetails::order_total_only(order_total);
    }

    PaymentDetails {
        order_total,
        item_total: Some(amount(params.amount.value())),
        shipping_total: Some(amount(Decimal::ZERO)),
        tax_total: Some(amount(Decimal::ZERO)),
        items: checkout_items(order),
        ship_to_address: address_options(order, params.payment_method),
        shipping_method: Some(params.shipping_method.to_string()),
        payment_action: Some(PaymentAction::Sale),
    }
}

pub fn address_options(order: &Order, method: &PaymentMethod) -> Option<ShipToAddress> {
    if !method.address_required() {
        return None;
    }
    let address = order.bill_address.as_ref()?;
    Some(ShipToAddress {
        name: address.full_name(),
        street1: address.address1.clone(),
        street2: address.address2.clone(),
        city_name: address.city.clone(),
        phone: address.phone.clone(),
        state_or_province: address.state_name.clone(),
        country: address.country_iso.clone(),
        postal_code: address.zipcode.clone(),
    })
}
