//! Where a request sends the buyer next, and what it tells them.

pub const CONNECTION_FAILED: &str = "Could not connect to PayPal.";
pub const CANCELLED: &str = "Don't want to use PayPal? No problems.";
pub const PAYMENTS_PENDING: &str = "Payments are already pending for this order.";
pub const ALREADY_PAID: &str = "This order is already paid.";
pub const PAYMENT_CREATED: &str = "Payment created";

const CARD_NUMBER_INCORRECT: &str = "Your card number is incorrect.";
const CARD_NUMBER_INVALID: &str = "Card number is invalid";

pub fn generic_error(reasons: &[&str]) -> String {
    format!("PayPal failed. {}", reasons.join(" "))
}

/// Replaces known gateway wording with the storefront's own.
pub fn friendly_message(message: &str) -> String {
    if message == CARD_NUMBER_INCORRECT {
        CARD_NUMBER_INVALID.to_string()
    } else {
        message.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Notice,
    Errors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub messages: Vec<String>,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            messages: vec![message.into()],
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Notice,
            messages: vec![message.into()],
        }
    }

    pub fn errors(messages: Vec<String>) -> Self {
        Self {
            kind: FlashKind::Errors,
            messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The payment form.
    New,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Navigate to `location`; the flash survives into the next request.
    Redirect {
        location: String,
        flash: Option<Flash>,
    },
    /// Reload the current page in place. Clients that cannot reload are
    /// sent to `location` instead.
    Reload {
        location: String,
        flash: Option<Flash>,
    },
    /// Render `view` again with the flash shown immediately.
    Render { view: View, flash: Flash },
}

impl Directive {
    pub fn redirect(location: impl Into<String>, flash: Option<Flash>) -> Self {
        Directive::Redirect {
            location: location.into(),
            flash,
        }
    }

    pub fn render_errors(messages: Vec<String>) -> Self {
        Directive::Render {
            view: View::New,
            flash: Flash::errors(messages),
        }
    }

    pub fn flash(&self) -> Option<&Flash> {
        match self {
            Directive::Redirect { flash, .. } | Directive::Reload { flash, .. } => flash.as_ref(),
            Directive::Render { flash, .. } => Some(flash),
        }
    }

    /// Error messages surfaced to the buyer, if any.
    pub fn errors(&self) -> &[String] {
        match self.flash() {
            Some(flash) if flash.kind == FlashKind::Errors => &flash.messages,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_message_maps_card_error() {
        assert_eq!(
            friendly_message("Your card number is incorrect."),
            "Card number is invalid"
        );
        assert_eq!(friendly_message("Insufficient funds."), "Insufficient funds.");
    }

    #[test]
    fn test_generic_error_joins_reasons() {
        assert_eq!(
            generic_error(&["Bad total.", "Bad currency."]),
            "PayPal failed. Bad total. Bad currency."
        );
    }

    #[test]
    fn test_errors_only_reported_for_error_flash() {
        let render = Directive::render_errors(vec!["nope".to_string()]);
        assert_eq!(render.errors(), &["nope".to_string()]);

        let redirect = Directive::redirect("/orders/R1/edit", Some(Flash::notice("hi")));
        assert!(redirect.errors().is_empty());
    }
}
