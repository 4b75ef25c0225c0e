use crate::application::confirmation::{ConfirmParams, ConfirmationHandler};
use crate::application::directive::{Directive, Flash, View};
use crate::application::initiator::{CheckoutInitiator, InitiateParams};
use crate::domain::order::OrderId;
use crate::domain::user::CurrentUser;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the client asked the response to be rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Html,
    Js,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// An HTTP redirect to `location`.
    Redirect {
        location: String,
        flash: Option<Flash>,
    },
    /// A script for the browser to evaluate.
    Script { body: String, flash: Option<Flash> },
    /// The view rendered again, carrying its errors.
    Page { view: View, errors: Vec<String> },
}

impl Response {
    /// Renders `directive` for a client expecting `format`.
    pub fn render(directive: Directive, format: Format) -> Self {
        match (directive, format) {
            (Directive::Redirect { location, flash }, Format::Html)
            | (Directive::Reload { location, flash }, Format::Html) => {
                Response::Redirect { location, flash }
            }
            (Directive::Redirect { location, flash }, Format::Js) => Response::Script {
                body: format!("window.location = {};", quote(&location)),
                flash,
            },
            (Directive::Reload { flash, .. }, Format::Js) => Response::Script {
                body: "window.location.reload();".to_string(),
                flash,
            },
            (Directive::Render { view, flash }, _) => Response::Page {
                view,
                errors: flash.messages,
            },
        }
    }
}

/// JSON string quoting keeps the location safe inside a script.
fn quote(location: &str) -> String {
    serde_json::Value::String(location.to_string()).to_string()
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Redirect { location, flash } => {
                write!(f, "302 Location: {}", location)?;
                write_flash(f, flash.as_ref())
            }
            Response::Script { body, flash } => {
                write!(f, "200 text/javascript: {}", body)?;
                write_flash(f, flash.as_ref())
            }
            Response::Page { view, errors } => {
                write!(f, "200 render {:?}", view)?;
                if !errors.is_empty() {
                    write!(f, " errors: {}", errors.join("; "))?;
                }
                Ok(())
            }
        }
    }
}

fn write_flash(f: &mut fmt::Formatter<'_>, flash: Option<&Flash>) -> fmt::Result {
    match flash {
        Some(flash) => write!(f, " [{:?}: {}]", flash.kind, flash.messages.join("; ")),
        None => Ok(()),
    }
}

/// The express checkout endpoints.
pub struct ExpressCheckoutController {
    initiator: CheckoutInitiator,
    confirmation: ConfirmationHandler,
}

impl ExpressCheckoutController {
    pub fn new(initiator: CheckoutInitiator, confirmation: ConfirmationHandler) -> Self {
        Self {
            initiator,
            confirmation,
        }
    }

    pub async fn express(
        &self,
        user: &CurrentUser,
        params: InitiateParams,
        format: Format,
    ) -> Result<Response> {
        let directive = self.initiator.initiate(user, params).await?;
        Ok(Response::render(directive, format))
    }

    pub async fn confirm(
        &self,
        user: &CurrentUser,
        params: ConfirmParams,
        format: Format,
    ) -> Result<Response> {
        let directive = self.confirmation.confirm(user, params).await?;
        Ok(Response::render(directive, format))
    }

    pub async fn cancel(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        token: Option<&str>,
        format: Format,
    ) -> Result<Response> {
        let directive = self.initiator.cancel(user, order_id, token).await?;
        Ok(Response::render(directive, format))
    }
}
