use crate::domain::gateway::{
    Ack, CaptureResponse, DoExpressCheckoutPaymentRequest, ErrorDetail, GatewayError,
    SetExpressCheckoutRequest, SetExpressCheckoutResponse, UserAction,
};
use crate::domain::ports::GatewayClient;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// How the sandbox answers `SetExpressCheckout`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutOutcome {
    #[default]
    Approve,
    /// Answers with a failure ack carrying these long messages.
    Refuse(Vec<String>),
    /// Rejects the call outright.
    Decline(Vec<String>),
    Unreachable,
}

/// How the sandbox answers `DoExpressCheckoutPayment`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    #[default]
    Settle,
    Fail(String),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxScript {
    pub checkout: CheckoutOutcome,
    pub capture: CaptureOutcome,
}

/// A gateway that never leaves the process.
///
/// Answers follow a [`SandboxScript`] and every request is kept for
/// inspection.
pub struct SandboxGateway {
    approval_base: Url,
    script: SandboxScript,
    sequence: AtomicU64,
    checkouts: Mutex<Vec<SetExpressCheckoutRequest>>,
    captures: Mutex<Vec<DoExpressCheckoutPaymentRequest>>,
}

impl SandboxGateway {
    pub fn new(approval_base: &str, script: SandboxScript) -> Result<Self> {
        Ok(Self {
            approval_base: Url::parse(approval_base)?,
            script,
            sequence: AtomicU64::new(1),
            checkouts: Mutex::new(Vec::new()),
            captures: Mutex::new(Vec::new()),
        })
    }

    pub async fn checkouts(&self) -> Vec<SetExpressCheckoutRequest> {
        self.checkouts.lock().await.clone()
    }

    pub async fn captures(&self) -> Vec<DoExpressCheckoutPaymentRequest> {
        self.captures.lock().await.clone()
    }

    fn next_token(&self) -> String {
        format!("EC-{:017X}", self.sequence.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl GatewayClient for SandboxGateway {
    async fn set_express_checkout(
        &self,
        request: &SetExpressCheckoutRequest,
    ) -> std::result::Result<SetExpressCheckoutResponse, GatewayError> {
        self.checkouts.lock().await.push(request.clone());
        debug!(invoice = %request.details.invoice_id, "Sandbox SetExpressCheckout");

        match &self.script.checkout {
            CheckoutOutcome::Approve => Ok(SetExpressCheckoutResponse {
                ack: Ack::Success,
                token: Some(self.next_token()),
                errors: Vec::new(),
            }),
            CheckoutOutcome::Refuse(messages) => Ok(SetExpressCheckoutResponse {
                ack: Ack::Failure,
                token: None,
                errors: messages
                    .iter()
                    .map(|message| ErrorDetail {
                        error_code: "10001".to_string(),
                        short_message: "Refused".to_string(),
                        long_message: message.clone(),
                    })
                    .collect(),
            }),
            CheckoutOutcome::Decline(reasons) => Err(GatewayError::Declined(reasons.clone())),
            CheckoutOutcome::Unreachable => {
                Err(GatewayError::Transport("sandbox is offline".to_string()))
            }
        }
    }

    fn approval_url(
        &self,
        response: &SetExpressCheckoutResponse,
        action: UserAction,
    ) -> Result<Url> {
        let token = response.token.as_deref().ok_or_else(|| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(
                "Checkout response carries no token",
            )))
        })?;

        let mut url = self.approval_base.clone();
        url.query_pairs_mut()
            .append_pair("cmd", "_express-checkout")
            .append_pair("token", token)
            .append_pair("useraction", action.as_str());
        Ok(url)
    }

    async fn do_express_checkout_payment(
        &self,
        request: &DoExpressCheckoutPaymentRequest,
    ) -> std::result::Result<CaptureResponse, GatewayError> {
        self.captures.lock().await.push(request.clone());
        debug!(invoice = %request.invoice_id, "Sandbox DoExpressCheckoutPayment");

        match &self.script.capture {
            CaptureOutcome::Settle => Ok(CaptureResponse {
                transaction_id: format!("TXN-{}", request.token),
            }),
            CaptureOutcome::Fail(message) => Err(GatewayError::Processing(message.clone())),
            CaptureOutcome::Unreachable => {
                Err(GatewayError::Transport("sandbox is offline".to_string()))
            }
        }
    }
}
