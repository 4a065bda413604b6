use super::classifier::{Classification, classify_payment, classify_three_ds};
use super::publisher::{CancelToken, StatePublisher};
use super::request_builder::TransactionRequestBuilder;
use crate::domain::api::ThreeDsRequest;
use crate::domain::payment::{PaymentParameters, PaymentScheme};
use crate::domain::ports::SharedGatewayClient;
use crate::domain::state::{Event, Failure, OrchestratorState, Phase};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives a direct card payment: Charge/Auth, an optional 3-D Secure
/// challenge, then the challenge result.
///
/// Gateway failures end up in the published state, never in the returned
/// `Result`; `Err` is reserved for calls the current phase does not allow.
/// There is no automatic retry: after a terminal phase the host builds a new
/// orchestrator.
pub struct CardPaymentOrchestrator {
    gateway: SharedGatewayClient,
    params: Arc<PaymentParameters>,
    scheme: PaymentScheme,
    cryptogram: String,
    save_card: Option<bool>,
    publisher: StatePublisher,
    in_flight: bool,
}

impl CardPaymentOrchestrator {
    /// A fresh orchestrator in `Submitting`.
    pub fn new(
        gateway: SharedGatewayClient,
        params: Arc<PaymentParameters>,
        scheme: PaymentScheme,
        cryptogram: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            params,
            scheme,
            cryptogram: cryptogram.into(),
            save_card: None,
            publisher: StatePublisher::new(OrchestratorState::new(Phase::Submitting)),
            in_flight: false,
        }
    }

    pub fn with_save_card(mut self, save_card: Option<bool>) -> Self {
        self.save_card = save_card;
        self
    }

    /// The current snapshot.
    pub fn state(&self) -> &OrchestratorState {
        self.publisher.state()
    }

    /// Receives every snapshot published from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OrchestratorState> {
        self.publisher.subscribe()
    }

    /// Cancelling this token drops the outstanding gateway call.
    pub fn cancel_token(&self) -> CancelToken {
        self.publisher.cancel_token()
    }

    /// Cancels the outstanding gateway call, if any, and stops publishing.
    pub fn dispose(&mut self) {
        info!("Disposing card payment orchestrator");
        self.publisher.dispose();
    }

    fn check_ready(&self, action: &'static str, expected: Phase) -> Result<()> {
        if self.in_flight {
            warn!(action, "Gateway request already in flight, ignoring call");
            return Err(PaymentError::RequestInFlight);
        }
        let phase = self.publisher.state().phase;
        if phase != expected || self.publisher.is_disposed() {
            warn!(action, %phase, "Call not allowed in current phase");
            return Err(PaymentError::InvalidStateTransition {
                action,
                phase: phase.to_string(),
            });
        }
        Ok(())
    }

    /// Sends the payment with Charge or Auth depending on the scheme.
    pub async fn submit(&mut self) -> Result<()> {
        self.check_ready("submit", Phase::Submitting)?;
        if self.publisher.state().transaction.is_assigned() {
            // Back in Submitting after a challenge: only complete_challenge
            // may send from here.
            warn!("Card payment already submitted");
            return Err(PaymentError::InvalidStateTransition {
                action: "submit",
                phase: Phase::Submitting.to_string(),
            });
        }

        let body = TransactionRequestBuilder::new(&self.params, self.scheme)
            .save_card(self.save_card)
            .card_payment(&self.cryptogram);
        info!(
            scheme = %self.scheme,
            amount = %body.amount,
            currency = %body.currency,
            "Submitting card payment"
        );

        let gateway = Arc::clone(&self.gateway);
        let scheme = self.scheme;
        let call = async move {
            match scheme {
                PaymentScheme::Charge => gateway.charge(&body).await,
                PaymentScheme::Auth => gateway.auth(&body).await,
            }
        };

        self.in_flight = true;
        let Some(outcome) = self.publisher.cancel_token().run(call).await else {
            debug!("Card payment cancelled while in flight");
            return Ok(());
        };
        self.in_flight = false;

        let classification = classify_payment(outcome);
        info!(?classification, "Card payment answered");
        self.publisher.apply(settle(classification, self.scheme));
        Ok(())
    }

    /// Posts the result of the 3-D Secure challenge the host drove.
    pub async fn complete_challenge(
        &mut self,
        challenge_token: &str,
        challenge_response: &str,
    ) -> Result<()> {
        self.check_ready("complete a challenge", Phase::AwaitingChallenge)?;
        let callback_id = self
            .publisher
            .state()
            .challenge
            .as_ref()
            .map(|challenge| challenge.callback_id.clone())
            .unwrap_or_default();

        let body = ThreeDsRequest {
            transaction_id: challenge_token.to_string(),
            pa_res: challenge_response.to_string(),
            three_ds_callback_id: callback_id,
        };
        self.publisher.apply(Event::ChallengeSubmitted);
        info!(transaction_id = self.state().transaction_id(), "Posting 3-D Secure result");

        let gateway = Arc::clone(&self.gateway);
        let call = async move { gateway.post_three_ds(&body).await };

        self.in_flight = true;
        let Some(outcome) = self.publisher.cancel_token().run(call).await else {
            debug!("Challenge result cancelled while in flight");
            return Ok(());
        };
        self.in_flight = false;

        let classification = classify_three_ds(outcome);
        info!(?classification, "3-D Secure result answered");
        self.publisher.apply(settle(classification, self.scheme));
        Ok(())
    }
}

/// Card replies carry no status, so the outcome sets it: Completed or
/// Authorized by scheme on success, Declined on a decline.
fn settle(classification: Classification, scheme: PaymentScheme) -> Event {
    match classification {
        Classification::Success(tx) => {
            let status = match scheme {
                PaymentScheme::Charge => TransactionStatus::Completed,
                PaymentScheme::Auth => TransactionStatus::Authorized,
            };
            Event::Succeeded(Some(Transaction {
                status,
                ..tx.unwrap_or_default()
            }))
        }
        Classification::Declined {
            reason_code,
            transaction,
        } => Event::Failed(
            Failure::declined(Some(reason_code)),
            Some(Transaction {
                status: TransactionStatus::Declined,
                ..transaction.unwrap_or_default()
            }),
        ),
        other => other.into_event(),
    }
}
