use super::classifier::{Classification, classify_qr_link};
use super::poller::{PollOutcome, PollPolicy, StatusPoller};
use super::publisher::{CancelToken, StatePublisher};
use super::request_builder::{RedirectUrls, TransactionRequestBuilder};
use crate::domain::payment::{PaymentParameters, PaymentScheme, QrMethod};
use crate::domain::ports::SharedGatewayClient;
use crate::domain::state::{Event, OrchestratorState, Phase};
use crate::domain::transaction::{QrDetails, Transaction, TransactionId};
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives a QR-redirect payment: fetch a link, let the host hand it to a
/// banking app, then long-poll the transaction status.
pub struct QrPaymentOrchestrator {
    gateway: SharedGatewayClient,
    params: Arc<PaymentParameters>,
    method: QrMethod,
    scheme: PaymentScheme,
    redirects: RedirectUrls,
    policy: PollPolicy,
    publisher: StatePublisher,
    in_flight: bool,
}

impl QrPaymentOrchestrator {
    /// A fresh orchestrator in `RequestingLink`, with no redirects and the
    /// default poll policy.
    pub fn new(
        gateway: SharedGatewayClient,
        params: Arc<PaymentParameters>,
        method: QrMethod,
        scheme: PaymentScheme,
    ) -> Self {
        Self {
            gateway,
            params,
            method,
            scheme,
            redirects: RedirectUrls::default(),
            policy: PollPolicy::default(),
            publisher: StatePublisher::new(OrchestratorState::new(Phase::RequestingLink)),
            in_flight: false,
        }
    }

    pub fn with_redirects(mut self, redirects: RedirectUrls) -> Self {
        self.redirects = redirects;
        self
    }

    /// Bounds on the status polling loop.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resumes from a link obtained earlier; the orchestrator starts in
    /// `AwaitingAction` with that transaction.
    pub fn with_link(
        mut self,
        transaction_id: TransactionId,
        redirect_url: impl Into<String>,
    ) -> Self {
        let qr = QrDetails {
            redirect_url: redirect_url.into(),
            ..QrDetails::default()
        };
        let mut state = OrchestratorState::new(Phase::AwaitingAction);
        state.transaction = Transaction {
            qr: Some(qr.clone()),
            ..Transaction::with_id(transaction_id)
        };
        state.qr = Some(qr);
        self.publisher = StatePublisher::new(state);
        self
    }

    pub fn method(&self) -> QrMethod {
        self.method
    }

    /// The current snapshot.
    pub fn state(&self) -> &OrchestratorState {
        self.publisher.state()
    }

    /// The deep link to hand to the banking app, once a link was issued.
    pub fn redirect_url(&self) -> Option<&str> {
        self.publisher
            .state()
            .qr
            .as_ref()
            .map(|qr| qr.redirect_url.as_str())
    }

    /// Receives every snapshot published from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OrchestratorState> {
        self.publisher.subscribe()
    }

    /// Cancelling this token stops an outstanding link request or poll.
    pub fn cancel_token(&self) -> CancelToken {
        self.publisher.cancel_token()
    }

    /// Cancels outstanding work and stops publishing.
    pub fn dispose(&mut self) {
        info!(method = %self.method, "Disposing QR payment orchestrator");
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

    /// Asks the gateway for a QR link using the method this orchestrator was
    /// built for. Gateway failures land in the published state.
    pub async fn request_link(&mut self, save_card: Option<bool>) -> Result<()> {
        self.check_ready("request a QR link", Phase::RequestingLink)?;

        let body = TransactionRequestBuilder::new(&self.params, self.scheme)
            .save_card(save_card)
            .qr_link(self.method, &self.redirects);
        info!(method = %self.method, scheme = %self.scheme, "Requesting QR link");

        let gateway = Arc::clone(&self.gateway);
        let method = self.method;
        let call = async move {
            match method {
                QrMethod::BankAppQr => gateway.get_bank_app_qr_link(&body).await,
                QrMethod::NoLoginQr => gateway.get_no_login_qr_link(&body).await,
            }
        };

        self.in_flight = true;
        let Some(outcome) = self.publisher.cancel_token().run(call).await else {
            debug!("QR link request cancelled while in flight");
            return Ok(());
        };
        self.in_flight = false;

        let event = match classify_qr_link(outcome) {
            Classification::Success(Some(tx)) => Event::LinkIssued(tx),
            other => {
                info!(classification = ?other, "QR link not issued");
                other.into_event()
            }
        };
        self.publisher.apply(event);
        Ok(())
    }

    /// Long-polls the transaction until a terminal status. The host opens the
    /// redirect URL before calling this.
    pub async fn begin_polling(&mut self, transaction_id: TransactionId) -> Result<()> {
        self.check_ready("begin polling", Phase::AwaitingAction)?;
        let expected = self.publisher.state().transaction_id();
        if expected != 0 && expected != transaction_id {
            warn!(
                expected,
                actual = transaction_id,
                "Polling requested for a different transaction"
            );
            return Err(PaymentError::TransactionIdMismatch {
                expected,
                actual: transaction_id,
            });
        }

        self.publisher.apply(Event::PollingStarted(transaction_id));
        info!(transaction_id, "Polling transaction status");

        let poller = StatusPoller::new(
            Arc::clone(&self.gateway),
            self.policy,
            self.publisher.cancel_token(),
        );
        let publisher = &mut self.publisher;
        self.in_flight = true;
        let outcome = poller
            .poll(transaction_id, |tx| {
                publisher.apply(Event::PollPending(tx));
            })
            .await;
        self.in_flight = false;

        match outcome {
            PollOutcome::Succeeded(tx) => {
                info!(transaction_id, status = %tx.status, "QR payment finished");
                self.publisher.apply(Event::Succeeded(Some(tx)));
            }
            PollOutcome::Failed(failure, tx) => {
                info!(transaction_id, kind = ?failure.kind, "QR payment failed");
                self.publisher.apply(Event::Failed(failure, tx));
            }
            PollOutcome::Cancelled => {
                debug!(transaction_id, "Polling stopped by cancellation");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api::{QrLinkModel, QrLinkResponse};
    use crate::domain::payment::Amount;
    use crate::domain::state::FailureKind;
    use crate::error::TransportError;
    use crate::infrastructure::scripted::{RecordedRequest, ScriptedGateway};

    fn params() -> Arc<PaymentParameters> {
        Arc::new(PaymentParameters::new("250.00".parse::<Amount>().unwrap(), "RUB"))
    }

    fn link_reply(id: i64, url: &str) -> QrLinkResponse {
        QrLinkResponse {
            success: Some(true),
            message: None,
            transaction: Some(QrLinkModel {
                transaction_id: Some(id),
                qr_url: Some(url.to_string()),
                ..QrLinkModel::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_bank_app_link_uses_bank_app_operation_with_redirects() {
        let gateway =
            ScriptedGateway::new().with_bank_app_qr_link(Ok(link_reply(9, "bank://pay")));
        let mut qr = QrPaymentOrchestrator::new(
            Arc::new(gateway.clone()),
            params(),
            QrMethod::BankAppQr,
            PaymentScheme::Charge,
        )
        .with_redirects(RedirectUrls {
            success: "https://shop/ok".into(),
            fail: "https://shop/fail".into(),
        });

        qr.request_link(Some(true)).await.unwrap();

        assert_eq!(qr.state().phase, Phase::AwaitingAction);
        assert_eq!(qr.state().transaction_id(), 9);
        assert_eq!(qr.redirect_url(), Some("bank://pay"));
        match gateway.requests().as_slice() {
            [RecordedRequest::BankAppQrLink(body)] => {
                assert_eq!(body.success_redirect_url.as_deref(), Some("https://shop/ok"));
                assert_eq!(body.save_card, Some(true));
            }
            other => panic!("unexpected requests: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_link_failure_is_terminal() {
        let gateway =
            ScriptedGateway::new().with_no_login_qr_link(Err(TransportError::NoResponse));
        let mut qr = QrPaymentOrchestrator::new(
            Arc::new(gateway),
            params(),
            QrMethod::NoLoginQr,
            PaymentScheme::Charge,
        );

        qr.request_link(None).await.unwrap();

        assert_eq!(qr.state().phase, Phase::Failed);
        assert_eq!(
            qr.state().error.as_ref().unwrap().kind,
            FailureKind::ConnectionError
        );
        assert!(qr.begin_polling(1).await.is_err());
    }

    #[tokio::test]
    async fn test_begin_polling_rejects_other_transaction() {
        let gateway = ScriptedGateway::new();
        let mut qr = QrPaymentOrchestrator::new(
            Arc::new(gateway.clone()),
            params(),
            QrMethod::NoLoginQr,
            PaymentScheme::Charge,
        )
        .with_link(456, "https://qr.example/pay");

        let result = qr.begin_polling(457).await;
        assert!(matches!(
            result,
            Err(PaymentError::TransactionIdMismatch {
                expected: 456,
                actual: 457
            })
        ));
        assert_eq!(qr.state().phase, Phase::AwaitingAction);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_begin_polling_before_link_is_rejected() {
        let gateway = ScriptedGateway::new();
        let mut qr = QrPaymentOrchestrator::new(
            Arc::new(gateway),
            params(),
            QrMethod::BankAppQr,
            PaymentScheme::Auth,
        );
        assert!(matches!(
            qr.begin_polling(1).await,
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }
}
