use super::publisher::CancelToken;
use crate::domain::api::{QrStatusRequest, QrStatusResponse};
use crate::domain::ports::SharedGatewayClient;
use crate::domain::state::Failure;
use crate::domain::transaction::{Transaction, TransactionId, TransactionStatus};
use crate::error::TransportResult;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Upper bounds on one polling run.
///
/// The gateway paces the loop by holding each status request open, so the
/// poller never sleeps between queries; these bounds only stop a gateway that
/// keeps answering immediately with a non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub max_attempts: Option<u32>,
    pub max_duration_secs: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(600),
            max_duration_secs: Some(1800),
        }
    }
}

impl PollPolicy {
    /// No attempt or time limit; only cancellation or a terminal status ends
    /// the loop.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            max_duration_secs: None,
        }
    }

    fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(Transaction),
    Failed(Failure, Option<Transaction>),
    /// The token was cancelled; nothing should be published.
    Cancelled,
}

/// What a single status reply means for the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Pending(Transaction),
    Done(PollOutcome),
}

/// Maps one QrLinkStatusWait outcome to the next step of the loop.
pub fn classify_status(outcome: TransportResult<QrStatusResponse>) -> PollStep {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            return PollStep::Done(PollOutcome::Failed(Failure::connection(e.to_string()), None));
        }
    };
    let transaction = response
        .transaction
        .as_ref()
        .map(|model| model.to_transaction());

    if response.success != Some(true) {
        let failure = Failure::rejected(response.message.unwrap_or_default());
        return PollStep::Done(PollOutcome::Failed(failure, transaction));
    }

    let transaction = transaction.unwrap_or_default();
    if transaction.status.is_success() {
        return PollStep::Done(PollOutcome::Succeeded(transaction));
    }
    if transaction.status == TransactionStatus::Declined {
        let failure = Failure::declined(transaction.reason_code);
        return PollStep::Done(PollOutcome::Failed(failure, Some(transaction)));
    }
    PollStep::Pending(transaction)
}

/// Long-polls the status of one transaction until it is terminal.
pub struct StatusPoller {
    gateway: SharedGatewayClient,
    policy: PollPolicy,
    cancel: CancelToken,
}

impl StatusPoller {
    /// A poller that checks `cancel` before every query.
    pub fn new(gateway: SharedGatewayClient, policy: PollPolicy, cancel: CancelToken) -> Self {
        Self {
            gateway,
            policy,
            cancel,
        }
    }

    /// Queries until a terminal status, a failure, an exhausted policy bound
    /// or cancellation. Every non-terminal reply is reported through
    /// `on_pending` before the next query goes out.
    pub async fn poll(
        &self,
        transaction_id: TransactionId,
        mut on_pending: impl FnMut(Transaction),
    ) -> PollOutcome {
        let request = QrStatusRequest { transaction_id };
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!(transaction_id, attempts, "Polling cancelled");
                return PollOutcome::Cancelled;
            }
            if let Some(max) = self.policy.max_attempts
                && attempts >= max
            {
                warn!(transaction_id, attempts, "Status polling attempt limit reached");
                return PollOutcome::Failed(
                    Failure::connection(format!(
                        "status polling stopped after {attempts} attempts"
                    )),
                    None,
                );
            }
            if let Some(max) = self.policy.max_duration()
                && attempts > 0
                && started.elapsed() >= max
            {
                warn!(transaction_id, attempts, "Status polling time limit reached");
                return PollOutcome::Failed(
                    Failure::connection(format!(
                        "status polling stopped after {} seconds",
                        max.as_secs()
                    )),
                    None,
                );
            }

            attempts += 1;
            let Some(outcome) = self
                .cancel
                .run(self.gateway.qr_link_status_wait(&request))
                .await
            else {
                debug!(transaction_id, attempts, "Polling cancelled mid-request");
                return PollOutcome::Cancelled;
            };

            match classify_status(outcome) {
                PollStep::Pending(tx) => {
                    debug!(
                        transaction_id,
                        attempts,
                        status = %tx.status,
                        "Transaction still pending"
                    );
                    on_pending(tx);
                }
                PollStep::Done(outcome) => {
                    info!(transaction_id, attempts, "Status polling finished");
                    return outcome;
                }
            }
        }
    }
}
