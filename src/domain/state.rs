use super::transaction::{ChallengeRequest, QrDetails, Transaction, TransactionId};
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// A Charge/Auth (or its challenge result) is being sent.
    Submitting,
    /// The gateway asked for a 3-D Secure challenge; the host drives it.
    AwaitingChallenge,
    RequestingLink,
    /// A QR link is available for the host to hand to a banking app.
    AwaitingAction,
    Polling,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitting => "Submitting",
            Self::AwaitingChallenge => "AwaitingChallenge",
            Self::RequestingLink => "RequestingLink",
            Self::AwaitingAction => "AwaitingAction",
            Self::Polling => "Polling",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures that reach the host. Everything else is either a valid state or
/// absorbed inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    ConnectionError,
    GatewayRejected,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason_code: Option<i32>,
    pub message: Option<String>,
}

impl Failure {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ConnectionError,
            reason_code: None,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: FailureKind::GatewayRejected,
            reason_code: None,
            message: (!message.is_empty()).then_some(message),
        }
    }

    pub fn declined(reason_code: Option<i32>) -> Self {
        Self {
            kind: FailureKind::Declined,
            reason_code,
            message: None,
        }
    }
}

/// Something that happened to an orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ChallengeIssued(Transaction),
    ChallengeSubmitted,
    LinkIssued(Transaction),
    PollingStarted(TransactionId),
    PollPending(Transaction),
    Succeeded(Option<Transaction>),
    Failed(Failure, Option<Transaction>),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::ChallengeIssued(_) => "issue a challenge",
            Self::ChallengeSubmitted => "submit a challenge result",
            Self::LinkIssued(_) => "issue a QR link",
            Self::PollingStarted(_) => "start polling",
            Self::PollPending(_) => "record a pending poll",
            Self::Succeeded(_) => "succeed",
            Self::Failed(..) => "fail",
        }
    }
}

/// The single observable value of an orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorState {
    pub phase: Phase,
    pub transaction: Transaction,
    pub error: Option<Failure>,
    pub challenge: Option<ChallengeRequest>,
    pub qr: Option<QrDetails>,
    /// Non-terminal status replies seen so far.
    pub polls: u32,
}

impl OrchestratorState {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            transaction: Transaction::default(),
            error: None,
            challenge: None,
            qr: None,
            polls: 0,
        }
    }

    /// Zero until the gateway assigns one.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction.id
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Pure transition function.
///
/// Returns the next state, or `InvalidStateTransition` when the event is not
/// allowed in the current phase. Terminal phases accept nothing.
pub fn reduce(state: &OrchestratorState, event: Event) -> Result<OrchestratorState> {
    use Phase::*;

    let allowed = match (&event, state.phase) {
        (_, Succeeded | Failed) => false,
        (Event::ChallengeIssued(_), Submitting) => true,
        (Event::ChallengeSubmitted, AwaitingChallenge) => true,
        (Event::LinkIssued(_), RequestingLink) => true,
        (Event::PollingStarted(_), AwaitingAction) => true,
        (Event::PollPending(_), Polling) => true,
        (Event::Succeeded(_), Submitting | Polling) => true,
        (Event::Failed(..), _) => true,
        _ => false,
    };
    if !allowed {
        return Err(PaymentError::InvalidStateTransition {
            action: event.name(),
            phase: state.phase.to_string(),
        });
    }

    let mut next = state.clone();
    match event {
        Event::ChallengeIssued(tx) => {
            next.challenge = tx.challenge.clone();
            next.transaction = state.transaction.merge(tx);
            next.phase = AwaitingChallenge;
        }
        Event::ChallengeSubmitted => {
            next.phase = Submitting;
        }
        Event::LinkIssued(tx) => {
            next.qr = tx.qr.clone();
            next.transaction = state.transaction.merge(tx);
            next.phase = AwaitingAction;
        }
        Event::PollingStarted(id) => {
            next.transaction = state.transaction.merge(Transaction {
                status: state.transaction.status.clone(),
                ..Transaction::with_id(id)
            });
            next.phase = Polling;
        }
        Event::PollPending(tx) => {
            next.transaction = state.transaction.merge(tx);
            next.polls += 1;
        }
        Event::Succeeded(tx) => {
            if let Some(tx) = tx {
                next.transaction = state.transaction.merge(tx);
            }
            next.phase = Succeeded;
        }
        Event::Failed(failure, tx) => {
            if let Some(tx) = tx {
                next.transaction = state.transaction.merge(tx);
            }
            if next.transaction.reason_code.is_none() {
                next.transaction.reason_code = failure.reason_code;
            }
            next.error = Some(failure);
            next.phase = Failed;
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionStatus;

    #[test]
    fn test_challenge_round_trip() {
        let state = OrchestratorState::new(Phase::Submitting);
        let tx = Transaction {
            id: 10,
            challenge: Some(ChallengeRequest {
                token: "X".into(),
                target_url: "https://acs".into(),
                callback_id: "cb".into(),
            }),
            ..Transaction::default()
        };

        let state = reduce(&state, Event::ChallengeIssued(tx)).unwrap();
        assert_eq!(state.phase, Phase::AwaitingChallenge);
        assert_eq!(state.challenge.as_ref().unwrap().target_url, "https://acs");

        let state = reduce(&state, Event::ChallengeSubmitted).unwrap();
        assert_eq!(state.phase, Phase::Submitting);

        let state = reduce(&state, Event::Succeeded(None)).unwrap();
        assert_eq!(state.phase, Phase::Succeeded);
        assert_eq!(state.transaction_id(), 10);
    }

    #[test]
    fn test_terminal_phase_is_never_left() {
        let failed = reduce(
            &OrchestratorState::new(Phase::Submitting),
            Event::Failed(Failure::connection("timeout"), None),
        )
        .unwrap();

        for event in [
            Event::Succeeded(None),
            Event::Failed(Failure::declined(Some(5051)), None),
            Event::ChallengeSubmitted,
            Event::PollingStarted(1),
        ] {
            let result = reduce(&failed, event);
            assert!(matches!(
                result,
                Err(PaymentError::InvalidStateTransition { .. })
            ));
        }
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let state = OrchestratorState::new(Phase::RequestingLink);
        assert!(reduce(&state, Event::ChallengeSubmitted).is_err());
        assert!(reduce(&state, Event::PollingStarted(1)).is_err());
        assert!(reduce(&state, Event::Succeeded(None)).is_err());
    }

    #[test]
    fn test_transaction_id_never_changes_once_assigned() {
        let state = OrchestratorState::new(Phase::RequestingLink);
        let state = reduce(&state, Event::LinkIssued(Transaction::with_id(456))).unwrap();
        let state = reduce(&state, Event::PollingStarted(456)).unwrap();
        let state = reduce(
            &state,
            Event::PollPending(Transaction {
                id: 999,
                status: TransactionStatus::Pending,
                ..Transaction::default()
            }),
        )
        .unwrap();
        assert_eq!(state.transaction_id(), 456);
        assert_eq!(state.polls, 1);
    }

    #[test]
    fn test_failure_reason_code_lands_on_transaction() {
        let state = reduce(
            &OrchestratorState::new(Phase::Polling),
            Event::Failed(Failure::declined(Some(5051)), Some(Transaction::with_id(3))),
        )
        .unwrap();
        assert_eq!(state.transaction.reason_code, Some(5051));
        assert_eq!(state.error.unwrap().kind, FailureKind::Declined);
    }
}
