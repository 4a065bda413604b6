//! Maps every gateway outcome onto one closed taxonomy.
//!
//! The order of checks matters: a non-zero reason code is looked at before
//! challenge fields, because the gateway sometimes fills challenge fields on
//! declined transactions too.

use crate::domain::api::{QrLinkResponse, ThreeDsResponse, TransactionResponse};
use crate::domain::state::{Event, Failure};
use crate::domain::transaction::Transaction;
use crate::error::TransportResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    ConnectionError(String),
    GatewayRejected {
        message: String,
        transaction: Option<Transaction>,
    },
    Declined {
        reason_code: i32,
        transaction: Option<Transaction>,
    },
    ChallengeRequired(Transaction),
    Success(Option<Transaction>),
}

impl Classification {
    /// The failure this outcome carries, or `None` for success and challenge.
    pub fn failure(&self) -> Option<Failure> {
        match self {
            Self::ConnectionError(message) => Some(Failure::connection(message.clone())),
            Self::GatewayRejected { message, .. } => Some(Failure::rejected(message.clone())),
            Self::Declined { reason_code, .. } => Some(Failure::declined(Some(*reason_code))),
            Self::ChallengeRequired(_) | Self::Success(_) => None,
        }
    }

    /// The state machine event this outcome stands for.
    pub fn into_event(self) -> Event {
        match self {
            Self::Success(tx) => Event::Succeeded(tx),
            Self::ChallengeRequired(tx) => Event::ChallengeIssued(tx),
            Self::ConnectionError(message) => Event::Failed(Failure::connection(message), None),
            Self::GatewayRejected {
                message,
                transaction,
            } => Event::Failed(Failure::rejected(message), transaction),
            Self::Declined {
                reason_code,
                transaction,
            } => Event::Failed(Failure::declined(Some(reason_code)), transaction),
        }
    }
}

fn nonzero(code: Option<i32>) -> Option<i32> {
    code.filter(|c| *c != 0)
}

fn first_message<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|m| !m.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Classifies a Charge or Auth outcome.
pub fn classify_payment(outcome: TransportResult<TransactionResponse>) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Classification::ConnectionError(e.to_string()),
    };
    let model = response.transaction.as_ref();
    let transaction = model.map(|m| m.to_transaction());

    if response.success == Some(true) {
        return Classification::Success(transaction);
    }
    if let Some(reason_code) = nonzero(model.and_then(|m| m.reason_code)) {
        return Classification::Declined {
            reason_code,
            transaction,
        };
    }
    if let Some(tx) = transaction.as_ref().filter(|tx| tx.challenge.is_some()) {
        return Classification::ChallengeRequired(tx.clone());
    }
    Classification::GatewayRejected {
        message: first_message([
            response.message.as_deref(),
            model.and_then(|m| m.card_holder_message.as_deref()),
        ]),
        transaction,
    }
}

/// Classifies a Post3ds outcome. A challenge result never leads to another
/// challenge.
pub fn classify_three_ds(outcome: TransportResult<ThreeDsResponse>) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Classification::ConnectionError(e.to_string()),
    };
    if response.success == Some(true) {
        return Classification::Success(None);
    }
    if let Some(reason_code) = nonzero(response.reason_code) {
        return Classification::Declined {
            reason_code,
            transaction: None,
        };
    }
    Classification::GatewayRejected {
        message: first_message([response.message.as_deref()]),
        transaction: None,
    }
}

/// Classifies a Get-QR-Link outcome. Success requires a usable link.
pub fn classify_qr_link(outcome: TransportResult<QrLinkResponse>) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Classification::ConnectionError(e.to_string()),
    };
    let model = response.transaction.as_ref();
    let transaction = model.map(|m| m.to_transaction());

    if response.success == Some(true) {
        return match transaction {
            Some(tx) if tx.qr.is_some() => Classification::Success(Some(tx)),
            transaction => Classification::GatewayRejected {
                message: "Gateway returned no QR link".to_string(),
                transaction,
            },
        };
    }
    Classification::GatewayRejected {
        message: first_message([
            response.message.as_deref(),
            model.and_then(|m| m.message.as_deref()),
        ]),
        transaction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api::{QrLinkModel, TransactionModel};
    use crate::domain::state::FailureKind;
    use crate::error::TransportError;

    fn challenge_model(reason_code: Option<i32>) -> TransactionModel {
        TransactionModel {
            transaction_id: Some(1),
            reason_code,
            pa_req: Some("X".into()),
            acs_url: Some("https://acs".into()),
            three_ds_callback_id: Some("cb".into()),
            ..TransactionModel::default()
        }
    }

    #[test]
    fn test_transport_failure_is_connection_error() {
        let classification = classify_payment(Err(TransportError::Timeout));
        assert!(matches!(classification, Classification::ConnectionError(_)));
        assert_eq!(
            classification.failure().unwrap().kind,
            FailureKind::ConnectionError
        );
    }

    #[test]
    fn test_success_without_reason_code() {
        let classification = classify_payment(Ok(TransactionResponse {
            success: Some(true),
            message: None,
            transaction: Some(TransactionModel {
                transaction_id: Some(123),
                ..TransactionModel::default()
            }),
        }));
        match classification {
            Classification::Success(Some(tx)) => assert_eq!(tx.id, 123),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_reason_code_wins_over_challenge_fields() {
        for code in [1, 5051, 5005, -3, i32::MAX] {
            let classification = classify_payment(Ok(TransactionResponse {
                success: Some(false),
                message: None,
                transaction: Some(challenge_model(Some(code))),
            }));
            assert!(
                matches!(
                    classification,
                    Classification::Declined { reason_code, .. } if reason_code == code
                ),
                "reason code {code} must classify as Declined"
            );
        }
    }

    #[test]
    fn test_challenge_required_when_no_reason_code() {
        for reason_code in [None, Some(0)] {
            let classification = classify_payment(Ok(TransactionResponse {
                success: Some(false),
                message: None,
                transaction: Some(challenge_model(reason_code)),
            }));
            match classification {
                Classification::ChallengeRequired(tx) => {
                    let challenge = tx.challenge.unwrap();
                    assert_eq!(challenge.token, "X");
                    assert_eq!(challenge.callback_id, "cb");
                }
                other => panic!("unexpected classification: {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejection_carries_message() {
        let classification = classify_payment(Ok(TransactionResponse {
            success: Some(false),
            message: Some("Invalid cryptogram".into()),
            transaction: None,
        }));
        assert_eq!(
            classification,
            Classification::GatewayRejected {
                message: "Invalid cryptogram".into(),
                transaction: None,
            }
        );
    }

    #[test]
    fn test_rejection_falls_back_to_card_holder_message() {
        let classification = classify_payment(Ok(TransactionResponse {
            success: Some(false),
            message: Some(String::new()),
            transaction: Some(TransactionModel {
                card_holder_message: Some("Contact your bank".into()),
                ..TransactionModel::default()
            }),
        }));
        let failure = classification.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::GatewayRejected);
        assert_eq!(failure.message.as_deref(), Some("Contact your bank"));
    }

    #[test]
    fn test_three_ds_outcomes() {
        assert_eq!(
            classify_three_ds(Ok(ThreeDsResponse {
                success: Some(true),
                ..ThreeDsResponse::default()
            })),
            Classification::Success(None)
        );
        assert!(matches!(
            classify_three_ds(Ok(ThreeDsResponse {
                success: Some(false),
                reason_code: Some(5206),
                ..ThreeDsResponse::default()
            })),
            Classification::Declined {
                reason_code: 5206,
                ..
            }
        ));
        assert!(matches!(
            classify_three_ds(Err(TransportError::NoResponse)),
            Classification::ConnectionError(_)
        ));
    }

    #[test]
    fn test_qr_link_without_url_is_rejected() {
        let classification = classify_qr_link(Ok(QrLinkResponse {
            success: Some(true),
            message: None,
            transaction: Some(QrLinkModel {
                transaction_id: Some(5),
                ..QrLinkModel::default()
            }),
        }));
        assert!(matches!(
            classification,
            Classification::GatewayRejected { .. }
        ));
    }

    #[test]
    fn test_into_event() {
        let event = Classification::Declined {
            reason_code: 5051,
            transaction: None,
        }
        .into_event();
        assert_eq!(event, Event::Failed(Failure::declined(Some(5051)), None));
    }
}
