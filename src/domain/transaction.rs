use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway-assigned transaction id. Zero means "not assigned yet".
pub type TransactionId = i64;

/// Transaction status as reported by the gateway.
///
/// Anything the gateway sends that is not one of the known statuses,
/// including an empty string, is kept as `Unknown` and treated as
/// non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Authorized,
    Completed,
    Cancelled,
    Declined,
    Unknown(String),
}

impl TransactionStatus {
    pub fn from_gateway(status: Option<&str>) -> Self {
        match status.unwrap_or_default() {
            "Pending" => Self::Pending,
            "Authorized" => Self::Authorized,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            "Declined" => Self::Declined,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authorized | Self::Completed | Self::Cancelled | Self::Declined
        )
    }

    /// Authorized and Cancelled count as a finished payment from the payer's
    /// point of view, same as Completed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Authorized | Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Authorized => f.write_str("Authorized"),
            Self::Completed => f.write_str("Completed"),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Declined => f.write_str("Declined"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// 3-D Secure step-up data handed to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// Opaque challenge-request token (PaReq) to post to the target URL.
    pub token: String,
    /// Access control server URL the host opens.
    pub target_url: String,
    /// Correlates the challenge result with this transaction on Post3ds.
    pub callback_id: String,
}

/// A banking app able to open a no-login QR deep link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankApp {
    #[serde(rename = "bankName", default)]
    pub name: Option<String>,
    #[serde(rename = "logoURL", default)]
    pub logo_url: Option<String>,
    #[serde(rename = "schema", default)]
    pub scheme: Option<String>,
    #[serde(rename = "package_name", default)]
    pub package_name: Option<String>,
}

/// QR-redirect data of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QrDetails {
    pub redirect_url: String,
    pub provider_qr_id: Option<String>,
    pub bank_apps: Vec<BankApp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub reason_code: Option<i32>,
    pub card_holder_message: Option<String>,
    pub challenge: Option<ChallengeRequest>,
    pub qr: Option<QrDetails>,
}

impl Transaction {
    pub fn with_id(id: TransactionId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.id != 0
    }

    /// Folds a newer snapshot into this one.
    ///
    /// A non-zero id never changes once set; optional fields the newer
    /// snapshot leaves empty keep their previous value.
    pub fn merge(&self, newer: Transaction) -> Transaction {
        let id = if self.is_assigned() { self.id } else { newer.id };
        Transaction {
            id,
            status: newer.status,
            reason_code: newer.reason_code.or(self.reason_code),
            card_holder_message: newer
                .card_holder_message
                .or_else(|| self.card_holder_message.clone()),
            challenge: newer.challenge.or_else(|| self.challenge.clone()),
            qr: newer.qr.or_else(|| self.qr.clone()),
        }
    }
}
