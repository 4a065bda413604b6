use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),
    #[error("Gateway rejected request: {0}")]
    GatewayRejected(String),
    #[error("Invalid state transition: cannot {action} while {phase}")]
    InvalidStateTransition { action: &'static str, phase: String },
    #[error("A gateway request is already in flight")]
    RequestInFlight,
    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    TransactionIdMismatch { expected: i64, actual: i64 },
    #[error("Metadata is not valid JSON: {0}")]
    MetadataParse(#[source] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

/// Failure of the transport underneath a gateway call: the request never
/// produced a usable reply.
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("TLS handshake failed: {0}")]
    Tls(String),
    #[error("no response from gateway")]
    NoResponse,
    #[error("malformed gateway response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
pub type TransportResult<T> = std::result::Result<T, TransportError>;
