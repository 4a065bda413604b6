use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Currency used when the caller leaves it blank.
pub const DEFAULT_CURRENCY: &str = "RUB";

/// A positive payment amount.
///
/// Wraps `rust_decimal::Decimal` so the scale the merchant wrote ("100.00")
/// survives all the way into the request body, where it is serialized as a
/// string. Accepts either a string or a JSON number on input; numbers are
/// read from their source text.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<Value> for Amount {
    type Error = PaymentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => text.parse(),
            Value::Number(number) => number.to_string().parse(),
            other => Err(PaymentError::ValidationError(format!(
                "Invalid amount {other}"
            ))),
        }
    }
}

impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| PaymentError::ValidationError(format!("Invalid amount '{s}': {e}")))?;
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Payer identity block forwarded to the gateway as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

/// Everything the merchant supplies about one payment.
///
/// Read-only once an orchestrator has been built from it; share it between
/// orchestrators behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentParameters {
    pub amount: Amount,
    #[serde(default = "default_currency", deserialize_with = "currency_or_default")]
    pub currency: String,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub payer: Option<Payer>,
    /// Opaque merchant metadata, expected (but not required) to be JSON text.
    #[serde(default)]
    pub metadata: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn currency_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let currency = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_currency(currency.as_deref().unwrap_or_default()))
}

fn normalize_currency(currency: &str) -> String {
    let trimmed = currency.trim();
    if trimmed.is_empty() {
        default_currency()
    } else {
        trimmed.to_string()
    }
}

impl PaymentParameters {
    pub fn new(amount: Amount, currency: &str) -> Self {
        Self {
            amount,
            currency: normalize_currency(currency),
            invoice_id: None,
            description: None,
            account_id: None,
            email: None,
            payer: None,
            metadata: None,
        }
    }

    pub fn with_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_payer(mut self, payer: Payer) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// Single-message ("charge") or two-message ("auth", capture later) flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentScheme {
    Charge,
    Auth,
}

impl PaymentScheme {
    pub fn from_dual_message(use_dual_message_payment: bool) -> Self {
        if use_dual_message_payment {
            Self::Auth
        } else {
            Self::Charge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for PaymentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// QR-redirect payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QrMethod {
    /// Redirect into one specific banking app, which returns to the merchant
    /// through success/fail URLs.
    BankAppQr,
    /// Deep link any participating bank app can open without a merchant login.
    NoLoginQr,
}

impl QrMethod {
    /// Identifier of the method in the merchant configuration's
    /// `ExternalPaymentMethods` list.
    pub fn method_type(&self) -> i32 {
        match self {
            Self::NoLoginQr => 5,
            Self::BankAppQr => 6,
        }
    }

    pub fn from_method_type(method_type: i32) -> Option<Self> {
        match method_type {
            5 => Some(Self::NoLoginQr),
            6 => Some(Self::BankAppQr),
            _ => None,
        }
    }
}

impl fmt::Display for QrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BankAppQr => f.write_str("bank-app QR"),
            Self::NoLoginQr => f.write_str("no-login QR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionMode {
    CardAndOptions,
    DirectQrMethod(QrMethod),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            "-1".parse::<Amount>(),
            Err(PaymentError::ValidationError(_))
        ));
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn test_amount_keeps_scale_when_serialized() {
        let amount: Amount = "100.00".parse().unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"100.00\"");
    }

    #[test]
    fn test_numeric_amount_keeps_source_scale() {
        let params: PaymentParameters = serde_json::from_str(r#"{"amount": 100.50}"#).unwrap();
        assert_eq!(params.amount.to_string(), "100.50");

        let params: PaymentParameters =
            serde_json::from_str(r#"{"amount": 12345678901234.000001}"#).unwrap();
        assert_eq!(params.amount.value(), dec!(12345678901234.000001));

        assert!(serde_json::from_str::<PaymentParameters>(r#"{"amount": true}"#).is_err());
    }

    #[test]
    fn test_blank_currency_defaults_to_rub() {
        let params = PaymentParameters::new(dec!(10).try_into().unwrap(), "  ");
        assert_eq!(params.currency, "RUB");

        let json = r#"{"amount": "10.00", "currency": ""}"#;
        let params: PaymentParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.currency, "RUB");

        let json = r#"{"amount": "10.00"}"#;
        let params: PaymentParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.currency, "RUB");
        assert_eq!(params.amount.value(), dec!(10.00));
    }

    #[test]
    fn test_non_positive_amount_rejected_on_deserialize() {
        let json = r#"{"amount": "0", "currency": "USD"}"#;
        assert!(serde_json::from_str::<PaymentParameters>(json).is_err());
    }

    #[test]
    fn test_scheme_from_dual_message_toggle() {
        assert_eq!(PaymentScheme::from_dual_message(true), PaymentScheme::Auth);
        assert_eq!(PaymentScheme::from_dual_message(false), PaymentScheme::Charge);
        assert_eq!(
            serde_json::to_string(&PaymentScheme::Charge).unwrap(),
            "\"charge\""
        );
    }

    #[test]
    fn test_qr_method_types() {
        assert_eq!(QrMethod::from_method_type(5), Some(QrMethod::NoLoginQr));
        assert_eq!(QrMethod::from_method_type(6), Some(QrMethod::BankAppQr));
        assert_eq!(QrMethod::from_method_type(2), None);
        assert_eq!(QrMethod::BankAppQr.method_type(), 6);
    }

    #[test]
    fn test_transaction_mode_deserialization() {
        let mode: TransactionMode = serde_json::from_str("\"cardAndOptions\"").unwrap();
        assert_eq!(mode, TransactionMode::CardAndOptions);
        let mode: TransactionMode =
            serde_json::from_str(r#"{"directQrMethod": "noLoginQr"}"#).unwrap();
        assert_eq!(mode, TransactionMode::DirectQrMethod(QrMethod::NoLoginQr));
    }
}
